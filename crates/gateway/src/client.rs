//! Reqwest-backed gateway adapter.
//!
//! Owns transport details only: request serialisation, bearer auth, timeout
//! and HTTP error mapping, and decoding the provider's envelope into the
//! core's verification type.

use std::time::Duration;

use async_trait::async_trait;
use pharmacare_core::payment::{
    CheckoutRequest, GatewayError, GatewayOutcome, GatewayVerification, PaymentGateway,
};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::dto::{
    Customer, Customizations, Envelope, ErrorBody, InitializeBody, InitializeData, Meta,
    TransactionData,
};

const CHECKOUT_TITLE: &str = "PharmaCare subscription";

/// Errors raised while building a [`GatewayClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL does not parse.
    #[error("invalid payment gateway base url {url:?}: {reason}")]
    InvalidBaseUrl {
        /// Configured value.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Connection settings for the provider.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// API base URL, e.g. `https://api.flutterwave.com/v3`.
    pub base_url: String,
    /// Secret key sent as a bearer token.
    pub secret_key: String,
    /// Where the provider sends the customer after checkout.
    pub redirect_url: String,
    /// Upper bound on any single request.
    pub timeout: Duration,
}

/// Gateway adapter over one provider endpoint.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
    secret_key: String,
    redirect_url: String,
}

impl GatewayClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is malformed or the reqwest client
    /// cannot be constructed.
    pub fn new(settings: GatewaySettings) -> Result<Self, ClientError> {
        // `Url::join` drops the last path segment unless it ends in a slash.
        let mut base = settings.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).map_err(|e| ClientError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            base_url,
            secret_key: settings.secret_key,
            redirect_url: settings.redirect_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Transport(format!("bad endpoint {path}: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<String, GatewayError> {
        let body = InitializeBody {
            tx_ref: &request.tx_ref,
            amount: request.amount,
            currency: &request.currency,
            redirect_url: &self.redirect_url,
            customer: Customer {
                email: &request.customer_email,
                name: &request.customer_name,
            },
            meta: Meta {
                plan_id: &request.plan_id,
            },
            customizations: Customizations {
                title: CHECKOUT_TITLE.to_string(),
                description: format!("Plan {}", request.plan_id),
            },
        };

        let response = self
            .client
            .post(self.endpoint("payments")?)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, &bytes));
        }

        let (envelope, _) = decode::<InitializeData>(&bytes)?;
        match envelope.data {
            Some(data) if envelope.is_success() => Ok(data.link),
            _ => Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "checkout was not initialized".to_string()),
            }),
        }
    }

    async fn verify(&self, tx_ref: &str) -> Result<GatewayVerification, GatewayError> {
        let response = self
            .client
            .get(self.endpoint("transactions/verify_by_reference")?)
            .bearer_auth(&self.secret_key)
            .query(&[("tx_ref", tx_ref)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, &bytes));
        }

        let verification = parse_verification(status, &bytes)?;
        tracing::debug!(
            tx_ref = %tx_ref,
            outcome = ?verification.outcome,
            "gateway verification received"
        );
        Ok(verification)
    }
}

fn decode<T: DeserializeOwned>(
    body: &[u8],
) -> Result<(Envelope<T>, serde_json::Value), GatewayError> {
    let raw: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| GatewayError::InvalidResponse(format!("body is not JSON: {e}")))?;
    let envelope = serde_json::from_value(raw.clone())
        .map_err(|e| GatewayError::InvalidResponse(format!("unexpected envelope: {e}")))?;
    Ok((envelope, raw))
}

fn parse_verification(status: StatusCode, body: &[u8]) -> Result<GatewayVerification, GatewayError> {
    let (envelope, raw) = decode::<TransactionData>(body)?;
    if !envelope.is_success() {
        return Err(GatewayError::Rejected {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| "verification failed".to_string()),
        });
    }
    let data = envelope
        .data
        .ok_or_else(|| GatewayError::InvalidResponse("verification has no data".to_string()))?;

    Ok(GatewayVerification {
        outcome: GatewayOutcome::from_status(&data.status),
        amount: data.amount,
        currency: data.currency,
        raw,
    })
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    if matches!(status, StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT) {
        return GatewayError::Timeout;
    }
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body_preview(body));
    GatewayError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
