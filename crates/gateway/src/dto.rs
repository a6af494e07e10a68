//! Wire shapes for the provider's REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Checkout initialization body.
#[derive(Debug, Serialize)]
pub struct InitializeBody<'a> {
    pub tx_ref: &'a str,
    pub amount: Decimal,
    pub currency: &'a str,
    pub redirect_url: &'a str,
    pub customer: Customer<'a>,
    pub meta: Meta<'a>,
    pub customizations: Customizations,
}

#[derive(Debug, Serialize)]
pub struct Customer<'a> {
    pub email: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Meta<'a> {
    pub plan_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Customizations {
    pub title: String,
    pub description: String,
}

/// Every response is wrapped as `{status, message, data}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionData {
    pub status: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Error bodies carry at least a message.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
