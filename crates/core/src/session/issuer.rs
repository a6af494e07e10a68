//! Login and session issuing.

use std::sync::Arc;

use pharmacare_shared::auth::{Claims, LoginResponse, UserProfile};
use pharmacare_shared::types::{CompanyId, PrincipalId};
use pharmacare_shared::JwtService;

use super::error::{AuthError, CredentialFailure};
use crate::auth::{AccountKind, Role, verify_password};
use crate::entitlement::{Entitlement, EntitlementReader};
use crate::ports::{DataStore, StoreError, StoreHandles};
use crate::principal::{Principal, PrincipalDirectory, PrincipalRecord, StoreKind};
use mockable::Clock;

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Signed session token.
    pub token: String,
    /// Resolved profile with merged entitlement.
    pub profile: UserProfile,
    /// Effective account kind.
    pub user_type: AccountKind,
}

impl LoginOutcome {
    /// Client-facing form.
    #[must_use]
    pub fn into_response(self) -> LoginResponse {
        LoginResponse {
            token: self.token,
            user: self.profile,
            user_type: self.user_type.as_str().to_string(),
        }
    }
}

/// Checks credentials, resolves tenant context, and signs session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    elevated: Arc<dyn DataStore>,
    login_directory: PrincipalDirectory,
    profile_directory: PrincipalDirectory,
    login_entitlement: EntitlementReader,
    profile_entitlement: EntitlementReader,
    jwt: Arc<JwtService>,
}

impl SessionIssuer {
    /// Creates an issuer.
    ///
    /// Login runs before any tenant context exists, so it reads and syncs
    /// through the elevated handle. Profile reads for an authenticated
    /// caller use the standard handle.
    #[must_use]
    pub fn new(
        stores: &StoreHandles,
        jwt: Arc<JwtService>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let elevated = stores.elevated();
        let standard = stores.standard();
        Self {
            login_directory: PrincipalDirectory::new(Arc::clone(&elevated)),
            login_entitlement: EntitlementReader::new(Arc::clone(&elevated), Arc::clone(&clock)),
            profile_directory: PrincipalDirectory::new(Arc::clone(&standard)),
            profile_entitlement: EntitlementReader::new(standard, clock),
            elevated,
            jwt,
        }
    }

    /// Logs a principal in.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingCredentials` if email or password is empty
    /// - `AuthError::InvalidCredentials` for an unknown email or wrong password
    /// - `AuthError::PendingApproval` for an unapproved non-admin
    /// - `AuthError::StoreUnavailable` if a lookup fails
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let principal = self
            .login_directory
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials(CredentialFailure::UnknownEmail))?;

        check_password(&principal, password)?;

        if !principal.role().is_platform_admin() && !principal.record().approved {
            return Err(AuthError::PendingApproval);
        }

        let company_id = self.login_directory.company_of(&principal).await?;
        let user_type = principal.effective_account_kind(company_id);
        let entitlement = self
            .login_entitlement
            .current(principal.record(), company_id)
            .await?;

        if principal.is_company_scoped() {
            self.sync_primary_row(principal.record()).await;
        }

        let record = principal.record();
        let token = self.jwt.generate_session_token(
            record.id.into_inner(),
            &record.email,
            record.role.as_str(),
            user_type.as_str(),
            company_id.map(CompanyId::into_inner),
        )?;

        tracing::info!(
            principal_id = %record.id,
            store = %principal.store(),
            user_type = %user_type,
            "login succeeded"
        );

        Ok(LoginOutcome {
            token,
            profile: build_profile(record, user_type, company_id, &entitlement),
            user_type,
        })
    }

    /// Builds the profile for an authenticated caller.
    ///
    /// The company link is taken from the session if present, otherwise
    /// resolved afresh. Entitlement is always read fresh.
    ///
    /// # Errors
    ///
    /// - `AuthError::UnknownPrincipal` if the principal has been deleted
    /// - `AuthError::StoreUnavailable` if a lookup fails
    pub async fn profile(&self, claims: &Claims) -> Result<UserProfile, AuthError> {
        let principal = self
            .profile_directory
            .find_by_id(PrincipalId::from_uuid(claims.principal_id()))
            .await?
            .ok_or(AuthError::UnknownPrincipal)?;

        let company_id = match claims.company_id() {
            Some(id) => Some(CompanyId::from_uuid(id)),
            None => self.profile_directory.company_of(&principal).await?,
        };
        let user_type = principal.effective_account_kind(company_id);
        let entitlement = self
            .profile_entitlement
            .current(principal.record(), company_id)
            .await?;

        Ok(build_profile(
            principal.record(),
            user_type,
            company_id,
            &entitlement,
        ))
    }

    /// Gives a company-scoped principal a matching primary row.
    ///
    /// The row keeps the same id and credentials so later logins, which
    /// prefer the primary store, still succeed. Failure is logged only.
    async fn sync_primary_row(&self, record: &PrincipalRecord) {
        let synced = PrincipalRecord {
            account_kind: AccountKind::CompanyUser,
            approved: true,
            ..record.clone()
        };
        match self
            .elevated
            .insert_principal(StoreKind::Primary, &synced)
            .await
        {
            Ok(()) => {
                tracing::info!(principal_id = %record.id, "synced company member into primary store");
            }
            Err(StoreError::Duplicate(_)) => {
                tracing::debug!(principal_id = %record.id, "company member already synced");
            }
            Err(e) => {
                tracing::warn!(
                    principal_id = %record.id,
                    error = %e,
                    "failed to sync company member into primary store"
                );
            }
        }
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer").finish_non_exhaustive()
    }
}

fn check_password(principal: &Principal, password: &str) -> Result<(), AuthError> {
    match verify_password(password, &principal.record().password_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::InvalidCredentials(
            CredentialFailure::WrongPassword,
        )),
        Err(e) => {
            tracing::warn!(
                principal_id = %principal.id(),
                store = %principal.store(),
                error = %e,
                "stored password hash is unusable"
            );
            Err(AuthError::InvalidCredentials(
                CredentialFailure::UnusableHash,
            ))
        }
    }
}

/// Assembles the client-facing profile.
#[must_use]
pub fn build_profile(
    record: &PrincipalRecord,
    user_type: AccountKind,
    company_id: Option<CompanyId>,
    entitlement: &Entitlement,
) -> UserProfile {
    UserProfile {
        id: record.id.into_inner(),
        email: record.email.clone(),
        full_name: record.full_name.clone(),
        role: record.role.as_str().to_string(),
        account_kind: user_type.as_str().to_string(),
        approved: record.approved || matches!(record.role, Role::Admin),
        company_id: company_id.map(CompanyId::into_inner),
        subscription: entitlement.to_info(),
    }
}

#[cfg(test)]
#[path = "issuer_tests.rs"]
mod tests;
