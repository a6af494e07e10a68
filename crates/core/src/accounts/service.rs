//! Account lifecycle: registration, approval, companies and their members.

use std::sync::Arc;

use mockable::Clock;
use pharmacare_shared::auth::{AddCompanyUserRequest, RegisterRequest};
use pharmacare_shared::types::{CompanyId, PrincipalId};

use super::error::AccountError;
use crate::access::{AccessRequest, AccessResolver};
use crate::auth::{AccountKind, Role, hash_password, validate_new_password, verify_password};
use crate::entitlement::{Company, EntitlementMirror, SubscriptionEvent};
use crate::ports::{DataStore, StoreError, StoreHandles};
use crate::principal::{Principal, PrincipalDirectory, PrincipalRecord, StoreKind, normalize_email};

/// Creates, approves, and removes principals and companies.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DataStore>,
    directory: PrincipalDirectory,
    registry: PrincipalDirectory,
    resolver: AccessResolver,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl AccountService {
    /// Creates a service.
    ///
    /// Email uniqueness spans every tenant, so registration and member
    /// creation check it through the elevated handle. Everything else runs
    /// on the standard handle.
    #[must_use]
    pub fn new(stores: &StoreHandles, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let store = stores.standard();
        Self {
            directory: PrincipalDirectory::new(Arc::clone(&store)),
            registry: PrincipalDirectory::new(stores.elevated()),
            resolver: AccessResolver::new(Arc::clone(&store)),
            store,
            clock,
        }
    }

    /// Registers a new, unapproved principal in the primary store.
    ///
    /// # Errors
    ///
    /// - `AccountError::Invalid` for a malformed email, name, role, or kind
    /// - `AccountError::Password` if the password is too short
    /// - `AccountError::EmailTaken` if either store holds the email
    pub async fn register(&self, req: &RegisterRequest) -> Result<PrincipalRecord, AccountError> {
        let email = validate_email(&req.email)?;
        let full_name = required(&req.full_name, "full_name")?;
        validate_new_password(&req.password)?;

        let role = req.role.as_deref().map_or(Role::Pharmacist, Role::from);
        if !role.is_self_assignable() {
            return Err(AccountError::Invalid(format!(
                "role {role} cannot be chosen at registration"
            )));
        }
        let account_kind = match req.account_kind.as_deref() {
            None => AccountKind::Individual,
            Some(kind) => match kind.parse::<AccountKind>() {
                Ok(kind @ (AccountKind::Individual | AccountKind::Company)) => kind,
                _ => {
                    return Err(AccountError::Invalid(format!(
                        "account_kind must be individual or company, got {kind}"
                    )));
                }
            },
        };

        if self.registry.email_taken(&email).await? {
            return Err(AccountError::EmailTaken(email));
        }

        let record = PrincipalRecord {
            id: PrincipalId::new(),
            email,
            full_name,
            password_hash: hash_password(&req.password)?,
            role,
            account_kind,
            approved: false,
            company_id: None,
            mirror: EntitlementMirror::inactive(),
            created_at: self.clock.utc(),
        };
        self.insert(StoreKind::Primary, &record).await?;

        tracing::info!(
            principal_id = %record.id,
            account_kind = %record.account_kind,
            "principal registered, awaiting approval"
        );
        Ok(record)
    }

    /// Approves a principal. Approving twice is harmless.
    ///
    /// # Errors
    ///
    /// - `AccountError::Forbidden` unless the caller is a platform admin
    /// - `AccountError::NotFound` if the principal does not exist
    pub async fn approve(
        &self,
        actor: &AccessRequest,
        id: PrincipalId,
    ) -> Result<PrincipalRecord, AccountError> {
        require_platform_admin(actor)?;
        let principal = self.load(id).await?;
        let store = principal.store();
        let record = PrincipalRecord {
            approved: true,
            ..principal.into_record()
        };
        if !self.store.update_principal(store, &record).await? {
            return Err(AccountError::NotFound(format!("principal {id}")));
        }

        tracing::info!(principal_id = %id, approved_by = %actor.principal_id, "principal approved");
        Ok(record)
    }

    /// Rejects a pending registration by deleting it.
    ///
    /// # Errors
    ///
    /// - `AccountError::Forbidden` unless the caller is a platform admin
    /// - `AccountError::NotFound` if the principal does not exist
    /// - `AccountError::Conflict` if the principal is already approved
    pub async fn reject(&self, actor: &AccessRequest, id: PrincipalId) -> Result<(), AccountError> {
        require_platform_admin(actor)?;
        let principal = self.load(id).await?;
        if principal.record().approved {
            return Err(AccountError::Conflict(format!(
                "principal {id} is already approved"
            )));
        }
        self.store.delete_principal(principal.store(), id).await?;

        tracing::info!(principal_id = %id, rejected_by = %actor.principal_id, "registration rejected");
        Ok(())
    }

    /// Creates a company owned by the caller.
    ///
    /// The caller becomes its `company_admin` and is linked to it.
    ///
    /// # Errors
    ///
    /// - `AccountError::Invalid` for an empty name
    /// - `AccountError::Forbidden` unless the caller holds a `company` account
    /// - `AccountError::Conflict` if the caller already has a company
    pub async fn create_company(
        &self,
        actor: &AccessRequest,
        name: &str,
    ) -> Result<Company, AccountError> {
        let name = required(name, "name")?;
        let principal = self.load(actor.principal_id).await?;
        let owner = principal.record();
        if principal.is_company_scoped() || owner.account_kind != AccountKind::Company {
            return Err(AccountError::Forbidden(
                "only company accounts can create a company".into(),
            ));
        }
        if let Some(existing) = owner.company_id {
            return Err(AccountError::Conflict(format!(
                "principal already belongs to company {existing}"
            )));
        }

        let company = Company {
            id: CompanyId::new(),
            name,
            admin_principal_id: Some(owner.id),
            mirror: EntitlementMirror::inactive(),
            created_at: self.clock.utc(),
        };
        self.store.insert_company(&company).await?;

        let linked = PrincipalRecord {
            role: Role::CompanyAdmin,
            company_id: Some(company.id),
            ..owner.clone()
        };
        self.store
            .update_principal(StoreKind::Primary, &linked)
            .await?;

        tracing::info!(company_id = %company.id, admin_id = %owner.id, "company created");
        Ok(company)
    }

    /// Adds an approved member to the caller's company.
    ///
    /// The member starts with the company's current entitlement mirror.
    ///
    /// # Errors
    ///
    /// - `AccountError::Forbidden` unless the caller administers a company
    /// - `AccountError::Invalid` for malformed fields or an elevated role
    /// - `AccountError::EmailTaken` if either store holds the email
    /// - `AccountError::NotFound` if the company row is missing
    pub async fn add_company_user(
        &self,
        actor: &AccessRequest,
        req: &AddCompanyUserRequest,
    ) -> Result<PrincipalRecord, AccountError> {
        let company_id = self.administered_company(actor).await?;
        let email = validate_email(&req.email)?;
        let full_name = required(&req.full_name, "full_name")?;
        validate_new_password(&req.password)?;
        let role = req.role.as_deref().map_or(Role::CompanyUser, Role::from);
        if role.is_platform_admin() || role.is_company_admin() {
            return Err(AccountError::Invalid(format!(
                "role {role} cannot be given to a company member"
            )));
        }

        let company = self
            .store
            .find_company(company_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("company {company_id}")))?;

        if self.registry.email_taken(&email).await? {
            return Err(AccountError::EmailTaken(email));
        }

        let record = PrincipalRecord {
            id: PrincipalId::new(),
            email,
            full_name,
            password_hash: hash_password(&req.password)?,
            role,
            account_kind: AccountKind::CompanyUser,
            approved: true,
            company_id: Some(company_id),
            mirror: company.mirror,
            created_at: self.clock.utc(),
        };
        self.insert(StoreKind::CompanyScoped, &record).await?;

        tracing::info!(
            principal_id = %record.id,
            company_id = %company_id,
            added_by = %actor.principal_id,
            "company member added"
        );
        Ok(record)
    }

    /// Removes a member from the caller's company.
    ///
    /// Deletes the company-scoped row and any primary row synced from it.
    ///
    /// # Errors
    ///
    /// - `AccountError::Forbidden` unless the caller administers a company
    /// - `AccountError::Invalid` if the caller targets themselves
    /// - `AccountError::OutOfScope` if the target is outside the caller's scope
    /// - `AccountError::NotFound` if the target is not a company-scoped member
    pub async fn remove_company_user(
        &self,
        actor: &AccessRequest,
        target: PrincipalId,
    ) -> Result<(), AccountError> {
        self.administered_company(actor).await?;
        if target == actor.principal_id {
            return Err(AccountError::Invalid(
                "company admins cannot remove themselves".into(),
            ));
        }
        self.resolver.resolve(actor).await.ensure_allows(target)?;

        let member = self
            .store
            .find_principal_by_id(StoreKind::CompanyScoped, target)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("company member {target}")))?;

        self.store
            .delete_principal(StoreKind::CompanyScoped, target)
            .await?;
        if let Some(synced) = self
            .store
            .find_principal_by_id(StoreKind::Primary, target)
            .await?
            && synced.company_id == member.company_id
        {
            self.store
                .delete_principal(StoreKind::Primary, target)
                .await?;
        }

        tracing::info!(
            principal_id = %target,
            removed_by = %actor.principal_id,
            "company member removed"
        );
        Ok(())
    }

    /// Changes a principal's password in every store that holds its id.
    ///
    /// # Errors
    ///
    /// - `AccountError::NotFound` if the principal does not exist
    /// - `AccountError::WrongPassword` if `current` does not match
    /// - `AccountError::Password` if `new` is too short
    pub async fn change_password(
        &self,
        principal_id: PrincipalId,
        current: &str,
        new: &str,
    ) -> Result<(), AccountError> {
        let principal = self.load(principal_id).await?;
        if !verify_password(current, &principal.record().password_hash).unwrap_or(false) {
            return Err(AccountError::WrongPassword);
        }
        validate_new_password(new)?;
        let password_hash = hash_password(new)?;

        for kind in StoreKind::ALL {
            let Some(record) = self.store.find_principal_by_id(kind, principal_id).await? else {
                continue;
            };
            let updated = PrincipalRecord {
                password_hash: password_hash.clone(),
                ..record
            };
            self.store.update_principal(kind, &updated).await?;
        }

        tracing::info!(principal_id = %principal_id, "password changed");
        Ok(())
    }

    /// Subscription events for the caller and, when known, their company.
    ///
    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Store` if a lookup fails.
    pub async fn history(
        &self,
        actor: &AccessRequest,
    ) -> Result<Vec<SubscriptionEvent>, AccountError> {
        let company_id = match actor.company_id {
            Some(id) => Some(id),
            None => match self.directory.find_by_id(actor.principal_id).await? {
                Some(principal) => self.directory.company_of(&principal).await?,
                None => None,
            },
        };
        Ok(self
            .store
            .list_events(actor.principal_id, company_id)
            .await?)
    }

    async fn load(&self, id: PrincipalId) -> Result<Principal, AccountError> {
        self.directory
            .find_by_id(id)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("principal {id}")))
    }

    async fn insert(&self, store: StoreKind, record: &PrincipalRecord) -> Result<(), AccountError> {
        match self.store.insert_principal(store, record).await {
            Ok(()) => Ok(()),
            Err(StoreError::Duplicate(_)) => Err(AccountError::EmailTaken(record.email.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// The company the caller administers.
    async fn administered_company(&self, actor: &AccessRequest) -> Result<CompanyId, AccountError> {
        if !actor.role.is_company_admin() {
            return Err(AccountError::Forbidden(
                "only company admins can manage company members".into(),
            ));
        }
        if let Some(id) = actor.company_id {
            return Ok(id);
        }
        let principal = self.load(actor.principal_id).await?;
        self.directory
            .company_of(&principal)
            .await?
            .ok_or_else(|| AccountError::Forbidden("caller does not administer a company".into()))
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

fn require_platform_admin(actor: &AccessRequest) -> Result<(), AccountError> {
    if actor.role.is_platform_admin() {
        Ok(())
    } else {
        Err(AccountError::Forbidden(
            "only platform admins can review registrations".into(),
        ))
    }
}

fn required(value: &str, field: &str) -> Result<String, AccountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::Invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn validate_email(email: &str) -> Result<String, AccountError> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AccountError::Invalid(format!("{email:?} is not a valid email"))),
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
