//! Principal repository over the primary and company-scoped tables.

use pharmacare_core::entitlement::EntitlementMirror;
use pharmacare_core::principal::{PrincipalRecord, StoreKind};
use pharmacare_shared::types::{CompanyId, PrincipalId};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{company_principals, principals};

/// Runs `$body` with `$t` bound to the entity module for `$store`.
///
/// Both tables share one column set, so every query is written once.
macro_rules! on_table {
    ($store:expr, |$t:ident| $body:expr) => {
        match $store {
            StoreKind::Primary => {
                use principals as $t;
                $body
            }
            StoreKind::CompanyScoped => {
                use company_principals as $t;
                $body
            }
        }
    };
}

/// Principal repository.
#[derive(Debug, Clone)]
pub struct PrincipalRepository {
    db: DatabaseConnection,
}

impl PrincipalRepository {
    /// Creates a new principal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a principal by normalized email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(
        &self,
        store: StoreKind,
        email: &str,
    ) -> Result<Option<PrincipalRecord>, DbErr> {
        on_table!(store, |t| {
            t::Entity::find()
                .filter(t::Column::Email.eq(email))
                .one(&self.db)
                .await
                .map(|row| row.map(t::Model::into_record))
        })
    }

    /// Finds a principal by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        store: StoreKind,
        id: PrincipalId,
    ) -> Result<Option<PrincipalRecord>, DbErr> {
        on_table!(store, |t| {
            t::Entity::find_by_id(id.into_inner())
                .one(&self.db)
                .await
                .map(|row| row.map(t::Model::into_record))
        })
    }

    /// Lists the IDs of principals linked to a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn ids_in_company(
        &self,
        store: StoreKind,
        company_id: CompanyId,
    ) -> Result<Vec<PrincipalId>, DbErr> {
        let ids: Vec<Uuid> = on_table!(store, |t| {
            t::Entity::find()
                .select_only()
                .column(t::Column::Id)
                .filter(t::Column::CompanyId.eq(company_id.into_inner()))
                .into_tuple()
                .all(&self.db)
                .await?
        });
        Ok(ids.into_iter().map(PrincipalId::from_uuid).collect())
    }

    /// Inserts a principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including on a unique email.
    pub async fn insert(&self, store: StoreKind, record: &PrincipalRecord) -> Result<(), DbErr> {
        on_table!(store, |t| {
            t::Entity::insert(t::ActiveModel::from(record))
                .exec_without_returning(&self.db)
                .await?;
        });
        Ok(())
    }

    /// Overwrites the profile columns of a principal, leaving the mirror.
    ///
    /// Returns false if no row matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update_profile(
        &self,
        store: StoreKind,
        record: &PrincipalRecord,
    ) -> Result<bool, DbErr> {
        let now = chrono::Utc::now();
        let result = on_table!(store, |t| {
            t::Entity::update_many()
                .col_expr(t::Column::Email, Expr::value(record.email.clone()))
                .col_expr(t::Column::FullName, Expr::value(record.full_name.clone()))
                .col_expr(
                    t::Column::PasswordHash,
                    Expr::value(record.password_hash.clone()),
                )
                .col_expr(t::Column::Role, Expr::value(record.role.as_str()))
                .col_expr(t::Column::AccountKind, Expr::value(record.account_kind.as_str()))
                .col_expr(t::Column::Approved, Expr::value(record.approved))
                .col_expr(
                    t::Column::CompanyId,
                    Expr::value(record.company_id.map(CompanyId::into_inner)),
                )
                .col_expr(t::Column::UpdatedAt, Expr::value(now))
                .filter(t::Column::Id.eq(record.id.into_inner()))
                .exec(&self.db)
                .await?
        });
        Ok(result.rows_affected > 0)
    }

    /// Hard-deletes a principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete(&self, store: StoreKind, id: PrincipalId) -> Result<bool, DbErr> {
        let result = on_table!(store, |t| {
            t::Entity::delete_by_id(id.into_inner()).exec(&self.db).await?
        });
        Ok(result.rows_affected > 0)
    }

    /// Writes the entitlement mirror of one principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn set_mirror(
        &self,
        store: StoreKind,
        id: PrincipalId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, DbErr> {
        let now = chrono::Utc::now();
        let result = on_table!(store, |t| {
            t::Entity::update_many()
                .col_expr(t::Column::SubscriptionStatus, Expr::value(mirror.status.as_str()))
                .col_expr(t::Column::PlanId, Expr::value(mirror.plan_id.clone()))
                .col_expr(t::Column::SubscriptionEndDate, Expr::value(mirror.end_date))
                .col_expr(t::Column::UpdatedAt, Expr::value(now))
                .filter(t::Column::Id.eq(id.into_inner()))
                .exec(&self.db)
                .await?
        });
        Ok(result.rows_affected > 0)
    }

    /// Writes the entitlement mirror of every principal in a company.
    ///
    /// Returns the number of rows touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn set_company_mirror(
        &self,
        store: StoreKind,
        company_id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<u64, DbErr> {
        let now = chrono::Utc::now();
        let result = on_table!(store, |t| {
            t::Entity::update_many()
                .col_expr(t::Column::SubscriptionStatus, Expr::value(mirror.status.as_str()))
                .col_expr(t::Column::PlanId, Expr::value(mirror.plan_id.clone()))
                .col_expr(t::Column::SubscriptionEndDate, Expr::value(mirror.end_date))
                .col_expr(t::Column::UpdatedAt, Expr::value(now))
                .filter(t::Column::CompanyId.eq(company_id.into_inner()))
                .exec(&self.db)
                .await?
        });
        Ok(result.rows_affected)
    }
}
