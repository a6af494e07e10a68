//! Company repository.

use pharmacare_core::entitlement::{Company, EntitlementMirror};
use pharmacare_shared::types::CompanyId;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::entities::companies;

/// Company repository.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    db: DatabaseConnection,
}

impl CompanyRepository {
    /// Creates a new company repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a company by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: CompanyId) -> Result<Option<Company>, DbErr> {
        Ok(companies::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .map(Company::from))
    }

    /// Creates a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn insert(&self, company: &Company) -> Result<(), DbErr> {
        companies::Entity::insert(companies::ActiveModel::from(company))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Writes the company's entitlement mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn set_mirror(
        &self,
        id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, DbErr> {
        let result = companies::Entity::update_many()
            .col_expr(
                companies::Column::SubscriptionStatus,
                Expr::value(mirror.status.as_str()),
            )
            .col_expr(companies::Column::PlanId, Expr::value(mirror.plan_id.clone()))
            .col_expr(
                companies::Column::SubscriptionEndDate,
                Expr::value(mirror.end_date),
            )
            .col_expr(companies::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(companies::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
