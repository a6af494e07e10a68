//! Subscription history repository.
//!
//! Rows are only ever appended. `tx_ref` is unique, so a second append for
//! the same payment is a no-op.

use chrono::{DateTime, Utc};
use pharmacare_core::entitlement::{SubscriptionEvent, SubscriptionStatus};
use pharmacare_shared::types::{CompanyId, PrincipalId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};

use crate::entities::subscription_events;

/// Subscription history repository.
#[derive(Debug, Clone)]
pub struct SubscriptionEventRepository {
    db: DatabaseConnection,
}

impl SubscriptionEventRepository {
    /// Creates a new subscription history repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends an event unless one with the same `tx_ref` exists.
    ///
    /// Returns true if a row was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn append(&self, event: &SubscriptionEvent) -> Result<bool, DbErr> {
        let inserted = subscription_events::Entity::insert(subscription_events::ActiveModel::from(
            event,
        ))
        .on_conflict(
            OnConflict::column(subscription_events::Column::TxRef)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        Ok(inserted > 0)
    }

    /// Finds the event written for a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_tx_ref(&self, tx_ref: &str) -> Result<Option<SubscriptionEvent>, DbErr> {
        Ok(subscription_events::Entity::find()
            .filter(subscription_events::Column::TxRef.eq(tx_ref))
            .one(&self.db)
            .await?
            .map(SubscriptionEvent::from))
    }

    /// The company event that runs longest past `now`, if any is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn latest_active_for_company(
        &self,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEvent>, DbErr> {
        Ok(subscription_events::Entity::find()
            .filter(subscription_events::Column::CompanyId.eq(company_id.into_inner()))
            .filter(subscription_events::Column::Status.eq(SubscriptionStatus::Active.as_str()))
            .filter(subscription_events::Column::EndDate.gt(now))
            .order_by_desc(subscription_events::Column::EndDate)
            .one(&self.db)
            .await?
            .map(SubscriptionEvent::from))
    }

    /// Events paid by `principal_id` or covering `company_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        principal_id: PrincipalId,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<SubscriptionEvent>, DbErr> {
        let mut owners = Condition::any()
            .add(subscription_events::Column::PrincipalId.eq(principal_id.into_inner()));
        if let Some(company_id) = company_id {
            owners = owners.add(subscription_events::Column::CompanyId.eq(company_id.into_inner()));
        }

        Ok(subscription_events::Entity::find()
            .filter(owners)
            .order_by_desc(subscription_events::Column::StartDate)
            .all(&self.db)
            .await?
            .into_iter()
            .map(SubscriptionEvent::from)
            .collect())
    }
}
