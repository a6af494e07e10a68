//! Payment repository.

use chrono::{DateTime, Utc};
use pharmacare_core::payment::{PaymentRecord, PaymentStatus};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::entities::payments;

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stores a new payment record.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including on a reused `tx_ref`.
    pub async fn insert(&self, record: &PaymentRecord) -> Result<(), DbErr> {
        payments::Entity::insert(payments::ActiveModel::from(record))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Finds a payment by its correlation id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_tx_ref(&self, tx_ref: &str) -> Result<Option<PaymentRecord>, DbErr> {
        Ok(payments::Entity::find()
            .filter(payments::Column::TxRef.eq(tx_ref))
            .one(&self.db)
            .await?
            .map(payments::Model::into_record))
    }

    /// Moves a pending payment to a terminal status.
    ///
    /// The `status = 'pending'` guard makes this the single point where
    /// concurrent confirmations race; exactly one caller sees `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn complete(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        gateway_response: &serde_json::Value,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<bool, DbErr> {
        let result = payments::Entity::update_many()
            .col_expr(payments::Column::Status, Expr::value(status.as_str()))
            .col_expr(
                payments::Column::GatewayResponse,
                Expr::value(gateway_response.clone()),
            )
            .col_expr(payments::Column::PaidAt, Expr::value(paid_at))
            .col_expr(payments::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payments::Column::TxRef.eq(tx_ref))
            .filter(payments::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
