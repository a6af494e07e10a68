//! `SeaORM` Entity for payments table.

use pharmacare_core::payment::{PaymentRecord, PaymentStatus};
use pharmacare_shared::types::PaymentId;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::utc;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub tx_ref: String,
    pub principal_email: String,
    pub plan_id: String,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub gateway_response: Json,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain record.
    ///
    /// A status the state machine does not know is read as pending, which
    /// keeps the record open to reconciliation rather than closing it.
    #[must_use]
    pub fn into_record(self) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::from_uuid(self.id),
            tx_ref: self.tx_ref,
            principal_email: self.principal_email,
            plan_id: self.plan_id,
            amount: self.amount,
            currency: self.currency,
            status: PaymentStatus::parse(&self.status).unwrap_or(PaymentStatus::Pending),
            gateway_response: self.gateway_response,
            paid_at: self.paid_at.map(utc),
            created_at: utc(self.created_at),
        }
    }
}

impl From<&PaymentRecord> for ActiveModel {
    fn from(record: &PaymentRecord) -> Self {
        let now = chrono::Utc::now().into();
        Self {
            id: Set(record.id.into_inner()),
            tx_ref: Set(record.tx_ref.clone()),
            principal_email: Set(record.principal_email.clone()),
            plan_id: Set(record.plan_id.clone()),
            amount: Set(record.amount),
            currency: Set(record.currency.clone()),
            status: Set(record.status.as_str().to_string()),
            gateway_response: Set(record.gateway_response.clone()),
            paid_at: Set(record.paid_at.map(Into::into)),
            created_at: Set(record.created_at.into()),
            updated_at: Set(now),
        }
    }
}
