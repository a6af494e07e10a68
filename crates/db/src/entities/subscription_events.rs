//! `SeaORM` Entity for the append-only subscription history.

use pharmacare_core::entitlement::{SubscriptionEvent, SubscriptionStatus};
use pharmacare_shared::types::{CompanyId, PrincipalId, SubscriptionEventId};
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::utc;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub principal_id: Uuid,
    pub company_id: Option<Uuid>,
    pub plan_id: String,
    pub status: String,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    #[sea_orm(unique)]
    pub tx_ref: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SubscriptionEvent {
    fn from(model: Model) -> Self {
        Self {
            id: SubscriptionEventId::from_uuid(model.id),
            principal_id: PrincipalId::from_uuid(model.principal_id),
            company_id: model.company_id.map(CompanyId::from_uuid),
            plan_id: model.plan_id,
            status: SubscriptionStatus::parse(&model.status),
            start_date: utc(model.start_date),
            end_date: utc(model.end_date),
            tx_ref: model.tx_ref,
            created_at: utc(model.created_at),
        }
    }
}

impl From<&SubscriptionEvent> for ActiveModel {
    fn from(event: &SubscriptionEvent) -> Self {
        Self {
            id: Set(event.id.into_inner()),
            principal_id: Set(event.principal_id.into_inner()),
            company_id: Set(event.company_id.map(CompanyId::into_inner)),
            plan_id: Set(event.plan_id.clone()),
            status: Set(event.status.as_str().to_string()),
            start_date: Set(event.start_date.into()),
            end_date: Set(event.end_date.into()),
            tx_ref: Set(event.tx_ref.clone()),
            created_at: Set(event.created_at.into()),
        }
    }
}
