//! `SeaORM` Entity for the company-scoped principals table.

use pharmacare_core::auth::{AccountKind, Role};
use pharmacare_core::principal::PrincipalRecord;
use pharmacare_shared::types::{CompanyId, PrincipalId};
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{mirror_from_columns, utc};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company_principals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
    pub account_kind: String,
    pub approved: bool,
    pub company_id: Option<Uuid>,
    pub subscription_status: String,
    pub plan_id: Option<String>,
    pub subscription_end_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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

impl Model {
    /// Converts the row into the domain record.
    #[must_use]
    pub fn into_record(self) -> PrincipalRecord {
        PrincipalRecord {
            id: PrincipalId::from_uuid(self.id),
            email: self.email,
            full_name: self.full_name,
            password_hash: self.password_hash,
            role: Role::from(self.role),
            account_kind: self.account_kind.parse::<AccountKind>().unwrap_or_default(),
            approved: self.approved,
            company_id: self.company_id.map(CompanyId::from_uuid),
            mirror: mirror_from_columns(
                &self.subscription_status,
                self.plan_id,
                self.subscription_end_date,
            ),
            created_at: utc(self.created_at),
        }
    }
}

impl From<&PrincipalRecord> for ActiveModel {
    fn from(record: &PrincipalRecord) -> Self {
        let now = chrono::Utc::now().into();
        Self {
            id: Set(record.id.into_inner()),
            email: Set(record.email.clone()),
            full_name: Set(record.full_name.clone()),
            password_hash: Set(record.password_hash.clone()),
            role: Set(record.role.as_str().to_string()),
            account_kind: Set(record.account_kind.as_str().to_string()),
            approved: Set(record.approved),
            company_id: Set(record.company_id.map(CompanyId::into_inner)),
            subscription_status: Set(record.mirror.status.as_str().to_string()),
            plan_id: Set(record.mirror.plan_id.clone()),
            subscription_end_date: Set(record.mirror.end_date.map(Into::into)),
            created_at: Set(record.created_at.into()),
            updated_at: Set(now),
        }
    }
}
