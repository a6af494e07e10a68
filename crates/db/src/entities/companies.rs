//! `SeaORM` Entity for companies table.

use pharmacare_core::entitlement::Company;
use pharmacare_shared::types::{CompanyId, PrincipalId};
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{mirror_from_columns, utc};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub admin_principal_id: Option<Uuid>,
    pub subscription_status: String,
    pub plan_id: Option<String>,
    pub subscription_end_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::principals::Entity")]
    Principals,
    #[sea_orm(has_many = "super::company_principals::Entity")]
    CompanyPrincipals,
}

impl Related<super::principals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Principals.def()
    }
}

impl Related<super::company_principals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompanyPrincipals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Company {
    fn from(model: Model) -> Self {
        Self {
            id: CompanyId::from_uuid(model.id),
            name: model.name,
            admin_principal_id: model.admin_principal_id.map(PrincipalId::from_uuid),
            mirror: mirror_from_columns(
                &model.subscription_status,
                model.plan_id,
                model.subscription_end_date,
            ),
            created_at: utc(model.created_at),
        }
    }
}

impl From<&Company> for ActiveModel {
    fn from(company: &Company) -> Self {
        let now = chrono::Utc::now().into();
        Self {
            id: Set(company.id.into_inner()),
            name: Set(company.name.clone()),
            admin_principal_id: Set(company.admin_principal_id.map(PrincipalId::into_inner)),
            subscription_status: Set(company.mirror.status.as_str().to_string()),
            plan_id: Set(company.mirror.plan_id.clone()),
            subscription_end_date: Set(company.mirror.end_date.map(Into::into)),
            created_at: Set(company.created_at.into()),
            updated_at: Set(now),
        }
    }
}
