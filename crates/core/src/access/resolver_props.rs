//! Property-based tests for access resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use uuid::Uuid;

use pharmacare_shared::types::{CompanyId, PrincipalId};

use crate::access::{AccessRequest, AccessResolver, AccessScope, ScopeRule};
use crate::auth::{AccountKind, Role};
use crate::principal::StoreKind;
use crate::testing::{FailPoint, InMemoryStore, principal_record};

fn arb_principal_id() -> impl Strategy<Value = PrincipalId> {
    any::<u128>().prop_map(|n| PrincipalId::from_uuid(Uuid::from_u128(n)))
}

fn arb_company_id() -> impl Strategy<Value = Option<CompanyId>> {
    prop_oneof![
        Just(None),
        any::<u128>().prop_map(|n| Some(CompanyId::from_uuid(Uuid::from_u128(n)))),
    ]
}

fn arb_non_admin_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::CompanyAdmin),
        Just(Role::CompanyUser),
        Just(Role::Pharmacist),
        Just(Role::Nurse),
        Just(Role::Doctor),
        "[a-z_]{3,12}"
            .prop_filter("not a reserved role", |s| {
                !matches!(s.as_str(), "admin" | "company_admin" | "company_user")
            })
            .prop_map(Role::Other),
    ]
}

fn arb_account_kind() -> impl Strategy<Value = AccountKind> {
    prop_oneof![
        Just(AccountKind::Individual),
        Just(AccountKind::Company),
        Just(AccountKind::CompanyUser),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Admins always get the unrestricted scope, whatever else they declare.
    #[test]
    fn prop_admin_always_all(
        id in arb_principal_id(),
        company in arb_company_id(),
        kind in arb_account_kind(),
    ) {
        let request = AccessRequest { principal_id: id, role: Role::Admin, company_id: company, account_kind: kind };
        prop_assert_eq!(ScopeRule::for_request(&request), ScopeRule::All);
    }

    /// Non-admins never get `All`, and every finite scope contains the requester.
    #[test]
    fn prop_non_admin_scope_contains_self(
        id in arb_principal_id(),
        role in arb_non_admin_role(),
        company in arb_company_id(),
        kind in arb_account_kind(),
        members in 0usize..6,
        fail in any::<bool>(),
    ) {
        let store = Arc::new(InMemoryStore::default());
        if let Some(company_id) = company {
            for n in 0..members {
                let kind = if n % 2 == 0 { StoreKind::Primary } else { StoreKind::CompanyScoped };
                store.put_principal(
                    kind,
                    principal_record(&format!("m{n}@co.test"), Role::CompanyUser, Some(company_id)),
                );
            }
        }
        if fail {
            store.fail(FailPoint::PrincipalReads);
        }
        let resolver = AccessResolver::new(store);
        let request = AccessRequest { principal_id: id, role, company_id: company, account_kind: kind };

        let scope = runtime().block_on(resolver.resolve(&request));

        prop_assert!(!scope.is_all());
        prop_assert!(scope.allows(id));
        if fail {
            prop_assert_eq!(scope, AccessScope::own(id));
        }
    }

    /// With no company anywhere, a non-admin sees exactly themselves.
    #[test]
    fn prop_no_company_means_exactly_self(
        id in arb_principal_id(),
        role in arb_non_admin_role(),
        kind in arb_account_kind(),
    ) {
        let resolver = AccessResolver::new(Arc::new(InMemoryStore::default()));
        let request = AccessRequest { principal_id: id, role, company_id: None, account_kind: kind };

        let scope = runtime().block_on(resolver.resolve(&request));

        prop_assert_eq!(scope, AccessScope::Ids(BTreeSet::from([id])));
    }
}
