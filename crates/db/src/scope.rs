//! Applying an access scope to a query.
//!
//! Record handlers resolve an `AccessScope` and then call
//! [`ScopedSelect::within_scope`] with the column that holds the owning
//! principal's ID.

use pharmacare_core::access::AccessScope;
use pharmacare_shared::types::PrincipalId;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select};

/// Filters a select down to the rows an access scope may see.
pub trait ScopedSelect: Sized {
    /// Adds `owner IN (...)` for an `Ids` scope; leaves an `All` scope
    /// unfiltered.
    #[must_use]
    fn within_scope<C: ColumnTrait>(self, owner: C, scope: &AccessScope) -> Self;
}

impl<E: EntityTrait> ScopedSelect for Select<E> {
    fn within_scope<C: ColumnTrait>(self, owner: C, scope: &AccessScope) -> Self {
        match scope.owner_ids() {
            None => self,
            Some(ids) => self.filter(owner.is_in(ids.iter().copied().map(PrincipalId::into_inner))),
        }
    }
}
