//! Tree navigation over structural item data.
//!
//! # Responsibility
//! - Answer parent, children, root and template-membership queries.
//! - Graft this store's top-level items under an external join parent.
//!
//! # Invariants
//! - Navigation never reads field content.
//! - A stored nil parent is reported as the join parent, and children of the
//!   join parent are the items with a nil parent.

use crate::model::item::{ItemId, StructuralMetadata, ROOT_ITEM_ID, TEMPLATE_TEMPLATE_ID};
use crate::repo::item_repo::ItemStore;
use crate::repo::StoreResult;
use uuid::Uuid;

/// Structural tree queries bound to one join parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNavigator {
    join_parent: ItemId,
}

impl TreeNavigator {
    pub fn new(join_parent: ItemId) -> Self {
        Self { join_parent }
    }

    pub fn join_parent(&self) -> ItemId {
        self.join_parent
    }

    /// Well-known root identity.
    pub fn root(&self) -> ItemId {
        ROOT_ITEM_ID
    }

    /// Maps a host-facing parent id to the value stored in documents.
    pub fn stored_parent(&self, parent_id: ItemId) -> ItemId {
        if parent_id == self.join_parent {
            Uuid::nil()
        } else {
            parent_id
        }
    }

    /// Host-facing parent of an item given its structure.
    pub fn parent_of(&self, structure: &StructuralMetadata) -> ItemId {
        if structure.parent_id.is_nil() {
            self.join_parent
        } else {
            structure.parent_id
        }
    }

    /// Ids of the direct children of `parent_id`, in insertion order.
    pub fn children<S: ItemStore>(&self, store: &S, parent_id: ItemId) -> StoreResult<Vec<ItemId>> {
        store.find_ids_by_parent(self.stored_parent(parent_id))
    }

    /// Ids of every item based on `template_id`.
    pub fn items_by_template<S: ItemStore>(
        &self,
        store: &S,
        template_id: ItemId,
    ) -> StoreResult<Vec<ItemId>> {
        store.find_ids_by_template(template_id)
    }

    /// Ids of every item that is itself a template definition.
    pub fn template_item_ids<S: ItemStore>(&self, store: &S) -> StoreResult<Vec<ItemId>> {
        self.items_by_template(store, TEMPLATE_TEMPLATE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::TreeNavigator;
    use crate::model::item::{StructuralMetadata, ROOT_ITEM_ID};
    use uuid::Uuid;

    fn structure(parent_id: Uuid) -> StructuralMetadata {
        StructuralMetadata {
            item_id: Uuid::new_v4(),
            parent_id,
            name: "node".to_string(),
            template_id: Uuid::new_v4(),
            branch_id: Uuid::nil(),
        }
    }

    #[test]
    fn nil_parent_maps_to_join_parent_and_back() {
        let join = Uuid::new_v4();
        let navigator = TreeNavigator::new(join);

        assert_eq!(navigator.parent_of(&structure(Uuid::nil())), join);
        assert!(navigator.stored_parent(join).is_nil());
    }

    #[test]
    fn stored_parent_passes_through_regular_ids() {
        let navigator = TreeNavigator::new(Uuid::new_v4());
        let parent = Uuid::new_v4();

        assert_eq!(navigator.parent_of(&structure(parent)), parent);
        assert_eq!(navigator.stored_parent(parent), parent);
        assert_eq!(navigator.root(), ROOT_ITEM_ID);
    }
}
