//! Shopping lists.

use super::id::EntityId;
use super::item::Item;
use larder_protocol::wire::WireList;

/// A shopping list and the items it owns, in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    identifier: EntityId,
    name: String,
    items: Vec<Item>,
}

impl List {
    /// Builds a list from its wire record.
    pub fn from_wire(wire: &WireList) -> Self {
        Self {
            identifier: EntityId::from(wire.identifier.as_str()),
            name: wire.name.clone(),
            items: wire.items.iter().map(Item::from_wire).collect(),
        }
    }

    /// Converts to the wire record.
    pub fn to_wire(&self) -> WireList {
        WireList {
            identifier: self.identifier.to_string(),
            name: self.name.clone(),
            items: self.items.iter().map(Item::to_wire).collect(),
        }
    }

    /// Returns the identifier.
    pub fn identifier(&self) -> &EntityId {
        &self.identifier
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the items.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Finds an item by id.
    pub fn item_by_id(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.identifier() == item_id)
    }

    /// Finds the first item with the given name.
    pub fn item_by_name(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name() == name)
    }

    /// Records an item the server accepted into this list.
    pub fn apply_added(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Drops an item the server removed. Returns the removed item.
    pub fn apply_removed(&mut self, item_id: &str) -> Option<Item> {
        let index = self
            .items
            .iter()
            .position(|item| item.identifier() == item_id)?;
        Some(self.items.remove(index))
    }

    /// Replaces the stored copy of an item the server accepted changes for.
    ///
    /// Returns false if the item is not on this list.
    pub fn apply_saved(&mut self, saved: &Item) -> bool {
        match self
            .items
            .iter_mut()
            .find(|item| item.identifier() == saved.identifier())
        {
            Some(slot) => {
                *slot = saved.clone();
                slot.mark_clean();
                true
            }
            None => false,
        }
    }

    /// Unchecks every item after the server accepted an uncheck-all.
    pub fn apply_unchecked_all(&mut self) {
        for item in &mut self.items {
            item.set_checked_clean(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::item::ItemDraft;
    use larder_protocol::wire::WireListItem;

    fn groceries() -> List {
        List::from_wire(&WireList {
            identifier: "l1".into(),
            name: "Groceries".into(),
            items: vec![
                WireListItem {
                    identifier: "i1".into(),
                    name: "Milk".into(),
                    checked: true,
                    ..Default::default()
                },
                WireListItem {
                    identifier: "i2".into(),
                    name: "Eggs".into(),
                    checked: true,
                    ..Default::default()
                },
            ],
        })
    }

    #[test]
    fn lookups() {
        let list = groceries();
        assert_eq!(list.name(), "Groceries");
        assert_eq!(list.items().len(), 2);
        assert_eq!(list.item_by_name("Eggs").unwrap().identifier(), "i2");
        assert!(list.item_by_id("missing").is_none());
    }

    #[test]
    fn add_and_remove() {
        let mut list = groceries();
        let item = Item::new(ItemDraft::named("Bread"));
        let id = item.identifier().to_string();

        list.apply_added(item);
        assert_eq!(list.items().last().unwrap().name(), "Bread");

        let removed = list.apply_removed(&id).unwrap();
        assert_eq!(removed.name(), "Bread");
        assert!(list.apply_removed(&id).is_none());
    }

    #[test]
    fn uncheck_all_leaves_items_clean() {
        let mut list = groceries();
        list.apply_unchecked_all();
        assert!(list.items().iter().all(|item| !item.checked()));
        assert!(list.items().iter().all(|item| !item.is_dirty()));
    }

    #[test]
    fn saved_item_replaces_stored_copy() {
        let mut list = groceries();
        let mut edited = list.item_by_id("i1").unwrap().clone();
        edited.set_name("Oat milk");

        assert!(list.apply_saved(&edited));
        let stored = list.item_by_id("i1").unwrap();
        assert_eq!(stored.name(), "Oat milk");
        assert!(!stored.is_dirty());
    }
}
