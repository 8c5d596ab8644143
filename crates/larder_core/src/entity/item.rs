//! Shopping list items.

use super::dirty::DirtyFields;
use super::id::EntityId;
use crate::error::{CoreError, CoreResult};
use larder_protocol::wire::WireListItem;
use larder_protocol::{FieldValue, HandlerId};
use std::fmt::Display;

/// Category group assigned to items that have none.
pub const DEFAULT_CATEGORY_MATCH_ID: &str = "other";

/// Item fields that can be changed individually on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    /// Display name.
    Name,
    /// Quantity text.
    Quantity,
    /// Details text.
    Details,
    /// Checked flag.
    Checked,
    /// Category group.
    CategoryMatchId,
    /// Manual sort position.
    ManualSortIndex,
}

impl ItemField {
    /// Returns the handler that applies a change of this field.
    pub fn handler(&self) -> HandlerId {
        match self {
            ItemField::Name => HandlerId::SetListItemName,
            ItemField::Quantity => HandlerId::SetListItemQuantity,
            ItemField::Details => HandlerId::SetListItemDetails,
            ItemField::Checked => HandlerId::SetListItemChecked,
            ItemField::CategoryMatchId => HandlerId::SetListItemCategoryMatchId,
            ItemField::ManualSortIndex => HandlerId::SetListItemSortOrder,
        }
    }
}

/// Initial values for a new item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDraft {
    /// Display name.
    pub name: String,
    /// Quantity text.
    pub quantity: Option<String>,
    /// Details text.
    pub details: Option<String>,
    /// Checked flag.
    pub checked: bool,
    /// Category group. Defaults to `"other"`.
    pub category_match_id: Option<String>,
    /// Manual sort position.
    pub manual_sort_index: i64,
}

impl ItemDraft {
    /// Creates a draft with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// An item on a shopping list.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    identifier: EntityId,
    list_id: Option<String>,
    name: String,
    quantity: Option<String>,
    details: Option<String>,
    checked: bool,
    category: Option<String>,
    user_id: Option<String>,
    category_match_id: String,
    manual_sort_index: i64,
    dirty: DirtyFields<ItemField>,
}

impl Item {
    /// Creates a new item with a fresh identifier, owned by no list.
    pub fn new(draft: ItemDraft) -> Self {
        Self {
            identifier: EntityId::generate(),
            list_id: None,
            name: draft.name,
            quantity: draft.quantity,
            details: draft.details,
            checked: draft.checked,
            category: None,
            user_id: None,
            category_match_id: draft
                .category_match_id
                .unwrap_or_else(|| DEFAULT_CATEGORY_MATCH_ID.to_string()),
            manual_sort_index: draft.manual_sort_index,
            dirty: DirtyFields::new(),
        }
    }

    /// Builds an item from its wire record.
    pub fn from_wire(wire: &WireListItem) -> Self {
        let identifier = if wire.identifier.is_empty() {
            EntityId::generate()
        } else {
            EntityId::from(wire.identifier.as_str())
        };

        Self {
            identifier,
            list_id: wire.list_id.clone(),
            name: wire.name.clone(),
            quantity: wire.quantity.clone(),
            details: wire.details.clone(),
            checked: wire.checked,
            category: wire.category.clone(),
            user_id: wire.user_id.clone(),
            category_match_id: wire
                .category_match_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_MATCH_ID.to_string()),
            manual_sort_index: wire.manual_sort_index,
            dirty: DirtyFields::new(),
        }
    }

    /// Converts to the wire record.
    pub fn to_wire(&self) -> WireListItem {
        WireListItem {
            identifier: self.identifier.to_string(),
            list_id: self.list_id.clone(),
            name: self.name.clone(),
            quantity: self.quantity.clone(),
            details: self.details.clone(),
            checked: self.checked,
            category: self.category.clone(),
            user_id: self.user_id.clone(),
            category_match_id: Some(self.category_match_id.clone()),
            manual_sort_index: self.manual_sort_index,
        }
    }

    /// Returns the identifier.
    pub fn identifier(&self) -> &EntityId {
        &self.identifier
    }

    /// Returns the owning list, if assigned.
    pub fn list_id(&self) -> Option<&str> {
        self.list_id.as_deref()
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the quantity text.
    pub fn quantity(&self) -> Option<&str> {
        self.quantity.as_deref()
    }

    /// Returns the details text.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns true if the item is crossed off.
    pub fn checked(&self) -> bool {
        self.checked
    }

    /// Returns the legacy category label.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Returns the creating user, if assigned.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the category group.
    pub fn category_match_id(&self) -> &str {
        &self.category_match_id
    }

    /// Returns the manual sort position.
    pub fn manual_sort_index(&self) -> i64 {
        self.manual_sort_index
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty.mark(ItemField::Name);
    }

    /// Sets the quantity. Numbers are stored in decimal form.
    pub fn set_quantity(&mut self, quantity: impl Display) {
        self.quantity = Some(quantity.to_string());
        self.dirty.mark(ItemField::Quantity);
    }

    /// Sets the details text.
    pub fn set_details(&mut self, details: impl Into<String>) {
        self.details = Some(details.into());
        self.dirty.mark(ItemField::Details);
    }

    /// Checks or unchecks the item.
    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
        self.dirty.mark(ItemField::Checked);
    }

    /// Moves the item to another category group.
    pub fn set_category_match_id(&mut self, category_match_id: impl Into<String>) {
        self.category_match_id = category_match_id.into();
        self.dirty.mark(ItemField::CategoryMatchId);
    }

    /// Sets the manual sort position.
    pub fn set_manual_sort_index(&mut self, index: i64) {
        self.manual_sort_index = index;
        self.dirty.mark(ItemField::ManualSortIndex);
    }

    /// Assigns the owning list. Items cannot move between lists.
    pub fn assign_list(&mut self, list_id: impl Into<String>) -> CoreResult<()> {
        if self.list_id.is_some() {
            return Err(CoreError::locked_field("item", "list_id"));
        }
        self.list_id = Some(list_id.into());
        Ok(())
    }

    /// Assigns the creating user. Can only happen once.
    pub fn assign_user_id(&mut self, user_id: impl Into<String>) -> CoreResult<()> {
        if self.user_id.is_some() {
            return Err(CoreError::locked_field("item", "user_id"));
        }
        self.user_id = Some(user_id.into());
        Ok(())
    }

    /// Returns the current value of a field, typed for the wire.
    pub fn field_value(&self, field: ItemField) -> FieldValue {
        match field {
            ItemField::Name => FieldValue::Text(self.name.clone()),
            ItemField::Quantity => FieldValue::Text(self.quantity.clone().unwrap_or_default()),
            ItemField::Details => FieldValue::Text(self.details.clone().unwrap_or_default()),
            ItemField::Checked => FieldValue::Flag(self.checked),
            ItemField::CategoryMatchId => FieldValue::Text(self.category_match_id.clone()),
            ItemField::ManualSortIndex => FieldValue::Integer(self.manual_sort_index),
        }
    }

    /// Returns the locally modified fields in modification order.
    pub fn dirty_fields(&self) -> &[ItemField] {
        self.dirty.fields()
    }

    /// Returns true if the item has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Marks every change as saved.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    pub(crate) fn set_checked_clean(&mut self, checked: bool) {
        self.checked = checked;
    }
}
