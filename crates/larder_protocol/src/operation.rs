//! Operations submitted to the service.
//!
//! An `Operation` is one discrete change: a handler name, the ids of the
//! entities it targets and an optional payload. The server applies the
//! operations of a batch in order.

use crate::error::ProtocolError;
use crate::wire::{
    WireCalendarEvent, WireListItem, WireOperation, WireOperationMetadata, WireRecipe,
    WireRecipeCollection,
};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Update endpoint a batch is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Lists and list items.
    ShoppingLists,
    /// Recipes and recipe collections.
    RecipeData,
    /// Meal-planning calendar events.
    MealPlanningCalendar,
}

impl Endpoint {
    /// Returns the path relative to the service base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ShoppingLists => "data/shopping-lists/update",
            Endpoint::RecipeData => "data/user-recipe-data/update",
            Endpoint::MealPlanningCalendar => "data/meal-planning-calendar/update",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Server-side handler that applies an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerId {
    /// Rename a list item.
    SetListItemName,
    /// Change a list item's quantity.
    SetListItemQuantity,
    /// Change a list item's details.
    SetListItemDetails,
    /// Check or uncheck a list item.
    SetListItemChecked,
    /// Move a list item to another category group.
    SetListItemCategoryMatchId,
    /// Reorder a list item.
    SetListItemSortOrder,
    /// Add an item to a list.
    AddShoppingListItem,
    /// Remove an item from a list.
    RemoveShoppingListItem,
    /// Uncheck every item of a list.
    UncheckAll,
    /// Create or replace a recipe.
    SaveRecipe,
    /// Delete a recipe.
    RemoveRecipe,
    /// Create a recipe collection.
    NewRecipeCollection,
    /// Delete a recipe collection.
    RemoveRecipeCollection,
    /// Add recipes to a collection.
    AddRecipesToCollection,
    /// Remove recipes from a collection.
    RemoveRecipesFromCollection,
    /// Create a calendar event.
    NewEvent,
    /// Replace a calendar event.
    SaveEvent,
    /// Delete a calendar event.
    DeleteEvent,
}

impl HandlerId {
    /// Every handler, in declaration order.
    pub const ALL: [HandlerId; 18] = [
        HandlerId::SetListItemName,
        HandlerId::SetListItemQuantity,
        HandlerId::SetListItemDetails,
        HandlerId::SetListItemChecked,
        HandlerId::SetListItemCategoryMatchId,
        HandlerId::SetListItemSortOrder,
        HandlerId::AddShoppingListItem,
        HandlerId::RemoveShoppingListItem,
        HandlerId::UncheckAll,
        HandlerId::SaveRecipe,
        HandlerId::RemoveRecipe,
        HandlerId::NewRecipeCollection,
        HandlerId::RemoveRecipeCollection,
        HandlerId::AddRecipesToCollection,
        HandlerId::RemoveRecipesFromCollection,
        HandlerId::NewEvent,
        HandlerId::SaveEvent,
        HandlerId::DeleteEvent,
    ];

    /// Returns the handler name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerId::SetListItemName => "set-list-item-name",
            HandlerId::SetListItemQuantity => "set-list-item-quantity",
            HandlerId::SetListItemDetails => "set-list-item-details",
            HandlerId::SetListItemChecked => "set-list-item-checked",
            HandlerId::SetListItemCategoryMatchId => "set-list-item-category-match-id",
            HandlerId::SetListItemSortOrder => "set-list-item-sort-order",
            HandlerId::AddShoppingListItem => "add-shopping-list-item",
            HandlerId::RemoveShoppingListItem => "remove-shopping-list-item",
            HandlerId::UncheckAll => "uncheck-all",
            HandlerId::SaveRecipe => "save-recipe",
            HandlerId::RemoveRecipe => "remove-recipe",
            HandlerId::NewRecipeCollection => "new-recipe-collection",
            HandlerId::RemoveRecipeCollection => "remove-recipe-collection",
            HandlerId::AddRecipesToCollection => "add-recipes-to-collection",
            HandlerId::RemoveRecipesFromCollection => "remove-recipes-from-collection",
            HandlerId::NewEvent => "new-event",
            HandlerId::SaveEvent => "save-event",
            HandlerId::DeleteEvent => "delete-event",
        }
    }

    /// Returns the endpoint this handler is served on.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            HandlerId::SetListItemName
            | HandlerId::SetListItemQuantity
            | HandlerId::SetListItemDetails
            | HandlerId::SetListItemChecked
            | HandlerId::SetListItemCategoryMatchId
            | HandlerId::SetListItemSortOrder
            | HandlerId::AddShoppingListItem
            | HandlerId::RemoveShoppingListItem
            | HandlerId::UncheckAll => Endpoint::ShoppingLists,
            HandlerId::SaveRecipe
            | HandlerId::RemoveRecipe
            | HandlerId::NewRecipeCollection
            | HandlerId::RemoveRecipeCollection
            | HandlerId::AddRecipesToCollection
            | HandlerId::RemoveRecipesFromCollection => Endpoint::RecipeData,
            HandlerId::NewEvent | HandlerId::SaveEvent | HandlerId::DeleteEvent => {
                Endpoint::MealPlanningCalendar
            }
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HandlerId::ALL
            .iter()
            .copied()
            .find(|handler| handler.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownHandler(s.to_string()))
    }
}

/// A single field value carried by a field-level operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Boolean flag.
    Flag(bool),
    /// Integer.
    Integer(i64),
}

impl FieldValue {
    /// Normalizes the value to the string the server expects.
    ///
    /// Flags become `"y"` or `"n"`, integers their decimal form.
    pub fn to_wire(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Flag(true) => "y".to_string(),
            FieldValue::Flag(false) => "n".to_string(),
            FieldValue::Integer(n) => n.to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// Metadata every operation carries.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationMetadata {
    /// Fresh random id, 32 lowercase hex characters.
    pub operation_id: String,
    /// Handler that applies the operation.
    pub handler: HandlerId,
    /// Acting user, when known.
    pub user_id: Option<String>,
}

impl OperationMetadata {
    /// Creates metadata with a freshly generated operation id.
    pub fn new(handler: HandlerId, user_id: Option<String>) -> Self {
        Self {
            operation_id: Uuid::new_v4().simple().to_string(),
            handler,
            user_id,
        }
    }
}

/// Ids of the entities an operation applies to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationTarget {
    /// Target list.
    pub list_id: Option<String>,
    /// Target list item.
    pub list_item_id: Option<String>,
    /// Recipe data container.
    pub recipe_data_id: Option<String>,
    /// Recipes affected by a collection change.
    pub recipe_ids: Vec<String>,
    /// Target calendar.
    pub calendar_id: Option<String>,
    /// Target calendar event.
    pub event_id: Option<String>,
}

impl OperationTarget {
    /// Targets a whole list.
    pub fn list(list_id: impl Into<String>) -> Self {
        Self {
            list_id: Some(list_id.into()),
            ..Default::default()
        }
    }

    /// Targets one item of a list.
    pub fn list_item(list_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            list_id: Some(list_id.into()),
            list_item_id: Some(item_id.into()),
            ..Default::default()
        }
    }

    /// Targets the recipe data container.
    pub fn recipe_data(recipe_data_id: impl Into<String>) -> Self {
        Self {
            recipe_data_id: Some(recipe_data_id.into()),
            ..Default::default()
        }
    }

    /// Targets one event of a calendar.
    pub fn calendar_event(calendar_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            calendar_id: Some(calendar_id.into()),
            event_id: Some(event_id.into()),
            ..Default::default()
        }
    }

    /// Adds recipe ids to the target.
    pub fn with_recipe_ids(mut self, recipe_ids: Vec<String>) -> Self {
        self.recipe_ids = recipe_ids;
        self
    }
}

/// Data carried by an operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OperationPayload {
    /// No payload.
    #[default]
    None,
    /// A single field value.
    Value(FieldValue),
    /// A whole list item.
    ListItem(WireListItem),
    /// A whole recipe.
    Recipe(WireRecipe),
    /// A whole recipe collection.
    RecipeCollection(WireRecipeCollection),
    /// A whole calendar event.
    CalendarEvent(WireCalendarEvent),
}

/// One discrete, replayable change.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operation metadata.
    pub metadata: OperationMetadata,
    /// Target ids.
    pub target: OperationTarget,
    /// Payload.
    pub payload: OperationPayload,
}

impl Operation {
    /// Creates an operation with fresh metadata.
    pub fn new(
        handler: HandlerId,
        user_id: Option<String>,
        target: OperationTarget,
        payload: OperationPayload,
    ) -> Self {
        Self {
            metadata: OperationMetadata::new(handler, user_id),
            target,
            payload,
        }
    }

    /// Returns the handler.
    pub fn handler(&self) -> HandlerId {
        self.metadata.handler
    }

    /// Returns the endpoint the operation must be posted to.
    pub fn endpoint(&self) -> Endpoint {
        self.metadata.handler.endpoint()
    }

    /// Converts to the wire record, normalizing field values.
    pub fn to_wire(&self) -> WireOperation {
        let mut wire = WireOperation {
            metadata: WireOperationMetadata {
                operation_id: self.metadata.operation_id.clone(),
                handler_id: self.metadata.handler.as_str().to_string(),
                user_id: self.metadata.user_id.clone(),
            },
            list_id: self.target.list_id.clone(),
            list_item_id: self.target.list_item_id.clone(),
            recipe_data_id: self.target.recipe_data_id.clone(),
            recipe_ids: self.target.recipe_ids.clone(),
            calendar_id: self.target.calendar_id.clone(),
            event_id: self.target.event_id.clone(),
            ..Default::default()
        };

        match &self.payload {
            OperationPayload::None => {}
            OperationPayload::Value(value) => wire.updated_value = Some(value.to_wire()),
            OperationPayload::ListItem(item) => wire.list_item = Some(item.clone()),
            OperationPayload::Recipe(recipe) => wire.recipe = Some(recipe.clone()),
            OperationPayload::RecipeCollection(collection) => {
                wire.recipe_collection = Some(collection.clone())
            }
            OperationPayload::CalendarEvent(event) => wire.calendar_event = Some(event.clone()),
        }

        wire
    }
}
