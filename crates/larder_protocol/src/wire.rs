//! Wire records exchanged with the service.
//!
//! These mirror the server's payload shapes. Every record uses camelCase
//! field names and tolerates missing fields, since the service omits
//! defaults. No validation happens here; typed entities are built from these
//! records in `larder_core`.

use serde::{Deserialize, Serialize};

/// A shopping list item as sent on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireListItem {
    /// Item identifier.
    pub identifier: String,
    /// Owning list.
    pub list_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-form quantity.
    pub quantity: Option<String>,
    /// Free-form details.
    pub details: Option<String>,
    /// Whether the item is crossed off.
    pub checked: bool,
    /// Legacy category label.
    pub category: Option<String>,
    /// User who created the item.
    pub user_id: Option<String>,
    /// Category grouping identifier.
    pub category_match_id: Option<String>,
    /// Manual ordering within the list.
    pub manual_sort_index: i64,
}

/// A shopping list with its items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireList {
    /// List identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Items in server order.
    pub items: Vec<WireListItem>,
}

/// A starter list (recent or favorite items) attached to a shopping list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireStarterList {
    /// Shopping list the starter list belongs to.
    pub list_id: String,
    /// Starter items.
    pub items: Vec<WireListItem>,
}

/// A recipe ingredient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireIngredient {
    /// Unparsed ingredient line.
    pub raw_ingredient: Option<String>,
    /// Ingredient name.
    pub name: Option<String>,
    /// Quantity text.
    pub quantity: Option<String>,
    /// Preparation note.
    pub note: Option<String>,
}

/// A recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireRecipe {
    pub identifier: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub name: Option<String>,
    pub note: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub ingredients: Vec<WireIngredient>,
    pub preparation_steps: Vec<String>,
    pub photo_ids: Vec<String>,
    pub ad_campaign_id: Option<String>,
    pub photo_urls: Vec<String>,
    pub scale_factor: Option<f64>,
    pub rating: Option<i32>,
    pub creation_timestamp: Option<f64>,
    pub nutritional_info: Option<String>,
    /// Seconds.
    pub cook_time: Option<i32>,
    /// Seconds.
    pub prep_time: Option<i32>,
    pub servings: Option<String>,
    pub paprika_identifier: Option<String>,
}

/// Display settings of a recipe collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCollectionSettings {
    /// Sort order code.
    pub recipes_sort_order: Option<i32>,
    /// Whether to hide recipes with missing ingredients.
    pub show_only_recipes_with_all_ingredients: Option<bool>,
}

/// A named collection of recipe ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireRecipeCollection {
    /// Collection identifier.
    pub identifier: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Display name.
    pub name: Option<String>,
    /// Member recipes.
    pub recipe_ids: Vec<String>,
    /// Display settings.
    pub collection_settings: WireCollectionSettings,
}

/// A meal-planning calendar event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCalendarEvent {
    /// Event identifier.
    pub identifier: String,
    /// Owning calendar.
    pub calendar_id: String,
    /// ISO-8601 date (`YYYY-MM-DD`).
    pub date: String,
    /// Free-form details.
    pub details: Option<String>,
    /// Label reference.
    pub label_id: Option<String>,
    /// Server-assigned logical clock.
    pub logical_timestamp: i64,
    /// Ordering among events of the same day.
    pub order_added_sort_index: i64,
    /// Recipe reference.
    pub recipe_id: Option<String>,
    /// Scale applied to the referenced recipe.
    pub recipe_scale_factor: Option<f64>,
    /// Title for events without a recipe.
    pub title: Option<String>,
}

/// A meal-planning calendar label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCalendarLabel {
    /// Label identifier.
    pub identifier: String,
    /// Owning calendar.
    pub calendar_id: String,
    /// Display color, e.g. `#5ac8fa`.
    pub hex_color: String,
    /// Server-assigned logical clock.
    pub logical_timestamp: i64,
    /// Display name.
    pub name: String,
    /// Ordering among labels.
    pub sort_index: i64,
}

/// Shopping list sub-tree of the user data response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShoppingListsResponse {
    /// All lists on the account.
    pub new_lists: Vec<WireList>,
}

/// Starter list sub-tree of the user data response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StarterListsResponse {
    /// Recently added items per list.
    pub recent_item_lists: Vec<WireStarterList>,
    /// Favorite items per list.
    pub favorite_item_lists: Vec<WireStarterList>,
}

/// Recipe sub-tree of the user data response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeDataResponse {
    /// Container id required by recipe operations.
    pub recipe_data_id: Option<String>,
    /// All recipes.
    pub recipes: Vec<WireRecipe>,
    /// All recipe collections.
    pub recipe_collections: Vec<WireRecipeCollection>,
}

/// Meal-planning calendar sub-tree of the user data response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MealPlanningCalendarResponse {
    /// Calendar identifier.
    pub calendar_id: Option<String>,
    /// Calendar events.
    pub events: Vec<WireCalendarEvent>,
    /// Event labels.
    pub labels: Vec<WireCalendarLabel>,
}

/// The bulk "user data" response: every collection of the account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDataResponse {
    /// Account user id, when the server includes it.
    pub user_id: Option<String>,
    /// Shopping lists.
    pub shopping_lists_response: ShoppingListsResponse,
    /// Recent and favorite items.
    pub starter_lists_response: StarterListsResponse,
    /// Recipes and collections.
    pub recipe_data_response: RecipeDataResponse,
    /// Calendar events and labels.
    pub meal_planning_calendar_response: MealPlanningCalendarResponse,
}

/// Metadata block of an encoded operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireOperationMetadata {
    /// Fresh id per operation.
    pub operation_id: String,
    /// Handler name, e.g. `set-list-item-name`.
    pub handler_id: String,
    /// Acting user.
    pub user_id: Option<String>,
}

/// One encoded operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireOperation {
    pub metadata: WireOperationMetadata,
    pub list_id: Option<String>,
    pub list_item_id: Option<String>,
    pub recipe_data_id: Option<String>,
    pub recipe_ids: Vec<String>,
    pub calendar_id: Option<String>,
    pub event_id: Option<String>,
    /// Field value normalized to its wire string.
    pub updated_value: Option<String>,
    pub list_item: Option<WireListItem>,
    pub recipe: Option<WireRecipe>,
    pub recipe_collection: Option<WireRecipeCollection>,
    pub calendar_event: Option<WireCalendarEvent>,
}

/// An ordered list of encoded operations, posted as one form field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireOperationList {
    /// Operations in application order.
    pub operations: Vec<WireOperation>,
}
