//! Typed entities of the account graph.
//!
//! Every entity keeps a private set of locally modified fields. Setters
//! update the value and record the field; the mutation layer turns those
//! records into operations and clears them once the server accepts.

mod calendar;
mod dirty;
mod id;
mod item;
mod list;
mod recipe;
mod recipe_collection;

pub use calendar::{CalendarEvent, CalendarEventField, CalendarLabel};
pub use dirty::DirtyFields;
pub use id::EntityId;
pub use item::{Item, ItemDraft, ItemField, DEFAULT_CATEGORY_MATCH_ID};
pub use list::List;
pub use recipe::{Ingredient, Recipe, RecipeDraft, RecipeField};
pub use recipe_collection::{CollectionSettings, RecipeCollection};

/// Current time in fractional seconds since the Unix epoch.
pub(crate) fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
