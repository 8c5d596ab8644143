//! # Larder Core
//!
//! The typed account graph and the identity codec.
//!
//! This crate provides:
//! - Entities (lists, items, recipes, recipe collections, calendar events and
//!   labels) with per-field dirty tracking
//! - `Snapshot`, the account graph decoded from one user data response
//! - The identity codec that seals credential records with a password
//!
//! No I/O happens here; fetching and submitting live in `larder_client`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
mod entity;
mod error;
mod snapshot;

pub use entity::{
    CalendarEvent, CalendarEventField, CalendarLabel, CollectionSettings, DirtyFields, EntityId,
    Ingredient, Item, ItemDraft, ItemField, List, Recipe, RecipeCollection, RecipeDraft,
    RecipeField, DEFAULT_CATEGORY_MATCH_ID,
};
pub use error::{CoreError, CoreResult};
pub use snapshot::Snapshot;
