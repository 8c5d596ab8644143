//! The decoded account graph.

use crate::entity::{CalendarEvent, CalendarLabel, Item, List, Recipe, RecipeCollection};
use larder_protocol::wire::{UserDataResponse, WireStarterList};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Every collection of an account as of one fetch.
///
/// A snapshot is rebuilt wholesale from each user data response. Between
/// fetches, changes the server accepted are applied through the `apply_*`
/// and `upsert_*` methods so lookups stay coherent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    user_id: Option<String>,
    lists: Vec<List>,
    recent_items: HashMap<String, Vec<Item>>,
    favorite_items: HashMap<String, Vec<Item>>,
    recipe_data_id: Option<String>,
    recipes: Vec<Arc<Recipe>>,
    recipe_collections: Vec<RecipeCollection>,
    calendar_id: Option<String>,
    calendar_events: Vec<CalendarEvent>,
    calendar_labels: Vec<CalendarLabel>,
}

fn starter_items(lists: &[WireStarterList]) -> HashMap<String, Vec<Item>> {
    lists
        .iter()
        .map(|starter| {
            let items = starter.items.iter().map(Item::from_wire).collect();
            (starter.list_id.clone(), items)
        })
        .collect()
}

impl Snapshot {
    /// Builds a snapshot from a decoded user data response.
    ///
    /// Cross references (event to recipe, event to label) are resolved after
    /// every sub-tree is decoded. Events whose date cannot be parsed are
    /// skipped.
    pub fn from_wire(data: &UserDataResponse) -> Self {
        let lists = data
            .shopping_lists_response
            .new_lists
            .iter()
            .map(List::from_wire)
            .collect();

        let recipe_data = &data.recipe_data_response;
        let recipes = recipe_data
            .recipes
            .iter()
            .map(|r| Arc::new(Recipe::from_wire(r)))
            .collect();
        let recipe_collections = recipe_data
            .recipe_collections
            .iter()
            .map(RecipeCollection::from_wire)
            .collect();

        let calendar = &data.meal_planning_calendar_response;
        let calendar_labels = calendar
            .labels
            .iter()
            .map(CalendarLabel::from_wire)
            .collect();
        let calendar_events = calendar
            .events
            .iter()
            .filter_map(|wire| match CalendarEvent::from_wire(wire) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(event_id = %wire.identifier, error = %e, "skipping calendar event");
                    None
                }
            })
            .collect();

        let mut snapshot = Self {
            user_id: data.user_id.clone(),
            lists,
            recent_items: starter_items(&data.starter_lists_response.recent_item_lists),
            favorite_items: starter_items(&data.starter_lists_response.favorite_item_lists),
            recipe_data_id: recipe_data.recipe_data_id.clone(),
            recipes,
            recipe_collections,
            calendar_id: calendar.calendar_id.clone(),
            calendar_events,
            calendar_labels,
        };
        snapshot.resolve_events();
        snapshot
    }

    fn resolve_events(&mut self) {
        let recipes: HashMap<&str, &Arc<Recipe>> = self
            .recipes
            .iter()
            .map(|r| (r.identifier().as_str(), r))
            .collect();
        let labels: HashMap<&str, &CalendarLabel> = self
            .calendar_labels
            .iter()
            .map(|l| (l.identifier().as_str(), l))
            .collect();

        for event in &mut self.calendar_events {
            event.resolve(
                |id| recipes.get(id).map(|r| Arc::clone(r)),
                |id| labels.get(id).map(|l| (*l).clone()),
            );
        }
    }

    /// Returns the account user id, when the server sent one.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns every list.
    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    /// Finds a list by id.
    pub fn list_by_id(&self, list_id: &str) -> Option<&List> {
        self.lists.iter().find(|l| l.identifier() == list_id)
    }

    /// Finds the first list with the given name.
    pub fn list_by_name(&self, name: &str) -> Option<&List> {
        self.lists.iter().find(|l| l.name() == name)
    }

    /// Finds a list by id for applying accepted changes.
    pub fn list_mut(&mut self, list_id: &str) -> Option<&mut List> {
        self.lists.iter_mut().find(|l| l.identifier() == list_id)
    }

    /// Returns the recently added items of a list.
    pub fn recent_items(&self, list_id: &str) -> &[Item] {
        self.recent_items.get(list_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the favorite items of a list.
    pub fn favorite_items(&self, list_id: &str) -> &[Item] {
        self.favorite_items.get(list_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the recipe data container id.
    pub fn recipe_data_id(&self) -> Option<&str> {
        self.recipe_data_id.as_deref()
    }

    /// Returns every recipe.
    pub fn recipes(&self) -> &[Arc<Recipe>] {
        &self.recipes
    }

    /// Finds a recipe by id.
    pub fn recipe_by_id(&self, recipe_id: &str) -> Option<&Arc<Recipe>> {
        self.recipes.iter().find(|r| r.identifier() == recipe_id)
    }

    /// Finds the first recipe with the given name.
    pub fn recipe_by_name(&self, name: &str) -> Option<&Arc<Recipe>> {
        self.recipes.iter().find(|r| r.name() == Some(name))
    }

    /// Returns every recipe collection.
    pub fn recipe_collections(&self) -> &[RecipeCollection] {
        &self.recipe_collections
    }

    /// Finds a recipe collection by id.
    pub fn recipe_collection_by_id(&self, collection_id: &str) -> Option<&RecipeCollection> {
        self.recipe_collections
            .iter()
            .find(|c| c.identifier() == collection_id)
    }

    /// Finds the first recipe collection with the given name.
    pub fn recipe_collection_by_name(&self, name: &str) -> Option<&RecipeCollection> {
        self.recipe_collections
            .iter()
            .find(|c| c.name() == Some(name))
    }

    /// Returns the meal-planning calendar id.
    pub fn calendar_id(&self) -> Option<&str> {
        self.calendar_id.as_deref()
    }

    /// Returns every calendar event.
    pub fn calendar_events(&self) -> &[CalendarEvent] {
        &self.calendar_events
    }

    /// Finds a calendar event by id.
    pub fn calendar_event_by_id(&self, event_id: &str) -> Option<&CalendarEvent> {
        self.calendar_events
            .iter()
            .find(|e| e.identifier() == event_id)
    }

    /// Returns every calendar label.
    pub fn calendar_labels(&self) -> &[CalendarLabel] {
        &self.calendar_labels
    }

    /// Finds a calendar label by id.
    pub fn calendar_label_by_id(&self, label_id: &str) -> Option<&CalendarLabel> {
        self.calendar_labels
            .iter()
            .find(|l| l.identifier() == label_id)
    }

    /// Stores an accepted recipe, replacing any copy with the same id.
    ///
    /// Events referencing the recipe are re-resolved.
    pub fn upsert_recipe(&mut self, recipe: Recipe) {
        let mut recipe = recipe;
        recipe.mark_clean();
        let recipe = Arc::new(recipe);
        match self
            .recipes
            .iter_mut()
            .find(|r| r.identifier() == recipe.identifier())
        {
            Some(slot) => *slot = recipe,
            None => self.recipes.push(recipe),
        }
        self.resolve_events();
    }

    /// Drops a deleted recipe. Returns true if it was present.
    pub fn remove_recipe(&mut self, recipe_id: &str) -> bool {
        let before = self.recipes.len();
        self.recipes.retain(|r| r.identifier() != recipe_id);
        let removed = self.recipes.len() != before;
        if removed {
            self.resolve_events();
        }
        removed
    }

    /// Stores an accepted recipe collection, replacing any copy with the same id.
    pub fn upsert_recipe_collection(&mut self, collection: RecipeCollection) {
        match self
            .recipe_collections
            .iter_mut()
            .find(|c| c.identifier() == collection.identifier())
        {
            Some(slot) => *slot = collection,
            None => self.recipe_collections.push(collection),
        }
    }

    /// Drops a deleted recipe collection. Returns true if it was present.
    pub fn remove_recipe_collection(&mut self, collection_id: &str) -> bool {
        let before = self.recipe_collections.len();
        self.recipe_collections
            .retain(|c| c.identifier() != collection_id);
        self.recipe_collections.len() != before
    }

    /// Stores an accepted calendar event, replacing any copy with the same id.
    pub fn upsert_calendar_event(&mut self, event: CalendarEvent) {
        let mut event = event;
        event.mark_clean();
        match self
            .calendar_events
            .iter_mut()
            .find(|e| e.identifier() == event.identifier())
        {
            Some(slot) => *slot = event,
            None => self.calendar_events.push(event),
        }
        self.resolve_events();
    }

    /// Drops a deleted calendar event. Returns true if it was present.
    pub fn remove_calendar_event(&mut self, event_id: &str) -> bool {
        let before = self.calendar_events.len();
        self.calendar_events.retain(|e| e.identifier() != event_id);
        self.calendar_events.len() != before
    }
}
