//! Meal-planning calendar events and labels.

use super::dirty::DirtyFields;
use super::id::EntityId;
use super::recipe::Recipe;
use crate::error::{CoreError, CoreResult};
use chrono::NaiveDate;
use larder_protocol::wire::{WireCalendarEvent, WireCalendarLabel};
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar label. Labels are read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarLabel {
    identifier: EntityId,
    calendar_id: String,
    hex_color: String,
    logical_timestamp: i64,
    name: String,
    sort_index: i64,
}

impl CalendarLabel {
    /// Builds a label from its wire record.
    pub fn from_wire(wire: &WireCalendarLabel) -> Self {
        Self {
            identifier: EntityId::from(wire.identifier.as_str()),
            calendar_id: wire.calendar_id.clone(),
            hex_color: wire.hex_color.clone(),
            logical_timestamp: wire.logical_timestamp,
            name: wire.name.clone(),
            sort_index: wire.sort_index,
        }
    }

    /// Returns the identifier.
    pub fn identifier(&self) -> &EntityId {
        &self.identifier
    }

    /// Returns the owning calendar.
    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Returns the display color.
    pub fn hex_color(&self) -> &str {
        &self.hex_color
    }

    /// Returns the server logical clock.
    pub fn logical_timestamp(&self) -> i64 {
        self.logical_timestamp
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the sort position.
    pub fn sort_index(&self) -> i64 {
        self.sort_index
    }
}

/// Event fields a caller can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarEventField {
    /// Day of the event.
    Date,
    /// Details text.
    Details,
    /// Label reference.
    LabelId,
    /// Recipe reference.
    RecipeId,
    /// Recipe scale.
    RecipeScaleFactor,
    /// Title.
    Title,
    /// Ordering within the day.
    OrderAddedSortIndex,
}

/// A meal-planning calendar event.
///
/// The recipe and label are lookup relations stored by id. The resolved
/// values are filled in when the event is part of a snapshot and stay `None`
/// when the referenced entity does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    identifier: EntityId,
    calendar_id: String,
    date: NaiveDate,
    details: Option<String>,
    label_id: Option<String>,
    logical_timestamp: i64,
    order_added_sort_index: i64,
    recipe_id: Option<String>,
    recipe_scale_factor: Option<f64>,
    title: Option<String>,
    recipe: Option<Arc<Recipe>>,
    label: Option<CalendarLabel>,
    dirty: DirtyFields<CalendarEventField>,
}

impl CalendarEvent {
    /// Creates an event on a day with a fresh identifier.
    pub fn new(calendar_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            identifier: EntityId::generate(),
            calendar_id: calendar_id.into(),
            date,
            details: None,
            label_id: None,
            logical_timestamp: 0,
            order_added_sort_index: 0,
            recipe_id: None,
            recipe_scale_factor: None,
            title: None,
            recipe: None,
            label: None,
            dirty: DirtyFields::new(),
        }
    }

    /// Builds an event from its wire record.
    ///
    /// References are left unresolved.
    pub fn from_wire(wire: &WireCalendarEvent) -> CoreResult<Self> {
        let date = NaiveDate::parse_from_str(&wire.date, DATE_FORMAT).map_err(|e| {
            CoreError::invalid_format(format!("event {} date {:?}: {e}", wire.identifier, wire.date))
        })?;

        Ok(Self {
            identifier: EntityId::from(wire.identifier.as_str()),
            calendar_id: wire.calendar_id.clone(),
            date,
            details: wire.details.clone(),
            label_id: wire.label_id.clone(),
            logical_timestamp: wire.logical_timestamp,
            order_added_sort_index: wire.order_added_sort_index,
            recipe_id: wire.recipe_id.clone(),
            recipe_scale_factor: wire.recipe_scale_factor,
            title: wire.title.clone(),
            recipe: None,
            label: None,
            dirty: DirtyFields::new(),
        })
    }

    /// Converts to the wire record.
    pub fn to_wire(&self) -> WireCalendarEvent {
        WireCalendarEvent {
            identifier: self.identifier.to_string(),
            calendar_id: self.calendar_id.clone(),
            date: self.date.format(DATE_FORMAT).to_string(),
            details: self.details.clone(),
            label_id: self.label_id.clone(),
            logical_timestamp: self.logical_timestamp,
            order_added_sort_index: self.order_added_sort_index,
            recipe_id: self.recipe_id.clone(),
            recipe_scale_factor: self.recipe_scale_factor,
            title: self.title.clone(),
        }
    }

    /// Fills in the referenced recipe and label.
    pub(crate) fn resolve<R, L>(&mut self, find_recipe: R, find_label: L)
    where
        R: Fn(&str) -> Option<Arc<Recipe>>,
        L: Fn(&str) -> Option<CalendarLabel>,
    {
        self.recipe = self.recipe_id.as_deref().and_then(&find_recipe);
        self.label = self.label_id.as_deref().and_then(&find_label);
    }

    /// Returns the identifier.
    pub fn identifier(&self) -> &EntityId {
        &self.identifier
    }

    /// Returns the owning calendar.
    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Returns the day of the event.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the details text.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns the label reference.
    pub fn label_id(&self) -> Option<&str> {
        self.label_id.as_deref()
    }

    /// Returns the server logical clock.
    pub fn logical_timestamp(&self) -> i64 {
        self.logical_timestamp
    }

    /// Returns the ordering within the day.
    pub fn order_added_sort_index(&self) -> i64 {
        self.order_added_sort_index
    }

    /// Returns the recipe reference.
    pub fn recipe_id(&self) -> Option<&str> {
        self.recipe_id.as_deref()
    }

    /// Returns the recipe scale factor.
    pub fn recipe_scale_factor(&self) -> Option<f64> {
        self.recipe_scale_factor
    }

    /// Returns the title.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the resolved recipe.
    pub fn recipe(&self) -> Option<&Arc<Recipe>> {
        self.recipe.as_ref()
    }

    /// Returns the resolved label.
    pub fn label(&self) -> Option<&CalendarLabel> {
        self.label.as_ref()
    }

    /// Moves the event to another day.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.dirty.mark(CalendarEventField::Date);
    }

    /// Sets the details text.
    pub fn set_details(&mut self, details: impl Into<String>) {
        self.details = Some(details.into());
        self.dirty.mark(CalendarEventField::Details);
    }

    /// Sets the title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
        self.dirty.mark(CalendarEventField::Title);
    }

    /// Points the event at a recipe, or clears the reference.
    pub fn set_recipe(&mut self, recipe: Option<&Arc<Recipe>>) {
        self.recipe_id = recipe.map(|r| r.identifier().to_string());
        self.recipe = recipe.cloned();
        self.dirty.mark(CalendarEventField::RecipeId);
    }

    /// Applies a label, or clears it.
    pub fn set_label(&mut self, label: Option<&CalendarLabel>) {
        self.label_id = label.map(|l| l.identifier().to_string());
        self.label = label.cloned();
        self.dirty.mark(CalendarEventField::LabelId);
    }

    /// Sets the recipe scale factor.
    pub fn set_recipe_scale_factor(&mut self, scale: f64) {
        self.recipe_scale_factor = Some(scale);
        self.dirty.mark(CalendarEventField::RecipeScaleFactor);
    }

    /// Sets the ordering within the day.
    pub fn set_order_added_sort_index(&mut self, index: i64) {
        self.order_added_sort_index = index;
        self.dirty.mark(CalendarEventField::OrderAddedSortIndex);
    }

    /// Returns the locally modified fields.
    pub fn dirty_fields(&self) -> &[CalendarEventField] {
        self.dirty.fields()
    }

    /// Returns true if the event has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Marks every change as saved.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::recipe::RecipeDraft;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn date_roundtrips_through_wire() {
        let event = CalendarEvent::new("cal", day(9));
        let wire = event.to_wire();
        assert_eq!(wire.date, "2024-03-09");
        assert_eq!(CalendarEvent::from_wire(&wire).unwrap().date(), day(9));
    }

    #[test]
    fn bad_date_is_rejected() {
        let wire = WireCalendarEvent {
            identifier: "e1".into(),
            date: "next tuesday".into(),
            ..Default::default()
        };
        assert!(matches!(
            CalendarEvent::from_wire(&wire),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn setting_a_recipe_resolves_it() {
        let recipe = Arc::new(Recipe::new(RecipeDraft {
            name: "Tacos".into(),
            ..Default::default()
        }));
        let mut event = CalendarEvent::new("cal", day(1));
        event.set_recipe(Some(&recipe));
        event.set_title("Taco night");

        assert_eq!(event.recipe_id(), Some(recipe.identifier().as_str()));
        assert_eq!(event.recipe().unwrap().name(), Some("Tacos"));
        assert_eq!(
            event.dirty_fields(),
            &[CalendarEventField::RecipeId, CalendarEventField::Title]
        );

        event.set_recipe(None);
        assert!(event.recipe().is_none());
        assert!(event.recipe_id().is_none());
    }

    #[test]
    fn unresolvable_references_stay_none() {
        let wire = WireCalendarEvent {
            identifier: "e1".into(),
            date: "2024-03-01".into(),
            recipe_id: Some("gone".into()),
            label_id: Some("gone".into()),
            ..Default::default()
        };
        let mut event = CalendarEvent::from_wire(&wire).unwrap();
        event.resolve(|_| None, |_| None);

        assert!(event.recipe().is_none());
        assert!(event.label().is_none());
        assert_eq!(event.recipe_id(), Some("gone"));
    }
}
