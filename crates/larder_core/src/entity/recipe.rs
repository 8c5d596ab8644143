//! Recipes and their ingredients.

use super::dirty::DirtyFields;
use super::id::EntityId;
use super::now_timestamp;
use larder_protocol::wire::{WireIngredient, WireRecipe};

/// One ingredient line of a recipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingredient {
    /// Unparsed ingredient line, e.g. `"2 cups flour, sifted"`.
    pub raw_ingredient: Option<String>,
    /// Ingredient name.
    pub name: Option<String>,
    /// Quantity text.
    pub quantity: Option<String>,
    /// Preparation note.
    pub note: Option<String>,
}

impl Ingredient {
    /// Creates an ingredient from a raw line.
    pub fn raw(line: impl Into<String>) -> Self {
        Self {
            raw_ingredient: Some(line.into()),
            ..Default::default()
        }
    }

    /// Builds an ingredient from its wire record.
    pub fn from_wire(wire: &WireIngredient) -> Self {
        Self {
            raw_ingredient: wire.raw_ingredient.clone(),
            name: wire.name.clone(),
            quantity: wire.quantity.clone(),
            note: wire.note.clone(),
        }
    }

    /// Converts to the wire record.
    pub fn to_wire(&self) -> WireIngredient {
        WireIngredient {
            raw_ingredient: self.raw_ingredient.clone(),
            name: self.name.clone(),
            quantity: self.quantity.clone(),
            note: self.note.clone(),
        }
    }
}

/// Recipe fields a caller can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeField {
    /// Display name.
    Name,
    /// Free-form note.
    Note,
    /// Source name.
    SourceName,
    /// Source URL.
    SourceUrl,
    /// Ingredient list.
    Ingredients,
    /// Preparation steps.
    PreparationSteps,
    /// Scale factor.
    ScaleFactor,
    /// Star rating.
    Rating,
    /// Nutrition text.
    NutritionalInfo,
    /// Cook time.
    CookTime,
    /// Prep time.
    PrepTime,
    /// Servings text.
    Servings,
}

/// Initial values for a new recipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDraft {
    /// Display name.
    pub name: String,
    /// Free-form note.
    pub note: Option<String>,
    /// Source name.
    pub source_name: Option<String>,
    /// Source URL.
    pub source_url: Option<String>,
    /// Ingredients in order.
    pub ingredients: Vec<Ingredient>,
    /// Preparation steps in order.
    pub preparation_steps: Vec<String>,
    /// Scale factor.
    pub scale_factor: Option<f64>,
    /// Star rating.
    pub rating: Option<i32>,
    /// Nutrition text.
    pub nutritional_info: Option<String>,
    /// Cook time in seconds.
    pub cook_time: Option<i32>,
    /// Prep time in seconds.
    pub prep_time: Option<i32>,
    /// Servings text.
    pub servings: Option<String>,
}

/// A recipe.
///
/// Recipes are saved whole: any change sends the complete recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    identifier: EntityId,
    timestamp: f64,
    name: Option<String>,
    note: Option<String>,
    source_name: Option<String>,
    source_url: Option<String>,
    ingredients: Vec<Ingredient>,
    preparation_steps: Vec<String>,
    photo_ids: Vec<String>,
    photo_urls: Vec<String>,
    ad_campaign_id: Option<String>,
    scale_factor: Option<f64>,
    rating: Option<i32>,
    creation_timestamp: Option<f64>,
    nutritional_info: Option<String>,
    cook_time: Option<i32>,
    prep_time: Option<i32>,
    servings: Option<String>,
    paprika_identifier: Option<String>,
    dirty: DirtyFields<RecipeField>,
}

impl Recipe {
    /// Creates a new recipe with a fresh identifier.
    pub fn new(draft: RecipeDraft) -> Self {
        let now = now_timestamp();
        Self {
            identifier: EntityId::generate(),
            timestamp: now,
            name: Some(draft.name),
            note: draft.note,
            source_name: draft.source_name,
            source_url: draft.source_url,
            ingredients: draft.ingredients,
            preparation_steps: draft.preparation_steps,
            photo_ids: Vec::new(),
            photo_urls: Vec::new(),
            ad_campaign_id: None,
            scale_factor: draft.scale_factor,
            rating: draft.rating,
            creation_timestamp: Some(now),
            nutritional_info: draft.nutritional_info,
            cook_time: draft.cook_time,
            prep_time: draft.prep_time,
            servings: draft.servings,
            paprika_identifier: None,
            dirty: DirtyFields::new(),
        }
    }

    /// Builds a recipe from its wire record.
    pub fn from_wire(wire: &WireRecipe) -> Self {
        Self {
            identifier: EntityId::from(wire.identifier.as_str()),
            timestamp: wire.timestamp,
            name: wire.name.clone(),
            note: wire.note.clone(),
            source_name: wire.source_name.clone(),
            source_url: wire.source_url.clone(),
            ingredients: wire.ingredients.iter().map(Ingredient::from_wire).collect(),
            preparation_steps: wire.preparation_steps.clone(),
            photo_ids: wire.photo_ids.clone(),
            photo_urls: wire.photo_urls.clone(),
            ad_campaign_id: wire.ad_campaign_id.clone(),
            scale_factor: wire.scale_factor,
            rating: wire.rating,
            creation_timestamp: wire.creation_timestamp,
            nutritional_info: wire.nutritional_info.clone(),
            cook_time: wire.cook_time,
            prep_time: wire.prep_time,
            servings: wire.servings.clone(),
            paprika_identifier: wire.paprika_identifier.clone(),
            dirty: DirtyFields::new(),
        }
    }

    /// Converts to the wire record.
    pub fn to_wire(&self) -> WireRecipe {
        WireRecipe {
            identifier: self.identifier.to_string(),
            timestamp: self.timestamp,
            name: self.name.clone(),
            note: self.note.clone(),
            source_name: self.source_name.clone(),
            source_url: self.source_url.clone(),
            ingredients: self.ingredients.iter().map(Ingredient::to_wire).collect(),
            preparation_steps: self.preparation_steps.clone(),
            photo_ids: self.photo_ids.clone(),
            ad_campaign_id: self.ad_campaign_id.clone(),
            photo_urls: self.photo_urls.clone(),
            scale_factor: self.scale_factor,
            rating: self.rating,
            creation_timestamp: self.creation_timestamp,
            nutritional_info: self.nutritional_info.clone(),
            cook_time: self.cook_time,
            prep_time: self.prep_time,
            servings: self.servings.clone(),
            paprika_identifier: self.paprika_identifier.clone(),
        }
    }

    /// Returns the identifier.
    pub fn identifier(&self) -> &EntityId {
        &self.identifier
    }

    /// Returns the last-modified time in seconds since the Unix epoch.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Returns the display name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the note.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Returns the source name.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Returns the source URL.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Returns the ingredients.
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    /// Returns the preparation steps.
    pub fn preparation_steps(&self) -> &[String] {
        &self.preparation_steps
    }

    /// Returns the photo ids.
    pub fn photo_ids(&self) -> &[String] {
        &self.photo_ids
    }

    /// Returns the photo URLs.
    pub fn photo_urls(&self) -> &[String] {
        &self.photo_urls
    }

    /// Returns the ad campaign id.
    pub fn ad_campaign_id(&self) -> Option<&str> {
        self.ad_campaign_id.as_deref()
    }

    /// Returns the scale factor.
    pub fn scale_factor(&self) -> Option<f64> {
        self.scale_factor
    }

    /// Returns the rating.
    pub fn rating(&self) -> Option<i32> {
        self.rating
    }

    /// Returns the creation time in seconds since the Unix epoch.
    pub fn creation_timestamp(&self) -> Option<f64> {
        self.creation_timestamp
    }

    /// Returns the nutrition text.
    pub fn nutritional_info(&self) -> Option<&str> {
        self.nutritional_info.as_deref()
    }

    /// Returns the cook time in seconds.
    pub fn cook_time(&self) -> Option<i32> {
        self.cook_time
    }

    /// Returns the prep time in seconds.
    pub fn prep_time(&self) -> Option<i32> {
        self.prep_time
    }

    /// Returns the servings text.
    pub fn servings(&self) -> Option<&str> {
        self.servings.as_deref()
    }

    /// Returns the id of the recipe this was imported from.
    pub fn paprika_identifier(&self) -> Option<&str> {
        self.paprika_identifier.as_deref()
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
        self.dirty.mark(RecipeField::Name);
    }

    /// Sets the note.
    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = Some(note.into());
        self.dirty.mark(RecipeField::Note);
    }

    /// Sets the source name.
    pub fn set_source_name(&mut self, source_name: impl Into<String>) {
        self.source_name = Some(source_name.into());
        self.dirty.mark(RecipeField::SourceName);
    }

    /// Sets the source URL.
    pub fn set_source_url(&mut self, source_url: impl Into<String>) {
        self.source_url = Some(source_url.into());
        self.dirty.mark(RecipeField::SourceUrl);
    }

    /// Replaces the ingredients.
    pub fn set_ingredients(&mut self, ingredients: Vec<Ingredient>) {
        self.ingredients = ingredients;
        self.dirty.mark(RecipeField::Ingredients);
    }

    /// Replaces the preparation steps.
    pub fn set_preparation_steps(&mut self, steps: Vec<String>) {
        self.preparation_steps = steps;
        self.dirty.mark(RecipeField::PreparationSteps);
    }

    /// Sets the scale factor.
    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = Some(scale_factor);
        self.dirty.mark(RecipeField::ScaleFactor);
    }

    /// Sets the rating.
    pub fn set_rating(&mut self, rating: i32) {
        self.rating = Some(rating);
        self.dirty.mark(RecipeField::Rating);
    }

    /// Sets the nutrition text.
    pub fn set_nutritional_info(&mut self, info: impl Into<String>) {
        self.nutritional_info = Some(info.into());
        self.dirty.mark(RecipeField::NutritionalInfo);
    }

    /// Sets the cook time in seconds.
    pub fn set_cook_time(&mut self, seconds: i32) {
        self.cook_time = Some(seconds);
        self.dirty.mark(RecipeField::CookTime);
    }

    /// Sets the prep time in seconds.
    pub fn set_prep_time(&mut self, seconds: i32) {
        self.prep_time = Some(seconds);
        self.dirty.mark(RecipeField::PrepTime);
    }

    /// Sets the servings text.
    pub fn set_servings(&mut self, servings: impl Into<String>) {
        self.servings = Some(servings.into());
        self.dirty.mark(RecipeField::Servings);
    }

    /// Returns the locally modified fields.
    pub fn dirty_fields(&self) -> &[RecipeField] {
        self.dirty.fields()
    }

    /// Returns true if the recipe has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Marks every change as saved.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Bumps the last-modified time to now.
    pub fn touch(&mut self) {
        self.timestamp = now_timestamp();
    }
}
