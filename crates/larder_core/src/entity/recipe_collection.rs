//! Recipe collections.

use super::id::EntityId;
use super::now_timestamp;
use larder_protocol::wire::{WireCollectionSettings, WireRecipeCollection};

/// Display settings of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSettings {
    /// Sort order code.
    pub recipes_sort_order: Option<i32>,
    /// Whether to hide recipes with missing ingredients.
    pub show_only_recipes_with_all_ingredients: Option<bool>,
}

/// A named set of recipes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeCollection {
    identifier: EntityId,
    timestamp: f64,
    name: Option<String>,
    recipe_ids: Vec<String>,
    settings: CollectionSettings,
}

impl RecipeCollection {
    /// Creates an empty collection with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identifier: EntityId::generate(),
            timestamp: now_timestamp(),
            name: Some(name.into()),
            recipe_ids: Vec::new(),
            settings: CollectionSettings::default(),
        }
    }

    /// Builds a collection from its wire record.
    pub fn from_wire(wire: &WireRecipeCollection) -> Self {
        Self {
            identifier: EntityId::from(wire.identifier.as_str()),
            timestamp: wire.timestamp,
            name: wire.name.clone(),
            recipe_ids: wire.recipe_ids.clone(),
            settings: CollectionSettings {
                recipes_sort_order: wire.collection_settings.recipes_sort_order,
                show_only_recipes_with_all_ingredients: wire
                    .collection_settings
                    .show_only_recipes_with_all_ingredients,
            },
        }
    }

    /// Converts to the wire record.
    pub fn to_wire(&self) -> WireRecipeCollection {
        WireRecipeCollection {
            identifier: self.identifier.to_string(),
            timestamp: self.timestamp,
            name: self.name.clone(),
            recipe_ids: self.recipe_ids.clone(),
            collection_settings: WireCollectionSettings {
                recipes_sort_order: self.settings.recipes_sort_order,
                show_only_recipes_with_all_ingredients: self
                    .settings
                    .show_only_recipes_with_all_ingredients,
            },
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

    /// Returns the member recipe ids.
    pub fn recipe_ids(&self) -> &[String] {
        &self.recipe_ids
    }

    /// Returns the display settings.
    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    /// Returns true if the recipe is a member.
    pub fn contains(&self, recipe_id: &str) -> bool {
        self.recipe_ids.iter().any(|id| id == recipe_id)
    }

    /// Returns a copy with the recipe appended.
    pub fn with_recipe(&self, recipe_id: &str) -> Self {
        let mut next = self.clone();
        if !next.contains(recipe_id) {
            next.recipe_ids.push(recipe_id.to_string());
        }
        next
    }

    /// Returns a copy without the recipe.
    pub fn without_recipe(&self, recipe_id: &str) -> Self {
        let mut next = self.clone();
        next.recipe_ids.retain(|id| id != recipe_id);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_copies_leave_original_untouched() {
        let collection = RecipeCollection::new("Weeknight");
        let added = collection.with_recipe("r1");

        assert!(!collection.contains("r1"));
        assert!(added.contains("r1"));
        assert_eq!(added.with_recipe("r1").recipe_ids().len(), 1);

        let removed = added.without_recipe("r1");
        assert!(removed.recipe_ids().is_empty());
        assert_eq!(removed.identifier(), collection.identifier());
    }

    #[test]
    fn wire_conversion() {
        let wire = WireRecipeCollection {
            identifier: "c1".into(),
            timestamp: 12.0,
            name: Some("Soups".into()),
            recipe_ids: vec!["r1".into(), "r2".into()],
            collection_settings: WireCollectionSettings {
                recipes_sort_order: Some(2),
                show_only_recipes_with_all_ingredients: Some(false),
            },
        };

        let collection = RecipeCollection::from_wire(&wire);
        assert_eq!(collection.settings().recipes_sort_order, Some(2));
        assert_eq!(collection.to_wire(), wire);
    }
}
