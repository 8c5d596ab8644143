//! Turning local edits into operation batches.
//!
//! Every method builds one batch, submits it, and only touches the caller's
//! entity and the cached snapshot after the server accepted the batch. A
//! failed submission leaves both exactly as they were, so the same call can
//! simply be retried.

use crate::error::{ClientError, ClientResult};
use crate::graph::EntityGraph;
use crate::transport::{FormField, RequestBody};
use larder_core::{CalendarEvent, CoreError, Item, List, Recipe, RecipeCollection};
use larder_protocol::{
    Endpoint, HandlerId, Operation, OperationBatch, OperationPayload, OperationTarget,
    ProtocolError, WireCodec,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Submits operations for the entity graph.
pub struct MutationProtocol {
    graph: Arc<EntityGraph>,
    codec: Arc<dyn WireCodec>,
}

impl MutationProtocol {
    /// Creates a protocol submitting through the graph's session.
    pub fn new(graph: Arc<EntityGraph>, codec: Arc<dyn WireCodec>) -> Self {
        Self { graph, codec }
    }

    /// Encodes and posts a batch to its endpoint.
    ///
    /// A non-2xx status becomes [`ClientError::Sync`] naming the handler of
    /// the first operation.
    pub async fn submit(&self, batch: &OperationBatch) -> ClientResult<()> {
        let Some(handler) = batch.iter().next().map(Operation::handler) else {
            return Err(ProtocolError::EmptyBatch.into());
        };
        let bytes = self.codec.encode_operations(batch)?;
        let endpoint = batch.endpoint();

        debug!(%endpoint, %handler, operations = batch.len(), "submitting batch");
        let body = RequestBody::Form(vec![FormField::binary("operations", bytes)]);
        match self
            .graph
            .session()
            .authenticated_request(endpoint.path(), body)
            .await
        {
            Ok(_) => Ok(()),
            Err(ClientError::UnexpectedStatus { status, .. }) => {
                warn!(%handler, status, "batch rejected");
                Err(ClientError::Sync { handler, status })
            }
            Err(e) => Err(e),
        }
    }

    /// Sends one operation per dirty field of an item.
    ///
    /// Returns the number of operations sent; a clean item sends nothing.
    pub async fn save_item(&self, item: &mut Item) -> ClientResult<usize> {
        if !item.is_dirty() {
            return Ok(0);
        }
        let list_id = item
            .list_id()
            .ok_or_else(|| CoreError::invalid_operation("item is not on a list"))?
            .to_string();

        let user_id = self.user_id();
        let mut batch = OperationBatch::new(Endpoint::ShoppingLists);
        for &field in item.dirty_fields() {
            batch.push(Operation::new(
                field.handler(),
                user_id.clone(),
                OperationTarget::list_item(&list_id, item.identifier().as_str()),
                OperationPayload::Value(item.field_value(field)),
            ))?;
        }
        self.submit(&batch).await?;

        item.mark_clean();
        let saved: &Item = item;
        self.graph.apply(|snapshot| {
            if let Some(list) = snapshot.list_mut(&list_id) {
                list.apply_saved(saved);
            }
        });
        Ok(batch.len())
    }

    /// Adds a copy of `item` to `list` and returns the copy.
    ///
    /// The copy is assigned to the list before anything is sent, so an item
    /// that already belongs to a list fails without a request.
    pub async fn add_item(&self, list: &mut List, item: &Item) -> ClientResult<Item> {
        let list_id = list.identifier().as_str().to_string();
        let mut added = item.clone();
        added.assign_list(&list_id)?;
        let user_id = self.user_id();
        if added.user_id().is_none() {
            if let Some(user_id) = &user_id {
                added.assign_user_id(user_id.as_str())?;
            }
        }

        let operation = Operation::new(
            HandlerId::AddShoppingListItem,
            user_id,
            OperationTarget::list_item(&list_id, added.identifier().as_str()),
            OperationPayload::ListItem(added.to_wire()),
        );
        self.submit(&OperationBatch::single(operation)).await?;

        added.mark_clean();
        list.apply_added(added.clone());
        self.graph.apply(|snapshot| {
            if let Some(cached) = snapshot.list_mut(&list_id) {
                cached.apply_added(added.clone());
            }
        });
        Ok(added)
    }

    /// Removes an item from a list.
    pub async fn remove_item(&self, list: &mut List, item_id: &str) -> ClientResult<()> {
        let list_id = list.identifier().as_str().to_string();
        let item = list
            .item_by_id(item_id)
            .ok_or_else(|| ClientError::not_found("item", item_id))?;

        let operation = Operation::new(
            HandlerId::RemoveShoppingListItem,
            self.user_id(),
            OperationTarget::list_item(&list_id, item_id),
            OperationPayload::ListItem(item.to_wire()),
        );
        self.submit(&OperationBatch::single(operation)).await?;

        list.apply_removed(item_id);
        self.graph.apply(|snapshot| {
            if let Some(cached) = snapshot.list_mut(&list_id) {
                cached.apply_removed(item_id);
            }
        });
        Ok(())
    }

    /// Unchecks every item of a list.
    pub async fn uncheck_all(&self, list: &mut List) -> ClientResult<()> {
        let list_id = list.identifier().as_str().to_string();
        let operation = Operation::new(
            HandlerId::UncheckAll,
            self.user_id(),
            OperationTarget::list(&list_id),
            OperationPayload::None,
        );
        self.submit(&OperationBatch::single(operation)).await?;

        list.apply_unchecked_all();
        self.graph.apply(|snapshot| {
            if let Some(cached) = snapshot.list_mut(&list_id) {
                cached.apply_unchecked_all();
            }
        });
        Ok(())
    }

    /// Creates or updates a recipe.
    ///
    /// Always sends, since the same handler creates new recipes.
    pub async fn save_recipe(&self, recipe: &mut Recipe) -> ClientResult<()> {
        let recipe_data_id = self.recipe_data_id().await?;
        let mut outgoing = recipe.clone();
        outgoing.touch();

        self.submit_recipe(HandlerId::SaveRecipe, &recipe_data_id, &outgoing)
            .await?;

        outgoing.mark_clean();
        *recipe = outgoing;
        self.graph
            .apply(|snapshot| snapshot.upsert_recipe(recipe.clone()));
        Ok(())
    }

    /// Deletes a recipe.
    pub async fn delete_recipe(&self, recipe: &Recipe) -> ClientResult<()> {
        let recipe_data_id = self.recipe_data_id().await?;
        self.submit_recipe(HandlerId::RemoveRecipe, &recipe_data_id, recipe)
            .await?;

        self.graph.apply(|snapshot| {
            snapshot.remove_recipe(recipe.identifier().as_str());
        });
        Ok(())
    }

    /// Creates a recipe collection.
    pub async fn create_recipe_collection(&self, collection: &RecipeCollection) -> ClientResult<()> {
        let recipe_data_id = self.recipe_data_id().await?;
        self.submit_collection(
            HandlerId::NewRecipeCollection,
            &recipe_data_id,
            collection,
            Vec::new(),
        )
        .await?;

        self.graph
            .apply(|snapshot| snapshot.upsert_recipe_collection(collection.clone()));
        Ok(())
    }

    /// Deletes a recipe collection.
    pub async fn delete_recipe_collection(&self, collection: &RecipeCollection) -> ClientResult<()> {
        let recipe_data_id = self.recipe_data_id().await?;
        self.submit_collection(
            HandlerId::RemoveRecipeCollection,
            &recipe_data_id,
            collection,
            Vec::new(),
        )
        .await?;

        self.graph.apply(|snapshot| {
            snapshot.remove_recipe_collection(collection.identifier().as_str());
        });
        Ok(())
    }

    /// Adds a recipe to a collection.
    ///
    /// Returns false without a request if the recipe is already a member.
    pub async fn add_recipe_to_collection(
        &self,
        collection: &mut RecipeCollection,
        recipe_id: &str,
    ) -> ClientResult<bool> {
        if collection.contains(recipe_id) {
            return Ok(false);
        }
        let recipe_data_id = self.recipe_data_id().await?;
        let updated = collection.with_recipe(recipe_id);
        self.submit_collection(
            HandlerId::AddRecipesToCollection,
            &recipe_data_id,
            &updated,
            vec![recipe_id.to_string()],
        )
        .await?;

        *collection = updated;
        self.graph
            .apply(|snapshot| snapshot.upsert_recipe_collection(collection.clone()));
        Ok(true)
    }

    /// Removes a recipe from a collection.
    ///
    /// Returns false without a request if the recipe is not a member. The
    /// collection is sent as it is before the removal.
    pub async fn remove_recipe_from_collection(
        &self,
        collection: &mut RecipeCollection,
        recipe_id: &str,
    ) -> ClientResult<bool> {
        if !collection.contains(recipe_id) {
            return Ok(false);
        }
        let recipe_data_id = self.recipe_data_id().await?;
        self.submit_collection(
            HandlerId::RemoveRecipesFromCollection,
            &recipe_data_id,
            collection,
            vec![recipe_id.to_string()],
        )
        .await?;

        *collection = collection.without_recipe(recipe_id);
        self.graph
            .apply(|snapshot| snapshot.upsert_recipe_collection(collection.clone()));
        Ok(true)
    }

    /// Creates a calendar event.
    pub async fn create_calendar_event(&self, event: &mut CalendarEvent) -> ClientResult<()> {
        self.submit_event(HandlerId::NewEvent, event).await?;
        event.mark_clean();
        self.graph
            .apply(|snapshot| snapshot.upsert_calendar_event(event.clone()));
        Ok(())
    }

    /// Saves a modified calendar event. A clean event sends nothing.
    pub async fn save_calendar_event(&self, event: &mut CalendarEvent) -> ClientResult<()> {
        if !event.is_dirty() {
            return Ok(());
        }
        self.submit_event(HandlerId::SaveEvent, event).await?;
        event.mark_clean();
        self.graph
            .apply(|snapshot| snapshot.upsert_calendar_event(event.clone()));
        Ok(())
    }

    /// Deletes a calendar event.
    pub async fn delete_calendar_event(&self, event: &CalendarEvent) -> ClientResult<()> {
        self.submit_event(HandlerId::DeleteEvent, event).await?;
        self.graph.apply(|snapshot| {
            snapshot.remove_calendar_event(event.identifier().as_str());
        });
        Ok(())
    }

    fn user_id(&self) -> Option<String> {
        self.graph.session().user_id()
    }

    async fn recipe_data_id(&self) -> ClientResult<String> {
        let snapshot = self.graph.load_snapshot(false).await?;
        snapshot
            .recipe_data_id()
            .map(str::to_string)
            .ok_or(ClientError::MissingRecipeData)
    }

    async fn submit_recipe(
        &self,
        handler: HandlerId,
        recipe_data_id: &str,
        recipe: &Recipe,
    ) -> ClientResult<()> {
        let target = OperationTarget::recipe_data(recipe_data_id)
            .with_recipe_ids(vec![recipe.identifier().as_str().to_string()]);
        let operation = Operation::new(
            handler,
            self.user_id(),
            target,
            OperationPayload::Recipe(recipe.to_wire()),
        );
        self.submit(&OperationBatch::single(operation)).await
    }

    async fn submit_collection(
        &self,
        handler: HandlerId,
        recipe_data_id: &str,
        collection: &RecipeCollection,
        recipe_ids: Vec<String>,
    ) -> ClientResult<()> {
        let operation = Operation::new(
            handler,
            self.user_id(),
            OperationTarget::recipe_data(recipe_data_id).with_recipe_ids(recipe_ids),
            OperationPayload::RecipeCollection(collection.to_wire()),
        );
        self.submit(&OperationBatch::single(operation)).await
    }

    async fn submit_event(&self, handler: HandlerId, event: &CalendarEvent) -> ClientResult<()> {
        if event.calendar_id().is_empty() {
            return Err(ClientError::MissingCalendar);
        }
        let operation = Operation::new(
            handler,
            self.user_id(),
            OperationTarget::calendar_event(event.calendar_id(), event.identifier().as_str()),
            OperationPayload::CalendarEvent(event.to_wire()),
        );
        self.submit(&OperationBatch::single(operation)).await
    }
}

impl std::fmt::Debug for MutationProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationProtocol")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}
