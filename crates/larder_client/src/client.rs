//! The client facade.

use crate::channel::{ChannelCredentials, ChannelState, LiveChannel, RemoteChangeHandler};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::{Subscription, UpdateEvent, UpdateFeed};
use crate::graph::EntityGraph;
use crate::mutation::MutationProtocol;
use crate::session::Session;
use crate::transport::{HttpTransport, SocketTransport};
use async_trait::async_trait;
use chrono::NaiveDate;
use larder_core::{
    CalendarEvent, CalendarLabel, Item, ItemDraft, List, Recipe, RecipeCollection, RecipeDraft,
    Snapshot,
};
use larder_protocol::{CborCodec, WireCodec};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Refetches the graph when the server signals a change and tells
/// subscribers.
struct GraphRefresher {
    graph: Arc<EntityGraph>,
    feed: Arc<UpdateFeed>,
}

#[async_trait]
impl RemoteChangeHandler for GraphRefresher {
    async fn on_lists_changed(&self) {
        match self.graph.load_snapshot(true).await {
            Ok(snapshot) => {
                let delivered = self.feed.publish(UpdateEvent::ListsUpdated {
                    lists: snapshot.lists().to_vec(),
                });
                debug!(subscribers = delivered, "published list update");
            }
            Err(e) => warn!(error = %e, "refetch after change signal failed"),
        }
    }
}

/// A client for one account.
///
/// Call [`login`](Client::login) first, then read and mutate the graph.
/// Lookups by id or name read the snapshot the last fetch cached and return
/// `None` until something was fetched.
pub struct Client {
    config: Arc<ClientConfig>,
    session: Arc<Session>,
    graph: Arc<EntityGraph>,
    mutations: MutationProtocol,
    socket: Arc<dyn SocketTransport>,
    feed: Arc<UpdateFeed>,
    channel_state: Arc<watch::Sender<ChannelState>>,
    channel: Mutex<Option<LiveChannel>>,
}

impl Client {
    /// Creates a client. No I/O happens until [`login`](Client::login).
    pub fn new(
        config: ClientConfig,
        http: Arc<dyn HttpTransport>,
        socket: Arc<dyn SocketTransport>,
        codec: Arc<dyn WireCodec>,
    ) -> Self {
        let config = Arc::new(config);
        let session = Arc::new(Session::new(Arc::clone(&config), http));
        let graph = Arc::new(EntityGraph::new(Arc::clone(&session), Arc::clone(&codec)));
        let mutations = MutationProtocol::new(Arc::clone(&graph), codec);
        let (channel_state, _) = watch::channel(ChannelState::Disconnected);

        Self {
            config,
            session,
            graph,
            mutations,
            socket,
            feed: Arc::new(UpdateFeed::new()),
            channel_state: Arc::new(channel_state),
            channel: Mutex::new(None),
        }
    }

    /// Creates a client using the CBOR codec.
    pub fn with_cbor(
        config: ClientConfig,
        http: Arc<dyn HttpTransport>,
        socket: Arc<dyn SocketTransport>,
    ) -> Self {
        Self::new(config, http, socket, Arc::new(CborCodec::new()))
    }

    /// Establishes the session and opens the live channel.
    ///
    /// Logging in again keeps a channel that is still running and replaces
    /// one that gave up reconnecting.
    pub async fn login(&self) -> ClientResult<()> {
        self.session.establish().await?;

        let mut channel = self.channel.lock();
        let running = channel.as_ref().is_some_and(|c| !c.is_stopped());
        if !running {
            if channel.take().is_some() {
                info!("previous live channel stopped, reopening");
            }
            info!(email = %self.config.email, "logged in, opening live channel");
            let handler = Arc::new(GraphRefresher {
                graph: Arc::clone(&self.graph),
                feed: Arc::clone(&self.feed),
            });
            let credentials: Arc<dyn ChannelCredentials> = self.session.clone();
            *channel = Some(LiveChannel::spawn(
                self.config.channel_config(),
                Arc::clone(&self.socket),
                credentials,
                handler,
                Arc::clone(&self.channel_state),
            ));
        }
        Ok(())
    }

    /// Stops the keepalive and closes the live channel.
    ///
    /// Safe to call repeatedly and before [`login`](Client::login).
    pub async fn teardown(&self) {
        let channel = self.channel.lock().take();
        if let Some(channel) = channel {
            channel.close().await;
            info!("live channel torn down");
        }
    }

    /// Returns the session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the account snapshot, fetching if needed or asked to.
    pub async fn snapshot(&self, refresh: bool) -> ClientResult<Arc<Snapshot>> {
        self.graph.load_snapshot(refresh).await
    }

    /// Number of user data fetches performed.
    pub fn fetch_count(&self) -> u64 {
        self.graph.fetch_count()
    }

    /// Returns every shopping list.
    pub async fn lists(&self, refresh: bool) -> ClientResult<Vec<List>> {
        Ok(self.snapshot(refresh).await?.lists().to_vec())
    }

    /// Returns every recipe.
    pub async fn recipes(&self, refresh: bool) -> ClientResult<Vec<Arc<Recipe>>> {
        Ok(self.snapshot(refresh).await?.recipes().to_vec())
    }

    /// Returns every recipe collection.
    pub async fn recipe_collections(&self, refresh: bool) -> ClientResult<Vec<RecipeCollection>> {
        Ok(self.snapshot(refresh).await?.recipe_collections().to_vec())
    }

    /// Returns every meal-planning calendar event.
    pub async fn calendar_events(&self, refresh: bool) -> ClientResult<Vec<CalendarEvent>> {
        Ok(self.snapshot(refresh).await?.calendar_events().to_vec())
    }

    /// Returns every meal-planning calendar label.
    pub async fn calendar_labels(&self, refresh: bool) -> ClientResult<Vec<CalendarLabel>> {
        Ok(self.snapshot(refresh).await?.calendar_labels().to_vec())
    }

    /// Looks up a list by id.
    pub fn list_by_id(&self, list_id: &str) -> Option<List> {
        self.graph.cached()?.list_by_id(list_id).cloned()
    }

    /// Looks up a list by name.
    pub fn list_by_name(&self, name: &str) -> Option<List> {
        self.graph.cached()?.list_by_name(name).cloned()
    }

    /// Returns the recently used items of a list.
    pub fn recent_items(&self, list_id: &str) -> Vec<Item> {
        self.graph
            .cached()
            .map(|snapshot| snapshot.recent_items(list_id).to_vec())
            .unwrap_or_default()
    }

    /// Returns the favorite items of a list.
    pub fn favorite_items(&self, list_id: &str) -> Vec<Item> {
        self.graph
            .cached()
            .map(|snapshot| snapshot.favorite_items(list_id).to_vec())
            .unwrap_or_default()
    }

    /// Looks up a recipe by id.
    pub fn recipe_by_id(&self, recipe_id: &str) -> Option<Arc<Recipe>> {
        self.graph.cached()?.recipe_by_id(recipe_id).cloned()
    }

    /// Looks up a recipe by name.
    pub fn recipe_by_name(&self, name: &str) -> Option<Arc<Recipe>> {
        self.graph.cached()?.recipe_by_name(name).cloned()
    }

    /// Looks up a recipe collection by id.
    pub fn recipe_collection_by_id(&self, collection_id: &str) -> Option<RecipeCollection> {
        self.graph
            .cached()?
            .recipe_collection_by_id(collection_id)
            .cloned()
    }

    /// Looks up a recipe collection by name.
    pub fn recipe_collection_by_name(&self, name: &str) -> Option<RecipeCollection> {
        self.graph.cached()?.recipe_collection_by_name(name).cloned()
    }

    /// Looks up a calendar event by id.
    pub fn calendar_event_by_id(&self, event_id: &str) -> Option<CalendarEvent> {
        self.graph.cached()?.calendar_event_by_id(event_id).cloned()
    }

    /// Looks up a calendar label by id.
    pub fn calendar_label_by_id(&self, label_id: &str) -> Option<CalendarLabel> {
        self.graph.cached()?.calendar_label_by_id(label_id).cloned()
    }

    /// Creates a new item owned by no list.
    pub fn create_item(&self, draft: ItemDraft) -> Item {
        Item::new(draft)
    }

    /// Creates a new recipe. Fails if the account has no recipe data.
    pub async fn create_recipe(&self, draft: RecipeDraft) -> ClientResult<Recipe> {
        let snapshot = self.snapshot(false).await?;
        if snapshot.recipe_data_id().is_none() {
            return Err(ClientError::MissingRecipeData);
        }
        Ok(Recipe::new(draft))
    }

    /// Creates a new, empty recipe collection.
    pub fn create_recipe_collection(&self, name: impl Into<String>) -> RecipeCollection {
        RecipeCollection::new(name)
    }

    /// Creates a new event on the account's calendar.
    pub async fn create_calendar_event(&self, date: NaiveDate) -> ClientResult<CalendarEvent> {
        let snapshot = self.snapshot(false).await?;
        let calendar_id = snapshot
            .calendar_id()
            .ok_or(ClientError::MissingCalendar)?;
        Ok(CalendarEvent::new(calendar_id, date))
    }

    /// Saves an item's modified fields. Returns the number of operations sent.
    pub async fn save_item(&self, item: &mut Item) -> ClientResult<usize> {
        self.mutations.save_item(item).await
    }

    /// Adds a copy of `item` to `list` and returns it.
    pub async fn add_item(&self, list: &mut List, item: &Item) -> ClientResult<Item> {
        self.mutations.add_item(list, item).await
    }

    /// Removes an item from a list.
    pub async fn remove_item(&self, list: &mut List, item_id: &str) -> ClientResult<()> {
        self.mutations.remove_item(list, item_id).await
    }

    /// Unchecks every item of a list.
    pub async fn uncheck_all(&self, list: &mut List) -> ClientResult<()> {
        self.mutations.uncheck_all(list).await
    }

    /// Creates or updates a recipe.
    pub async fn save_recipe(&self, recipe: &mut Recipe) -> ClientResult<()> {
        self.mutations.save_recipe(recipe).await
    }

    /// Deletes a recipe.
    pub async fn delete_recipe(&self, recipe: &Recipe) -> ClientResult<()> {
        self.mutations.delete_recipe(recipe).await
    }

    /// Saves a new recipe collection.
    pub async fn save_recipe_collection(&self, collection: &RecipeCollection) -> ClientResult<()> {
        self.mutations.create_recipe_collection(collection).await
    }

    /// Deletes a recipe collection.
    pub async fn delete_recipe_collection(&self, collection: &RecipeCollection) -> ClientResult<()> {
        self.mutations.delete_recipe_collection(collection).await
    }

    /// Adds a recipe to a collection. Returns false if it already was a member.
    pub async fn add_recipe_to_collection(
        &self,
        collection: &mut RecipeCollection,
        recipe_id: &str,
    ) -> ClientResult<bool> {
        self.mutations
            .add_recipe_to_collection(collection, recipe_id)
            .await
    }

    /// Removes a recipe from a collection. Returns false if it was not a member.
    pub async fn remove_recipe_from_collection(
        &self,
        collection: &mut RecipeCollection,
        recipe_id: &str,
    ) -> ClientResult<bool> {
        self.mutations
            .remove_recipe_from_collection(collection, recipe_id)
            .await
    }

    /// Saves a new calendar event.
    pub async fn add_calendar_event(&self, event: &mut CalendarEvent) -> ClientResult<()> {
        self.mutations.create_calendar_event(event).await
    }

    /// Saves a modified calendar event.
    pub async fn save_calendar_event(&self, event: &mut CalendarEvent) -> ClientResult<()> {
        self.mutations.save_calendar_event(event).await
    }

    /// Deletes a calendar event.
    pub async fn delete_calendar_event(&self, event: &CalendarEvent) -> ClientResult<()> {
        self.mutations.delete_calendar_event(event).await
    }

    /// Subscribes to updates pushed through the live channel.
    pub fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }

    /// Returns the live channel state.
    pub fn channel_state(&self) -> ChannelState {
        *self.channel_state.borrow()
    }

    /// Returns a receiver observing live channel state changes.
    pub fn watch_channel_state(&self) -> watch::Receiver<ChannelState> {
        self.channel_state.subscribe()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("channel_state", &self.channel_state())
            .finish_non_exhaustive()
    }
}
