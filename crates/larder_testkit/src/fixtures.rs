//! Test fixtures and client helpers.
//!
//! Provides a sample account and a harness that wires a real `Client` to
//! the in-memory fakes.

use crate::server::{FakeServer, FAKE_BASE_URL, FAKE_SOCKET_URL};
use crate::socket::FakeSocket;
use larder_client::{ChannelState, Client, ClientConfig, RetryConfig};
use larder_protocol::wire::{
    MealPlanningCalendarResponse, RecipeDataResponse, ShoppingListsResponse,
    StarterListsResponse, WireCalendarEvent, WireCalendarLabel, WireIngredient, WireList,
    WireListItem, WireRecipe, WireRecipeCollection, WireStarterList,
};
use larder_protocol::UserDataResponse;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Email of the fixture account.
pub const EMAIL: &str = "cook@example.com";

/// Password of the fixture account.
pub const PASSWORD: &str = "correct horse battery staple";

/// User id of the fixture account.
pub const USER_ID: &str = "user-1";

/// How long helpers wait for asynchronous effects.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

fn item(id: &str, list_id: &str, name: &str) -> WireListItem {
    WireListItem {
        identifier: id.into(),
        list_id: Some(list_id.into()),
        name: name.into(),
        user_id: Some(USER_ID.into()),
        ..Default::default()
    }
}

/// The fixture account's data.
///
/// - `list-1` "Groceries" with milk (`item-1`) and checked eggs (`item-2`),
///   plus one recent and one favorite item
/// - `list-2` "Hardware", empty
/// - recipe data `rd-1`: "Soup" (`recipe-1`), "Salad" (`recipe-2`) and the
///   collection "Weeknight" (`collection-1`) holding the soup
/// - calendar `cal-1`: `event-1` on 2026-03-14 cooking the soup under the
///   "Dinner" label (`label-1`)
pub fn sample_user_data() -> UserDataResponse {
    let milk = WireListItem {
        quantity: Some("1 gallon".into()),
        category_match_id: Some("dairy".into()),
        ..item("item-1", "list-1", "milk")
    };
    let eggs = WireListItem {
        checked: true,
        manual_sort_index: 1,
        ..item("item-2", "list-1", "eggs")
    };

    UserDataResponse {
        user_id: Some(USER_ID.into()),
        shopping_lists_response: ShoppingListsResponse {
            new_lists: vec![
                WireList {
                    identifier: "list-1".into(),
                    name: "Groceries".into(),
                    items: vec![milk, eggs],
                },
                WireList {
                    identifier: "list-2".into(),
                    name: "Hardware".into(),
                    items: Vec::new(),
                },
            ],
        },
        starter_lists_response: StarterListsResponse {
            recent_item_lists: vec![WireStarterList {
                list_id: "list-1".into(),
                items: vec![item("recent-1", "list-1", "bread")],
            }],
            favorite_item_lists: vec![WireStarterList {
                list_id: "list-1".into(),
                items: vec![item("favorite-1", "list-1", "coffee")],
            }],
        },
        recipe_data_response: RecipeDataResponse {
            recipe_data_id: Some("rd-1".into()),
            recipes: vec![
                WireRecipe {
                    identifier: "recipe-1".into(),
                    timestamp: 1_700_000_000.0,
                    name: Some("Soup".into()),
                    ingredients: vec![WireIngredient {
                        raw_ingredient: Some("2 carrots".into()),
                        name: Some("carrots".into()),
                        quantity: Some("2".into()),
                        ..Default::default()
                    }],
                    preparation_steps: vec!["Chop.".into(), "Simmer.".into()],
                    servings: Some("4".into()),
                    ..Default::default()
                },
                WireRecipe {
                    identifier: "recipe-2".into(),
                    timestamp: 1_700_000_100.0,
                    name: Some("Salad".into()),
                    ..Default::default()
                },
            ],
            recipe_collections: vec![WireRecipeCollection {
                identifier: "collection-1".into(),
                timestamp: 1_700_000_000.0,
                name: Some("Weeknight".into()),
                recipe_ids: vec!["recipe-1".into()],
                ..Default::default()
            }],
        },
        meal_planning_calendar_response: MealPlanningCalendarResponse {
            calendar_id: Some("cal-1".into()),
            events: vec![WireCalendarEvent {
                identifier: "event-1".into(),
                calendar_id: "cal-1".into(),
                date: "2026-03-14".into(),
                label_id: Some("label-1".into()),
                recipe_id: Some("recipe-1".into()),
                ..Default::default()
            }],
            labels: vec![WireCalendarLabel {
                identifier: "label-1".into(),
                calendar_id: "cal-1".into(),
                hex_color: "#ff8800".into(),
                name: "Dinner".into(),
                ..Default::default()
            }],
        },
    }
}

/// Reconnect policy with short, deterministic delays.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new(max_attempts)
        .with_initial_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(40))
        .with_jitter(false)
}

/// Client configuration pointing at the fakes.
pub fn client_config() -> ClientConfig {
    ClientConfig::new(EMAIL, PASSWORD)
        .with_base_url(FAKE_BASE_URL)
        .with_socket_url(FAKE_SOCKET_URL)
        .with_heartbeat_interval(Duration::from_millis(50))
        .with_reconnect(fast_retry(3))
}

/// Client configuration that persists credentials under `dir`.
pub fn persistent_config(dir: &Path) -> ClientConfig {
    client_config().with_credentials_file(dir.join("credentials.json"))
}

/// A fake server, a fake socket bound to it, and clients wired to both.
pub struct TestHarness {
    /// The fake service.
    pub server: Arc<FakeServer>,
    /// The fake live socket.
    pub socket: Arc<FakeSocket>,
}

impl TestHarness {
    /// Creates a harness serving [`sample_user_data`].
    pub fn new() -> Self {
        Self::with_server(FakeServer::new(sample_user_data()))
    }

    /// Creates a harness around a configured server.
    pub fn with_server(server: FakeServer) -> Self {
        let server = Arc::new(server);
        let socket = Arc::new(FakeSocket::with_server(Arc::clone(&server)));
        Self { server, socket }
    }

    /// Builds a client using [`client_config`].
    pub fn client(&self) -> Client {
        self.client_with(client_config())
    }

    /// Builds a client with a custom configuration.
    pub fn client_with(&self, config: ClientConfig) -> Client {
        Client::with_cbor(config, self.server.clone(), self.socket.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits until the channel state satisfies `pred`.
///
/// Returns false on timeout or if the state sender went away.
pub async fn wait_for_state<F>(rx: &mut watch::Receiver<ChannelState>, pred: F) -> bool
where
    F: FnMut(&ChannelState) -> bool,
{
    matches!(
        tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(pred)).await,
        Ok(Ok(_))
    )
}
