//! In-crate doubles for unit tests.

use crate::config::ClientConfig;
use crate::session::{Session, AUTH_REFRESH_PATH, AUTH_TOKEN_PATH};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportResult};
use crate::graph::USER_DATA_PATH;
use async_trait::async_trait;
use larder_protocol::wire::{
    MealPlanningCalendarResponse, RecipeDataResponse, ShoppingListsResponse, UserDataResponse,
    WireCalendarEvent, WireCalendarLabel, WireList, WireListItem, WireOperationList, WireRecipe,
    WireRecipeCollection,
};
use larder_protocol::{CborCodec, WireCodec};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) const BASE_URL: &str = "http://stub";

/// Serves tokens, one user data payload and every update endpoint.
pub(crate) struct StubServer {
    pub data: Mutex<UserDataResponse>,
    pub batch_status: Mutex<u16>,
    pub batches: Mutex<Vec<(String, WireOperationList)>>,
    pub user_data_calls: AtomicUsize,
}

impl StubServer {
    pub fn new(data: UserDataResponse) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(data),
            batch_status: Mutex::new(200),
            batches: Mutex::new(Vec::new()),
            user_data_calls: AtomicUsize::new(0),
        })
    }

    pub fn reject_batches(&self, status: u16) {
        *self.batch_status.lock() = status;
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn last_batch(&self) -> (String, WireOperationList) {
        self.batches.lock().last().cloned().unwrap()
    }
}

#[async_trait]
impl HttpTransport for StubServer {
    async fn post(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let path = request.url.trim_start_matches(BASE_URL).trim_start_matches('/');
        match path {
            AUTH_TOKEN_PATH | AUTH_REFRESH_PATH => {
                let body = serde_json::json!({
                    "access_token": "access",
                    "refresh_token": "refresh",
                    "user_id": "user-1",
                });
                Ok(HttpResponse::new(200, body.to_string()))
            }
            USER_DATA_PATH => {
                self.user_data_calls.fetch_add(1, Ordering::SeqCst);
                let body = CborCodec.encode_user_data(&self.data.lock()).unwrap();
                Ok(HttpResponse::new(200, body))
            }
            _ => {
                let bytes = request.body.form_binary("operations").unwrap_or_default();
                let operations = CborCodec.decode_operations(bytes).unwrap();
                self.batches.lock().push((path.to_string(), operations));
                Ok(HttpResponse::new(*self.batch_status.lock(), Vec::new()))
            }
        }
    }
}

pub(crate) async fn session(server: &Arc<StubServer>) -> Arc<Session> {
    let config = ClientConfig::new("cook@example.com", "pw").with_base_url(BASE_URL);
    let session = Arc::new(Session::new(Arc::new(config), server.clone()));
    session.establish().await.unwrap();
    session
}

pub(crate) fn sample_data() -> UserDataResponse {
    let milk = WireListItem {
        identifier: "item-1".into(),
        list_id: Some("list-1".into()),
        name: "milk".into(),
        user_id: Some("user-1".into()),
        category_match_id: Some("dairy".into()),
        ..Default::default()
    };
    let eggs = WireListItem {
        identifier: "item-2".into(),
        list_id: Some("list-1".into()),
        name: "eggs".into(),
        checked: true,
        user_id: Some("user-1".into()),
        ..Default::default()
    };

    UserDataResponse {
        user_id: Some("user-1".into()),
        shopping_lists_response: ShoppingListsResponse {
            new_lists: vec![WireList {
                identifier: "list-1".into(),
                name: "Groceries".into(),
                items: vec![milk, eggs],
            }],
        },
        recipe_data_response: RecipeDataResponse {
            recipe_data_id: Some("rd-1".into()),
            recipes: vec![WireRecipe {
                identifier: "recipe-1".into(),
                name: Some("Soup".into()),
                ..Default::default()
            }],
            recipe_collections: vec![WireRecipeCollection {
                identifier: "collection-1".into(),
                name: Some("Weeknight".into()),
                ..Default::default()
            }],
        },
        meal_planning_calendar_response: MealPlanningCalendarResponse {
            calendar_id: Some("cal-1".into()),
            events: vec![WireCalendarEvent {
                identifier: "event-1".into(),
                calendar_id: "cal-1".into(),
                date: "2026-03-14".into(),
                recipe_id: Some("recipe-1".into()),
                label_id: Some("label-1".into()),
                ..Default::default()
            }],
            labels: vec![WireCalendarLabel {
                identifier: "label-1".into(),
                calendar_id: "cal-1".into(),
                name: "Dinner".into(),
                hex_color: "#ff8800".into(),
                ..Default::default()
            }],
        },
        ..Default::default()
    }
}
