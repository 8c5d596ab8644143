//! In-memory fake of the list and recipe service.
//!
//! `FakeServer` implements [`HttpTransport`], so a real `Client` can run
//! against it. It issues signed tokens, rotates refresh tokens on use,
//! serves the user data snapshot and applies submitted operations to it.
//!
//! Knobs for exercising failure paths:
//! - [`expire_access_tokens`](FakeServer::expire_access_tokens)
//! - [`revoke_refresh_tokens`](FakeServer::revoke_refresh_tokens)
//! - [`reject_batches`](FakeServer::reject_batches)
//! - [`with_latency`](FakeServer::with_latency)

use crate::auth::{TokenClaims, TokenIssuer, TokenKind};
use crate::error::{ServerError, ServerResult};
use crate::fixtures::{EMAIL, PASSWORD, USER_ID};
use async_trait::async_trait;
use larder_client::{
    HttpRequest, HttpResponse, HttpTransport, TransportResult, AUTH_REFRESH_PATH,
    AUTH_TOKEN_PATH, CLIENT_ID_HEADER, USER_DATA_PATH,
};
use larder_protocol::wire::{WireList, WireListItem};
use larder_protocol::{CborCodec, Endpoint, HandlerId, UserDataResponse, WireCodec, WireOperation};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Base URL clients should be configured with.
pub const FAKE_BASE_URL: &str = "http://larder.test/";

/// Socket URL clients should be configured with.
pub const FAKE_SOCKET_URL: &str = "ws://larder.test/data/add-user-listener";

/// A submitted batch as the server saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    /// Endpoint path the batch was posted to.
    pub path: String,
    /// Decoded operations in submission order.
    pub operations: Vec<WireOperation>,
    /// Whether the server applied the batch.
    pub accepted: bool,
}

impl RecordedBatch {
    /// Handler names in submission order.
    pub fn handlers(&self) -> Vec<&str> {
        self.operations
            .iter()
            .map(|op| op.metadata.handler_id.as_str())
            .collect()
    }
}

struct ServerState {
    data: UserDataResponse,
    refresh_tokens: HashSet<String>,
    access_floor: u64,
    batch_status: Option<u16>,
    batches: Vec<RecordedBatch>,
    client_ids: Vec<String>,
}

/// In-memory service double.
pub struct FakeServer {
    email: String,
    password: String,
    user_id: String,
    issuer: TokenIssuer,
    codec: CborCodec,
    latency: Duration,
    state: Mutex<ServerState>,
    token_fetches: AtomicUsize,
    refreshes: AtomicUsize,
    user_data_fetches: AtomicUsize,
}

impl FakeServer {
    /// Creates a server holding `data` for the fixture account.
    pub fn new(data: UserDataResponse) -> Self {
        Self {
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
            user_id: USER_ID.to_string(),
            issuer: TokenIssuer::new(b"larder-fake-server-secret".to_vec()),
            codec: CborCodec::new(),
            latency: Duration::ZERO,
            state: Mutex::new(ServerState {
                data,
                refresh_tokens: HashSet::new(),
                access_floor: 0,
                batch_status: None,
                batches: Vec::new(),
                client_ids: Vec::new(),
            }),
            token_fetches: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            user_data_fetches: AtomicUsize::new(0),
        }
    }

    /// Replaces the account credentials.
    pub fn with_account(
        mut self,
        email: impl Into<String>,
        password: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        self.email = email.into();
        self.password = password.into();
        self.user_id = user_id.into();
        self
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replaces the token issuer.
    pub fn with_issuer(mut self, issuer: TokenIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    /// Invalidates every access token issued so far.
    pub fn expire_access_tokens(&self) {
        self.state.lock().access_floor = self.issuer.next_serial();
    }

    /// Invalidates every outstanding refresh token.
    pub fn revoke_refresh_tokens(&self) {
        self.state.lock().refresh_tokens.clear();
    }

    /// Rejects all following batches with `status`, or accepts them again
    /// with `None`.
    pub fn reject_batches(&self, status: Option<u16>) {
        self.state.lock().batch_status = status;
    }

    /// Number of credential fetches served.
    pub fn token_fetch_count(&self) -> usize {
        self.token_fetches.load(Ordering::SeqCst)
    }

    /// Number of successful refreshes served.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Number of user data fetches served.
    pub fn user_data_count(&self) -> usize {
        self.user_data_fetches.load(Ordering::SeqCst)
    }

    /// Every batch received, accepted or not.
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.state.lock().batches.clone()
    }

    /// The most recent batch.
    pub fn last_batch(&self) -> Option<RecordedBatch> {
        self.state.lock().batches.last().cloned()
    }

    /// Distinct client identifiers seen on data requests, in first-seen order.
    pub fn client_ids(&self) -> Vec<String> {
        self.state.lock().client_ids.clone()
    }

    /// Returns a copy of the server's user data.
    pub fn data(&self) -> UserDataResponse {
        self.state.lock().data.clone()
    }

    /// Changes the server's user data, as another client would.
    pub fn update_data<F>(&self, f: F)
    where
        F: FnOnce(&mut UserDataResponse),
    {
        f(&mut self.state.lock().data);
    }

    /// Validates a bearer access token.
    pub fn validate_access_token(&self, token: &str) -> ServerResult<TokenClaims> {
        let claims = self.issuer.validate(token, TokenKind::Access)?;
        if claims.serial < self.state.lock().access_floor {
            return Err(ServerError::NotAuthorized("token expired".into()));
        }
        Ok(claims)
    }

    fn handle(&self, request: &HttpRequest) -> ServerResult<HttpResponse> {
        let path = route(&request.url)?;
        match path {
            AUTH_TOKEN_PATH => self.handle_token_fetch(request),
            AUTH_REFRESH_PATH => self.handle_refresh(request),
            _ => {
                self.authorize(request)?;
                if path == USER_DATA_PATH {
                    self.handle_user_data()
                } else {
                    self.handle_batch(path, request)
                }
            }
        }
    }

    fn handle_token_fetch(&self, request: &HttpRequest) -> ServerResult<HttpResponse> {
        let email = request.body.form_text("email");
        let password = request.body.form_text("password");
        if email != Some(self.email.as_str()) || password != Some(self.password.as_str()) {
            return Err(ServerError::AuthenticationFailed("bad email or password".into()));
        }
        self.token_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.issue_pair())
    }

    fn handle_refresh(&self, request: &HttpRequest) -> ServerResult<HttpResponse> {
        let token = request
            .body
            .form_text("refresh_token")
            .ok_or_else(|| ServerError::InvalidRequest("missing refresh_token".into()))?;
        self.issuer.validate(token, TokenKind::Refresh)?;
        if !self.state.lock().refresh_tokens.remove(token) {
            return Err(ServerError::NotAuthorized("refresh token already used".into()));
        }
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(self.issue_pair())
    }

    fn issue_pair(&self) -> HttpResponse {
        let access_token = self.issuer.issue(TokenKind::Access, &self.user_id);
        let refresh_token = self.issuer.issue(TokenKind::Refresh, &self.user_id);
        self.state
            .lock()
            .refresh_tokens
            .insert(refresh_token.clone());

        let body = serde_json::json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "user_id": self.user_id,
        });
        HttpResponse::new(200, body.to_string())
    }

    fn authorize(&self, request: &HttpRequest) -> ServerResult<()> {
        let token = request
            .header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ServerError::NotAuthorized("missing bearer token".into()))?;
        self.validate_access_token(token)?;

        if let Some(client_id) = request.header(CLIENT_ID_HEADER) {
            let mut state = self.state.lock();
            if !state.client_ids.iter().any(|seen| seen == client_id) {
                state.client_ids.push(client_id.to_string());
            }
        }
        Ok(())
    }

    fn handle_user_data(&self) -> ServerResult<HttpResponse> {
        let data = self.state.lock().data.clone();
        let body = self.codec.encode_user_data(&data)?;
        self.user_data_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse::new(200, body))
    }

    fn handle_batch(&self, path: &str, request: &HttpRequest) -> ServerResult<HttpResponse> {
        let endpoint = endpoint_for(path)?;
        let bytes = request
            .body
            .form_binary("operations")
            .ok_or_else(|| ServerError::InvalidRequest("missing operations".into()))?;
        let operations = self.codec.decode_operations(bytes)?.operations;

        let mut handlers = Vec::with_capacity(operations.len());
        for op in &operations {
            let handler: HandlerId = op.metadata.handler_id.parse()?;
            if handler.endpoint() != endpoint {
                return Err(ServerError::InvalidRequest(format!(
                    "{handler} is not served on {path}"
                )));
            }
            handlers.push(handler);
        }

        let mut state = self.state.lock();
        if let Some(status) = state.batch_status {
            state.batches.push(RecordedBatch {
                path: path.to_string(),
                operations,
                accepted: false,
            });
            return Err(ServerError::Rejected { status });
        }

        // Apply to a copy so a bad operation leaves the data untouched.
        let mut data = state.data.clone();
        for (handler, op) in handlers.iter().zip(&operations) {
            apply_operation(&mut data, *handler, op)?;
        }
        state.data = data;
        debug!(path, operations = operations.len(), "fake server applied batch");
        state.batches.push(RecordedBatch {
            path: path.to_string(),
            operations,
            accepted: true,
        });
        Ok(HttpResponse::new(200, Vec::new()))
    }
}

#[async_trait]
impl HttpTransport for FakeServer {
    async fn post(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let response = self.handle(&request).unwrap_or_else(|e| {
            debug!(url = %request.url, error = %e, "fake server refused request");
            HttpResponse::new(e.status(), e.to_string())
        });
        Ok(response)
    }
}

impl std::fmt::Debug for FakeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeServer")
            .field("email", &self.email)
            .field("latency", &self.latency)
            .field("token_fetches", &self.token_fetch_count())
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

fn route(url: &str) -> ServerResult<&str> {
    url.strip_prefix(FAKE_BASE_URL.trim_end_matches('/'))
        .map(|path| path.trim_start_matches('/'))
        .ok_or_else(|| ServerError::NotFound(url.to_string()))
}

fn endpoint_for(path: &str) -> ServerResult<Endpoint> {
    [
        Endpoint::ShoppingLists,
        Endpoint::RecipeData,
        Endpoint::MealPlanningCalendar,
    ]
    .into_iter()
    .find(|endpoint| endpoint.path() == path)
    .ok_or_else(|| ServerError::NotFound(path.to_string()))
}

fn missing(what: &str) -> ServerError {
    ServerError::InvalidRequest(format!("operation is missing {what}"))
}

fn list_mut<'a>(data: &'a mut UserDataResponse, op: &WireOperation) -> ServerResult<&'a mut WireList> {
    let list_id = op.list_id.as_deref().ok_or_else(|| missing("listId"))?;
    data.shopping_lists_response
        .new_lists
        .iter_mut()
        .find(|list| list.identifier == list_id)
        .ok_or_else(|| ServerError::InvalidRequest(format!("unknown list {list_id}")))
}

fn item_mut<'a>(
    data: &'a mut UserDataResponse,
    op: &WireOperation,
) -> ServerResult<&'a mut WireListItem> {
    let item_id = op.list_item_id.as_deref().ok_or_else(|| missing("listItemId"))?;
    list_mut(data, op)?
        .items
        .iter_mut()
        .find(|item| item.identifier == item_id)
        .ok_or_else(|| ServerError::InvalidRequest(format!("unknown item {item_id}")))
}

fn set_item_field(item: &mut WireListItem, handler: HandlerId, value: String) -> ServerResult<()> {
    match handler {
        HandlerId::SetListItemName => item.name = value,
        HandlerId::SetListItemQuantity => item.quantity = Some(value),
        HandlerId::SetListItemDetails => item.details = Some(value),
        HandlerId::SetListItemChecked => item.checked = value == "y",
        HandlerId::SetListItemCategoryMatchId => item.category_match_id = Some(value),
        HandlerId::SetListItemSortOrder => {
            item.manual_sort_index = value
                .parse()
                .map_err(|_| ServerError::InvalidRequest(format!("bad sort index {value:?}")))?;
        }
        other => {
            return Err(ServerError::InvalidRequest(format!(
                "{other} does not set an item field"
            )))
        }
    }
    Ok(())
}

fn check_recipe_data(data: &UserDataResponse, op: &WireOperation) -> ServerResult<()> {
    let expected = data.recipe_data_response.recipe_data_id.as_deref();
    if op.recipe_data_id.as_deref() != expected || expected.is_none() {
        return Err(ServerError::InvalidRequest("recipe data id mismatch".into()));
    }
    Ok(())
}

fn apply_operation(
    data: &mut UserDataResponse,
    handler: HandlerId,
    op: &WireOperation,
) -> ServerResult<()> {
    match handler {
        HandlerId::SetListItemName
        | HandlerId::SetListItemQuantity
        | HandlerId::SetListItemDetails
        | HandlerId::SetListItemChecked
        | HandlerId::SetListItemCategoryMatchId
        | HandlerId::SetListItemSortOrder => {
            let value = op.updated_value.clone().ok_or_else(|| missing("updatedValue"))?;
            set_item_field(item_mut(data, op)?, handler, value)?;
        }
        HandlerId::AddShoppingListItem => {
            let item = op.list_item.clone().ok_or_else(|| missing("listItem"))?;
            list_mut(data, op)?.items.push(item);
        }
        HandlerId::RemoveShoppingListItem => {
            let item_id = op.list_item_id.clone().ok_or_else(|| missing("listItemId"))?;
            list_mut(data, op)?
                .items
                .retain(|item| item.identifier != item_id);
        }
        HandlerId::UncheckAll => {
            for item in &mut list_mut(data, op)?.items {
                item.checked = false;
            }
        }
        HandlerId::SaveRecipe => {
            check_recipe_data(data, op)?;
            let recipe = op.recipe.clone().ok_or_else(|| missing("recipe"))?;
            let recipes = &mut data.recipe_data_response.recipes;
            match recipes.iter_mut().find(|r| r.identifier == recipe.identifier) {
                Some(existing) => *existing = recipe,
                None => recipes.push(recipe),
            }
        }
        HandlerId::RemoveRecipe => {
            check_recipe_data(data, op)?;
            let recipe = op.recipe.as_ref().ok_or_else(|| missing("recipe"))?;
            data.recipe_data_response
                .recipes
                .retain(|r| r.identifier != recipe.identifier);
        }
        HandlerId::NewRecipeCollection => {
            check_recipe_data(data, op)?;
            let collection = op.recipe_collection.clone().ok_or_else(|| missing("recipeCollection"))?;
            data.recipe_data_response.recipe_collections.push(collection);
        }
        HandlerId::RemoveRecipeCollection => {
            check_recipe_data(data, op)?;
            let collection = op.recipe_collection.as_ref().ok_or_else(|| missing("recipeCollection"))?;
            data.recipe_data_response
                .recipe_collections
                .retain(|c| c.identifier != collection.identifier);
        }
        HandlerId::AddRecipesToCollection | HandlerId::RemoveRecipesFromCollection => {
            check_recipe_data(data, op)?;
            let wanted = op.recipe_collection.as_ref().ok_or_else(|| missing("recipeCollection"))?;
            let collection = data
                .recipe_data_response
                .recipe_collections
                .iter_mut()
                .find(|c| c.identifier == wanted.identifier)
                .ok_or_else(|| {
                    ServerError::InvalidRequest(format!("unknown collection {}", wanted.identifier))
                })?;
            if handler == HandlerId::AddRecipesToCollection {
                for id in &op.recipe_ids {
                    if !collection.recipe_ids.contains(id) {
                        collection.recipe_ids.push(id.clone());
                    }
                }
            } else {
                collection.recipe_ids.retain(|id| !op.recipe_ids.contains(id));
            }
        }
        HandlerId::NewEvent | HandlerId::SaveEvent => {
            let event = op.calendar_event.clone().ok_or_else(|| missing("calendarEvent"))?;
            let calendar = &mut data.meal_planning_calendar_response;
            if calendar.calendar_id.as_deref() != Some(event.calendar_id.as_str()) {
                return Err(ServerError::InvalidRequest("calendar id mismatch".into()));
            }
            match calendar.events.iter_mut().find(|e| e.identifier == event.identifier) {
                Some(existing) => *existing = event,
                None => calendar.events.push(event),
            }
        }
        HandlerId::DeleteEvent => {
            let event_id = op.event_id.clone().ok_or_else(|| missing("eventId"))?;
            data.meal_planning_calendar_response
                .events
                .retain(|e| e.identifier != event_id);
        }
    }
    Ok(())
}
