//! Cached account graph.

use crate::error::ClientResult;
use crate::session::Session;
use crate::transport::RequestBody;
use larder_core::Snapshot;
use larder_protocol::WireCodec;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Path of the user data fetch.
pub const USER_DATA_PATH: &str = "data/user-data/get";

/// Fetches and caches the account's [`Snapshot`].
pub struct EntityGraph {
    session: Arc<Session>,
    codec: Arc<dyn WireCodec>,
    cache: RwLock<Option<Arc<Snapshot>>>,
    fetches: AtomicU64,
}

impl EntityGraph {
    /// Creates an empty graph.
    pub fn new(session: Arc<Session>, codec: Arc<dyn WireCodec>) -> Self {
        Self {
            session,
            codec,
            cache: RwLock::new(None),
            fetches: AtomicU64::new(0),
        }
    }

    /// Returns the cached snapshot, fetching when there is none or when
    /// `force_refresh` is set.
    pub async fn load_snapshot(&self, force_refresh: bool) -> ClientResult<Arc<Snapshot>> {
        if !force_refresh {
            if let Some(snapshot) = self.cached() {
                return Ok(snapshot);
            }
        }

        let response = self
            .session
            .authenticated_request(USER_DATA_PATH, RequestBody::Empty)
            .await?;
        let data = self.codec.decode_user_data(&response.body)?;
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let snapshot = Arc::new(Snapshot::from_wire(&data));
        if let Some(user_id) = snapshot.user_id() {
            self.session.learn_user_id(user_id);
        }
        debug!(
            lists = snapshot.lists().len(),
            recipes = snapshot.recipes().len(),
            events = snapshot.calendar_events().len(),
            "loaded user data"
        );

        *self.cache.write() = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Returns the cached snapshot without fetching.
    pub fn cached(&self) -> Option<Arc<Snapshot>> {
        self.cache.read().clone()
    }

    /// Number of user data fetches performed.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Applies an accepted change to the cached snapshot, if any.
    ///
    /// Snapshots already handed out keep their contents.
    pub(crate) fn apply<F>(&self, f: F)
    where
        F: FnOnce(&mut Snapshot),
    {
        let mut cache = self.cache.write();
        if let Some(snapshot) = cache.as_mut() {
            f(Arc::make_mut(snapshot));
        }
    }

    /// Returns the session requests go through.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl std::fmt::Debug for EntityGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityGraph")
            .field("cached", &self.cache.read().is_some())
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}
