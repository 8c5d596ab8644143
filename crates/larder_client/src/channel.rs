//! Live update channel.
//!
//! One spawned task owns the socket connection. It multiplexes keepalive
//! ticks, inbound frames and shutdown with `tokio::select!`:
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Degraded -> Reconnecting { attempt } -> Open
//!                                                                            -> Disconnected
//! ```
//!
//! A failed connect or a transport error refreshes the access token once and
//! reconnects after the retry delay. Consecutive failures are bounded by
//! [`RetryConfig::max_attempts`]; a successful open resets the count. A clean
//! close by the server reconnects without a refresh.
//!
//! Refresh signals are handed to a second task that runs the
//! [`RemoteChangeHandler`] one call at a time, so a slow refetch never stalls
//! keepalives or shutdown. At most one signal waits behind the running call;
//! further signals arriving meanwhile are folded into it.
//!
//! [`RetryConfig::max_attempts`]: crate::RetryConfig::max_attempts

use crate::config::ChannelConfig;
use crate::error::ClientResult;
use crate::transport::{SocketConnectRequest, SocketConnection, SocketTransport, TransportError};
use async_trait::async_trait;
use larder_protocol::{ChannelMessage, HEARTBEAT_FRAME};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Connection state of the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not connected and not trying to.
    Disconnected,
    /// First connection attempt in progress.
    Connecting,
    /// Connected; keepalives are running.
    Open,
    /// The connection failed; recovery is about to start.
    Degraded,
    /// Reconnecting after a failure or a server close.
    Reconnecting {
        /// Consecutive failed attempts so far.
        attempt: u32,
    },
}

impl ChannelState {
    /// Returns true if the channel is connected.
    pub fn is_open(&self) -> bool {
        matches!(self, ChannelState::Open)
    }
}

/// Reacts to change signals from the server.
#[async_trait]
pub trait RemoteChangeHandler: Send + Sync {
    /// Called when another client changed the account's shopping lists.
    async fn on_lists_changed(&self);
}

/// Credentials the channel needs for its handshake.
#[async_trait]
pub trait ChannelCredentials: Send + Sync {
    /// Headers for the next handshake, built from the current tokens.
    fn handshake_headers(&self) -> Vec<(String, String)>;

    /// Refreshes the access token before a reconnect.
    async fn refresh_credentials(&self) -> ClientResult<()>;
}

/// Handle to the running channel task.
pub struct LiveChannel {
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    state: Arc<watch::Sender<ChannelState>>,
}

impl LiveChannel {
    /// Spawns the channel task. Must be called within a tokio runtime.
    ///
    /// State transitions are published on `state`, which reads
    /// [`ChannelState::Connecting`] as soon as this returns.
    pub fn spawn(
        config: ChannelConfig,
        socket: Arc<dyn SocketTransport>,
        credentials: Arc<dyn ChannelCredentials>,
        handler: Arc<dyn RemoteChangeHandler>,
        state: Arc<watch::Sender<ChannelState>>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (refreshes, refresh_rx) = mpsc::channel(1);
        state.send_replace(ChannelState::Connecting);

        let worker = Worker {
            config,
            socket,
            credentials,
            refreshes,
            state: Arc::clone(&state),
            shutdown: shutdown_rx,
        };
        let handle = tokio::spawn(worker.run());
        let dispatcher = tokio::spawn(dispatch_refreshes(handler, refresh_rx));

        Self {
            shutdown,
            worker: Mutex::new(Some(handle)),
            dispatcher: Mutex::new(Some(dispatcher)),
            state,
        }
    }

    /// Returns true once the channel has stopped, either after
    /// [`close`](LiveChannel::close) or after giving up on reconnecting.
    ///
    /// `Disconnected` is the worker's last state, so it counts as stopped
    /// even before the task itself has returned.
    pub fn is_stopped(&self) -> bool {
        self.state() == ChannelState::Disconnected
            || self
                .worker
                .lock()
                .as_ref()
                .map_or(true, JoinHandle::is_finished)
    }

    /// Returns the current state.
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// Stops the keepalive, closes the connection and waits for the task.
    ///
    /// A refetch still in flight is cancelled rather than awaited. Calling it
    /// again is a no-op.
    pub async fn close(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "live channel task failed");
            }
        }

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.abort();
            if let Err(e) = dispatcher.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "refresh dispatcher failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for LiveChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveChannel")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

enum Outcome {
    Shutdown,
    Closed,
    Failed(TransportError),
}

struct Worker {
    config: ChannelConfig,
    socket: Arc<dyn SocketTransport>,
    credentials: Arc<dyn ChannelCredentials>,
    refreshes: mpsc::Sender<()>,
    state: Arc<watch::Sender<ChannelState>>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        let max_attempts = self.config.reconnect.max_attempts;
        let mut failures: u32 = 0;
        let mut reconnecting = false;

        loop {
            self.set_state(if reconnecting {
                ChannelState::Reconnecting { attempt: failures }
            } else {
                ChannelState::Connecting
            });

            let request = SocketConnectRequest {
                url: self.config.url.clone(),
                headers: self.credentials.handshake_headers(),
            };
            let connected = tokio::select! {
                _ = shutdown_requested(&mut self.shutdown) => break,
                result = self.socket.connect(request) => result,
            };

            let outcome = match connected {
                Ok(connection) => {
                    failures = 0;
                    info!(url = %self.config.url, "live channel open");
                    self.set_state(ChannelState::Open);
                    self.serve(connection).await
                }
                Err(e) => Outcome::Failed(e),
            };

            let delay = match outcome {
                Outcome::Shutdown => break,
                Outcome::Closed => {
                    info!("live channel closed by server, reconnecting");
                    self.config.reconnect.delay_for_attempt(1)
                }
                Outcome::Failed(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "live channel failed");
                    self.set_state(ChannelState::Degraded);
                    if failures > max_attempts {
                        warn!(max_attempts, "live channel giving up");
                        break;
                    }
                    let refreshed = tokio::select! {
                        _ = shutdown_requested(&mut self.shutdown) => break,
                        result = self.credentials.refresh_credentials() => result,
                    };
                    if let Err(e) = refreshed {
                        warn!(error = %e, "token refresh before reconnect failed");
                    }
                    self.config.reconnect.delay_for_attempt(failures)
                }
            };

            reconnecting = true;
            if self.pause(delay).await {
                break;
            }
        }

        self.set_state(ChannelState::Disconnected);
        debug!("live channel stopped");
    }

    async fn serve(&mut self, mut connection: Box<dyn SocketConnection>) -> Outcome {
        let period = self.config.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                _ = shutdown_requested(&mut self.shutdown) => break Outcome::Shutdown,
                _ = heartbeat.tick() => {
                    if let Err(e) = connection.send_text(HEARTBEAT_FRAME).await {
                        break Outcome::Failed(e);
                    }
                }
                frame = connection.recv() => match frame {
                    Ok(Some(text)) => self.dispatch(&text),
                    Ok(None) => break Outcome::Closed,
                    Err(e) => break Outcome::Failed(e),
                },
            }
        };

        drop(heartbeat);
        if matches!(outcome, Outcome::Shutdown) {
            if let Err(e) = connection.close().await {
                debug!(error = %e, "closing live channel");
            }
        }
        outcome
    }

    fn dispatch(&self, frame: &str) {
        match ChannelMessage::parse(frame) {
            ChannelMessage::RefreshShoppingLists => match self.refreshes.try_send(()) {
                Ok(()) => info!("shopping lists changed remotely, refreshing"),
                Err(TrySendError::Full(())) => debug!("refresh already queued"),
                Err(TrySendError::Closed(())) => warn!("refresh dispatcher is gone"),
            },
            ChannelMessage::Unrecognized(frame) => {
                debug!(frame, "ignoring channel frame");
            }
        }
    }

    /// Sleeps for `delay`. Returns true if shutdown was requested meanwhile.
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = shutdown_requested(&mut self.shutdown) => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    fn set_state(&self, state: ChannelState) {
        debug!(?state, "live channel state");
        self.state.send_replace(state);
    }
}

/// Runs the change handler once per queued signal, in arrival order.
async fn dispatch_refreshes(
    handler: Arc<dyn RemoteChangeHandler>,
    mut signals: mpsc::Receiver<()>,
) {
    while signals.recv().await.is_some() {
        handler.on_lists_changed().await;
    }
}

/// Resolves once shutdown is signalled or the handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::transport::TransportResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct ScriptedSocket {
        fail: bool,
        connects: AtomicUsize,
        frames: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedSocket {
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                connects: AtomicUsize::new(0),
                frames: Mutex::new(None),
                sent: Arc::default(),
            })
        }

        fn serving() -> (Arc<Self>, mpsc::UnboundedSender<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let socket = Arc::new(Self {
                fail: false,
                connects: AtomicUsize::new(0),
                frames: Mutex::new(Some(rx)),
                sent: Arc::default(),
            });
            (socket, tx)
        }
    }

    struct ScriptedConnection {
        frames: mpsc::UnboundedReceiver<String>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SocketTransport for ScriptedSocket {
        async fn connect(
            &self,
            _request: SocketConnectRequest,
        ) -> TransportResult<Box<dyn SocketConnection>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let frames = if self.fail {
                None
            } else {
                self.frames.lock().take()
            };
            match frames {
                Some(frames) => Ok(Box::new(ScriptedConnection {
                    frames,
                    sent: Arc::clone(&self.sent),
                })),
                None => Err(TransportError::ConnectionFailed("refused".into())),
            }
        }
    }

    #[async_trait]
    impl SocketConnection for ScriptedConnection {
        async fn send_text(&mut self, text: &str) -> TransportResult<()> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> TransportResult<Option<String>> {
            Ok(self.frames.recv().await)
        }

        async fn close(&mut self) -> TransportResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingCredentials {
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl ChannelCredentials for CountingCredentials {
        fn handshake_headers(&self) -> Vec<(String, String)> {
            vec![("authorization".into(), "Bearer test".into())]
        }

        async fn refresh_credentials(&self) -> ClientResult<()> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SignallingHandler {
        calls: mpsc::UnboundedSender<()>,
    }

    #[async_trait]
    impl RemoteChangeHandler for SignallingHandler {
        async fn on_lists_changed(&self) {
            let _ = self.calls.send(());
        }
    }

    /// Never finishes a refetch.
    struct StuckHandler {
        started: mpsc::UnboundedSender<()>,
    }

    #[async_trait]
    impl RemoteChangeHandler for StuckHandler {
        async fn on_lists_changed(&self) {
            let _ = self.started.send(());
            std::future::pending::<()>().await;
        }
    }

    fn config(max_attempts: u32) -> ChannelConfig {
        ChannelConfig {
            url: "wss://stub/data/add-user-listener".into(),
            heartbeat_interval: Duration::from_millis(20),
            reconnect: RetryConfig::new(max_attempts)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        }
    }

    fn state() -> Arc<watch::Sender<ChannelState>> {
        Arc::new(watch::channel(ChannelState::Disconnected).0)
    }

    #[tokio::test]
    async fn failing_transport_is_bounded() {
        let socket = ScriptedSocket::failing();
        let credentials = Arc::new(CountingCredentials::default());
        let (calls, _rx) = mpsc::unbounded_channel();
        let state = state();
        let mut states = state.subscribe();

        let channel = LiveChannel::spawn(
            config(2),
            socket.clone(),
            credentials.clone(),
            Arc::new(SignallingHandler { calls }),
            state,
        );

        timeout(Duration::from_secs(5), async {
            loop {
                states.changed().await.unwrap();
                if *states.borrow_and_update() == ChannelState::Disconnected {
                    return;
                }
            }
        })
        .await
        .unwrap();
        channel.close().await;

        assert_eq!(socket.connects.load(Ordering::SeqCst), 3);
        assert_eq!(credentials.refreshes.load(Ordering::SeqCst), 2);
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn refresh_frame_calls_handler_once() {
        let (socket, frames) = ScriptedSocket::serving();
        let (calls, mut call_rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::spawn(
            config(2),
            socket.clone(),
            Arc::new(CountingCredentials::default()),
            Arc::new(SignallingHandler { calls }),
            state(),
        );

        frames.send("hello".into()).unwrap();
        frames.send("refresh-shopping-lists".into()).unwrap();
        timeout(Duration::from_secs(5), call_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(channel.state().is_open());
        assert!(call_rx.try_recv().is_err());

        channel.close().await;
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn heartbeats_are_sent_while_open() {
        let (socket, _frames) = ScriptedSocket::serving();
        let (calls, _rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::spawn(
            config(2),
            socket.clone(),
            Arc::new(CountingCredentials::default()),
            Arc::new(SignallingHandler { calls }),
            state(),
        );

        timeout(Duration::from_secs(5), async {
            while socket.sent.lock().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(socket.sent.lock().iter().all(|f| f == HEARTBEAT_FRAME));

        channel.close().await;
        channel.close().await;
        let sent = socket.sent.lock().len();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(socket.sent.lock().len(), sent);
    }

    #[tokio::test]
    async fn slow_refetch_does_not_stall_keepalives_or_close() {
        let (socket, frames) = ScriptedSocket::serving();
        let (started, mut started_rx) = mpsc::unbounded_channel();
        let channel = LiveChannel::spawn(
            config(2),
            socket.clone(),
            Arc::new(CountingCredentials::default()),
            Arc::new(StuckHandler { started }),
            state(),
        );

        frames.send("refresh-shopping-lists".into()).unwrap();
        timeout(Duration::from_secs(5), started_rx.recv())
            .await
            .unwrap()
            .unwrap();
        frames.send("refresh-shopping-lists".into()).unwrap();
        frames.send("refresh-shopping-lists".into()).unwrap();

        let before = socket.sent.lock().len();
        timeout(Duration::from_secs(5), async {
            while socket.sent.lock().len() < before + 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(channel.state().is_open());

        timeout(Duration::from_secs(1), channel.close())
            .await
            .unwrap();
        assert_eq!(channel.state(), ChannelState::Disconnected);
        assert!(started_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stopped_after_giving_up() {
        let socket = ScriptedSocket::failing();
        let (calls, _rx) = mpsc::unbounded_channel();
        let state = state();
        let mut states = state.subscribe();

        let channel = LiveChannel::spawn(
            config(0),
            socket,
            Arc::new(CountingCredentials::default()),
            Arc::new(SignallingHandler { calls }),
            state,
        );
        assert_eq!(channel.state(), ChannelState::Connecting);
        assert!(!channel.is_stopped());

        timeout(
            Duration::from_secs(5),
            states.wait_for(|s| *s == ChannelState::Disconnected),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(channel.is_stopped());
        channel.close().await;
        assert!(channel.is_stopped());
    }
}
