//! In-memory fake of the live update socket.
//!
//! Each successful connect opens a fresh in-memory connection. The test
//! drives it from the server side with [`FakeSocket::push_text`],
//! [`FakeSocket::close_connection`] and [`FakeSocket::break_connection`],
//! and inspects what the client sent with [`FakeSocket::sent_frames`].

use crate::server::FakeServer;
use async_trait::async_trait;
use larder_client::{
    SocketConnectRequest, SocketConnection, SocketTransport, TransportError, TransportResult,
};
use larder_protocol::HEARTBEAT_FRAME;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

enum Frame {
    Text(String),
    Break,
}

#[derive(Default)]
struct SocketState {
    failures_remaining: usize,
    fail_always: bool,
    live: Option<UnboundedSender<Frame>>,
    sent: Vec<String>,
    connects: usize,
    handshakes: Vec<SocketConnectRequest>,
}

/// Scriptable [`SocketTransport`].
///
/// When built with [`FakeSocket::with_server`], handshakes must carry an
/// access token the server accepts.
#[derive(Default)]
pub struct FakeSocket {
    server: Option<Arc<FakeServer>>,
    state: Arc<Mutex<SocketState>>,
    attempts: Notify,
}

impl FakeSocket {
    /// Creates a socket that accepts every handshake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a socket that validates handshake tokens against `server`.
    pub fn with_server(server: Arc<FakeServer>) -> Self {
        Self {
            server: Some(server),
            ..Self::default()
        }
    }

    /// Fails the next `count` connect attempts.
    pub fn fail_next_connects(&self, count: usize) {
        self.state.lock().failures_remaining = count;
    }

    /// Fails every connect attempt while `fail` is set.
    pub fn fail_all_connects(&self, fail: bool) {
        self.state.lock().fail_always = fail;
    }

    /// Delivers a text frame on the open connection.
    ///
    /// Returns false if no connection is open.
    pub fn push_text(&self, text: &str) -> bool {
        let state = self.state.lock();
        state
            .live
            .as_ref()
            .is_some_and(|tx| tx.send(Frame::Text(text.to_string())).is_ok())
    }

    /// Closes the open connection cleanly from the server side.
    pub fn close_connection(&self) -> bool {
        self.state.lock().live.take().is_some()
    }

    /// Drops the open connection with an error.
    pub fn break_connection(&self) -> bool {
        self.state
            .lock()
            .live
            .take()
            .is_some_and(|tx| tx.send(Frame::Break).is_ok())
    }

    /// Number of connect attempts, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Handshake requests in attempt order.
    pub fn handshakes(&self) -> Vec<SocketConnectRequest> {
        self.state.lock().handshakes.clone()
    }

    /// Every frame the client sent, across connections.
    pub fn sent_frames(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Number of keepalive frames the client sent.
    pub fn heartbeat_count(&self) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|frame| frame.as_str() == HEARTBEAT_FRAME)
            .count()
    }

    /// Waits until at least `count` connect attempts were made.
    pub async fn wait_for_connects(&self, count: usize) {
        loop {
            let attempted = self.attempts.notified();
            if self.connect_count() >= count {
                return;
            }
            attempted.await;
        }
    }

    fn accept(&self, request: SocketConnectRequest) -> TransportResult<Box<dyn SocketConnection>> {
        let mut state = self.state.lock();
        state.connects += 1;
        state.handshakes.push(request.clone());

        if state.fail_always {
            return Err(TransportError::ConnectionFailed("connection refused".into()));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(TransportError::ConnectionFailed("connection refused".into()));
        }

        if let Some(server) = &self.server {
            let token = request
                .header("authorization")
                .and_then(|value| value.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    TransportError::ConnectionFailed("handshake rejected: no token".into())
                })?;
            server
                .validate_access_token(token)
                .map_err(|e| TransportError::ConnectionFailed(format!("handshake rejected: {e}")))?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.live = Some(tx);
        Ok(Box::new(FakeConnection {
            rx,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

#[async_trait]
impl SocketTransport for FakeSocket {
    async fn connect(
        &self,
        request: SocketConnectRequest,
    ) -> TransportResult<Box<dyn SocketConnection>> {
        let result = self.accept(request);
        self.attempts.notify_waiters();
        result
    }
}

impl std::fmt::Debug for FakeSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FakeSocket")
            .field("connects", &state.connects)
            .field("open", &state.live.is_some())
            .field("sent", &state.sent.len())
            .finish_non_exhaustive()
    }
}

struct FakeConnection {
    rx: UnboundedReceiver<Frame>,
    state: Arc<Mutex<SocketState>>,
    closed: bool,
}

#[async_trait]
impl SocketConnection for FakeConnection {
    async fn send_text(&mut self, text: &str) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::SendFailed("connection closed".into()));
        }
        self.state.lock().sent.push(text.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> TransportResult<Option<String>> {
        match self.rx.recv().await {
            Some(Frame::Text(text)) => Ok(Some(text)),
            Some(Frame::Break) => Err(TransportError::ReceiveFailed("connection reset".into())),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.closed = true;
        self.rx.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake() -> SocketConnectRequest {
        SocketConnectRequest {
            url: "ws://larder.test/data/add-user-listener".into(),
            headers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let socket = FakeSocket::new();
        let mut conn = socket.connect(handshake()).await.unwrap();

        assert!(socket.push_text("refresh-shopping-lists"));
        assert_eq!(
            conn.recv().await.unwrap().as_deref(),
            Some("refresh-shopping-lists")
        );

        conn.send_text(HEARTBEAT_FRAME).await.unwrap();
        assert_eq!(socket.heartbeat_count(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_run_out() {
        let socket = FakeSocket::new();
        socket.fail_next_connects(2);

        assert!(socket.connect(handshake()).await.is_err());
        assert!(socket.connect(handshake()).await.is_err());
        assert!(socket.connect(handshake()).await.is_ok());
        assert_eq!(socket.connect_count(), 3);
    }

    #[tokio::test]
    async fn server_side_close_and_break() {
        let socket = FakeSocket::new();

        let mut conn = socket.connect(handshake()).await.unwrap();
        assert!(socket.close_connection());
        assert_eq!(conn.recv().await, Ok(None));
        assert!(!socket.push_text("late"));

        let mut conn = socket.connect(handshake()).await.unwrap();
        assert!(socket.break_connection());
        assert!(matches!(
            conn.recv().await,
            Err(TransportError::ReceiveFailed(_))
        ));
    }

    #[tokio::test]
    async fn handshake_without_token_is_rejected_by_server() {
        let server = Arc::new(FakeServer::new(crate::fixtures::sample_user_data()));
        let socket = FakeSocket::with_server(server);

        let err = socket.connect(handshake()).await.err().unwrap();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
        assert_eq!(socket.handshakes().len(), 1);
    }

    #[tokio::test]
    async fn closed_connection_refuses_sends() {
        let socket = FakeSocket::new();
        let mut conn = socket.connect(handshake()).await.unwrap();

        conn.close().await.unwrap();
        assert!(conn.send_text(HEARTBEAT_FRAME).await.is_err());
        assert!(socket.sent_frames().is_empty());
    }
}
