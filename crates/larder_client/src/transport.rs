//! Transport abstractions.
//!
//! The client never opens sockets itself. HTTP round trips go through
//! [`HttpTransport`] and the live channel through [`SocketTransport`], so
//! any HTTP or websocket library (or an in-memory fake) can be plugged in.
//! Timeouts are the transport's responsibility.

use async_trait::async_trait;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A value in a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Text field.
    Text(String),
    /// Binary field.
    Binary(Vec<u8>),
}

/// A named field in a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FormValue,
}

impl FormField {
    /// Creates a text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// Creates a binary field.
    pub fn binary(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Binary(value),
        }
    }
}

/// Body of a POST request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Multipart form.
    Form(Vec<FormField>),
}

impl RequestBody {
    fn field(&self, name: &str) -> Option<&FormValue> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Form(fields) => fields
                .iter()
                .find(|field| field.name == name)
                .map(|field| &field.value),
        }
    }

    /// Returns a text field of a form body.
    pub fn form_text(&self, name: &str) -> Option<&str> {
        match self.field(name)? {
            FormValue::Text(text) => Some(text),
            FormValue::Binary(_) => None,
        }
    }

    /// Returns a binary field of a form body.
    pub fn form_binary(&self, name: &str) -> Option<&[u8]> {
        match self.field(name)? {
            FormValue::Binary(bytes) => Some(bytes),
            FormValue::Text(_) => None,
        }
    }
}

/// An HTTP POST request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Returns a header value, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends HTTP POST requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and returns the response, whatever its status.
    async fn post(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
}

/// Parameters of a live channel handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConnectRequest {
    /// Channel URL.
    pub url: String,
    /// Handshake headers, rebuilt from the session on every attempt.
    pub headers: Vec<(String, String)>,
}

impl SocketConnectRequest {
    /// Returns a header value, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Opens live channel connections.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    /// Performs the handshake and returns the open connection.
    async fn connect(
        &self,
        request: SocketConnectRequest,
    ) -> TransportResult<Box<dyn SocketConnection>>;
}

/// An open live channel connection carrying text frames.
#[async_trait]
pub trait SocketConnection: Send {
    /// Sends a text frame.
    async fn send_text(&mut self, text: &str) -> TransportResult<()>;

    /// Receives the next text frame.
    ///
    /// Returns `None` when the server closed the connection cleanly. Must be
    /// cancel-safe: dropping the future may not lose a frame.
    async fn recv(&mut self) -> TransportResult<Option<String>>;

    /// Closes the connection.
    async fn close(&mut self) -> TransportResult<()>;
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields() {
        let body = RequestBody::Form(vec![
            FormField::text("email", "cook@example.com"),
            FormField::binary("operations", vec![1, 2, 3]),
        ]);

        assert_eq!(body.form_text("email"), Some("cook@example.com"));
        assert_eq!(body.form_binary("operations"), Some(&[1u8, 2, 3][..]));
        assert_eq!(body.form_text("operations"), None);
        assert_eq!(RequestBody::Empty.form_text("email"), None);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let request = HttpRequest {
            url: "http://fake/auth/token".into(),
            headers: vec![("Authorization".into(), "Bearer t".into())],
            body: RequestBody::Empty,
        };
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn response_status() {
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(!HttpResponse::new(401, "no").is_success());
    }
}
