//! Live channel frames.

/// Keepalive frame sent by the client.
pub const HEARTBEAT_FRAME: &str = "--heartbeat--";

/// Frame the server pushes when shopping lists changed elsewhere.
pub const REFRESH_SHOPPING_LISTS: &str = "refresh-shopping-lists";

/// An inbound text frame on the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// Shopping lists changed on another client.
    RefreshShoppingLists,
    /// Anything else. Ignored by the client.
    Unrecognized(String),
}

impl ChannelMessage {
    /// Classifies a raw text frame. Only the exact refresh frame counts;
    /// padded or differently cased text is unrecognized.
    pub fn parse(frame: &str) -> Self {
        match frame {
            REFRESH_SHOPPING_LISTS => ChannelMessage::RefreshShoppingLists,
            other => ChannelMessage::Unrecognized(other.to_string()),
        }
    }
}
