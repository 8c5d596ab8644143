//! Binary codec for request and response bodies.

use crate::batch::OperationBatch;
use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{UserDataResponse, WireOperationList};

/// Encodes operation batches and decodes server payloads.
///
/// The session engine never looks inside encoded bytes, so any format can be
/// plugged in.
pub trait WireCodec: Send + Sync {
    /// Encodes a batch. Empty batches are rejected.
    fn encode_operations(&self, batch: &OperationBatch) -> ProtocolResult<Vec<u8>>;

    /// Decodes an encoded operation list.
    fn decode_operations(&self, bytes: &[u8]) -> ProtocolResult<WireOperationList>;

    /// Encodes a user data snapshot.
    fn encode_user_data(&self, data: &UserDataResponse) -> ProtocolResult<Vec<u8>>;

    /// Decodes a user data snapshot.
    fn decode_user_data(&self, bytes: &[u8]) -> ProtocolResult<UserDataResponse>;
}

/// CBOR implementation of [`WireCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl CborCodec {
    /// Creates a codec.
    pub fn new() -> Self {
        Self
    }

    fn encode<T: serde::Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(value, &mut bytes)
            .map_err(|e| ProtocolError::encode(e.to_string()))?;
        Ok(bytes)
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::decode(e.to_string()))
    }
}

impl WireCodec for CborCodec {
    fn encode_operations(&self, batch: &OperationBatch) -> ProtocolResult<Vec<u8>> {
        if batch.is_empty() {
            return Err(ProtocolError::EmptyBatch);
        }
        Self::encode(&batch.to_wire())
    }

    fn decode_operations(&self, bytes: &[u8]) -> ProtocolResult<WireOperationList> {
        Self::decode(bytes)
    }

    fn encode_user_data(&self, data: &UserDataResponse) -> ProtocolResult<Vec<u8>> {
        Self::encode(data)
    }

    fn decode_user_data(&self, bytes: &[u8]) -> ProtocolResult<UserDataResponse> {
        Self::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{
        Endpoint, FieldValue, HandlerId, Operation, OperationPayload, OperationTarget,
    };
    use crate::wire::{WireList, WireListItem};

    #[test]
    fn operations_survive_encoding() {
        let codec = CborCodec::new();
        let batch = OperationBatch::single(Operation::new(
            HandlerId::SetListItemSortOrder,
            Some("u".into()),
            OperationTarget::list_item("l", "i"),
            OperationPayload::Value(FieldValue::Integer(7)),
        ));

        let bytes = codec.encode_operations(&batch).unwrap();
        let decoded = codec.decode_operations(&bytes).unwrap();

        assert_eq!(decoded, batch.to_wire());
        assert_eq!(decoded.operations[0].updated_value.as_deref(), Some("7"));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let codec = CborCodec::new();
        let batch = OperationBatch::new(Endpoint::ShoppingLists);
        assert!(matches!(
            codec.encode_operations(&batch),
            Err(ProtocolError::EmptyBatch)
        ));
    }

    #[test]
    fn user_data_survives_encoding() {
        let codec = CborCodec::new();
        let mut data = UserDataResponse {
            user_id: Some("user-1".into()),
            ..Default::default()
        };
        data.shopping_lists_response.new_lists.push(WireList {
            identifier: "l1".into(),
            name: "Groceries".into(),
            items: vec![WireListItem {
                identifier: "i1".into(),
                name: "Milk".into(),
                checked: true,
                ..Default::default()
            }],
        });

        let bytes = codec.encode_user_data(&data).unwrap();
        assert_eq!(codec.decode_user_data(&bytes).unwrap(), data);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let codec = CborCodec::new();
        let err = codec.decode_user_data(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
