//! Property-based test generators using proptest.

use larder_core::crypto::CredentialRecord;
use larder_protocol::wire::WireListItem;
use larder_protocol::FieldValue;
use proptest::prelude::*;

/// Strategy for token-like strings.
pub fn token_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9._-]{1,96}").expect("Invalid regex")
}

/// Strategy for credential records, including partially filled ones.
pub fn credential_record_strategy() -> impl Strategy<Value = CredentialRecord> {
    (
        prop::option::of(prop::string::string_regex("[0-9a-f]{32}").expect("Invalid regex")),
        prop::option::of(token_strategy()),
        prop::option::of(token_strategy()),
    )
        .prop_map(|(client_id, access_token, refresh_token)| CredentialRecord {
            client_id,
            access_token,
            refresh_token,
        })
}

/// Strategy for non-empty secrets, unicode included.
pub fn secret_strategy() -> impl Strategy<Value = String> {
    "\\PC{1,64}"
}

/// Strategy for item field values.
pub fn field_value_strategy() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        "\\PC{0,32}".prop_map(FieldValue::Text),
        any::<bool>().prop_map(FieldValue::Flag),
        any::<i64>().prop_map(FieldValue::Integer),
    ]
}

/// Strategy for wire list items belonging to `list_id`.
pub fn wire_item_strategy(list_id: &'static str) -> impl Strategy<Value = WireListItem> {
    (
        prop::string::string_regex("[a-z0-9]{8,16}").expect("Invalid regex"),
        "[a-z ]{1,24}",
        prop::option::of("[0-9]{1,3}( lbs| oz)?"),
        any::<bool>(),
        0i64..1000,
    )
        .prop_map(move |(identifier, name, quantity, checked, manual_sort_index)| WireListItem {
            identifier,
            list_id: Some(list_id.to_string()),
            name,
            quantity,
            checked,
            manual_sort_index,
            ..Default::default()
        })
}
