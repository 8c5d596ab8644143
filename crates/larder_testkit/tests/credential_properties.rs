//! Property tests for the credential codec and store.

use larder_client::{ClientError, CredentialStore};
use larder_core::crypto::{self, CredentialRecord};
use larder_testkit::generators::{credential_record_strategy, secret_strategy};
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn records_survive_encryption(record in credential_record_strategy(), secret in secret_strategy()) {
        let blob = crypto::encrypt(&record, &secret).unwrap();
        prop_assert_eq!(crypto::decrypt(&blob, &secret).unwrap(), record);
    }

    #[test]
    fn other_secrets_cannot_decrypt(record in credential_record_strategy(), secret in secret_strategy()) {
        let blob = crypto::encrypt(&record, &secret).unwrap();
        let other = format!("{secret}!");
        prop_assert!(crypto::decrypt(&blob, &other).is_err());
    }

    #[test]
    fn flipped_bytes_are_detected(
        record in credential_record_strategy(),
        secret in secret_strategy(),
        index in any::<prop::sample::Index>(),
    ) {
        let blob = crypto::encrypt(&record, &secret).unwrap();
        let mut envelope: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        let mut cipher = hex::decode(envelope["cipher"].as_str().unwrap()).unwrap();
        let at = index.index(cipher.len());
        cipher[at] ^= 0x01;
        envelope["cipher"] = serde_json::Value::String(hex::encode(cipher));

        let tampered = serde_json::to_vec(&envelope).unwrap();
        prop_assert!(crypto::decrypt(&tampered, &secret).is_err());
    }
}

#[test]
fn each_encryption_uses_a_fresh_iv() {
    let record = CredentialRecord {
        client_id: Some("0123456789abcdef0123456789abcdef".into()),
        ..Default::default()
    };
    let a = crypto::encrypt(&record, "secret").unwrap();
    let b = crypto::encrypt(&record, "secret").unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn store_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("credentials.json");
    let store = CredentialStore::new(Some(path.clone()), "hunter2");
    let record = CredentialRecord {
        client_id: Some("client".into()),
        access_token: Some("access".into()),
        refresh_token: Some("refresh".into()),
    };

    assert_eq!(store.load().await.unwrap(), None);
    store.store(&record).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(record));

    let stranger = CredentialStore::new(Some(path), "not hunter2");
    assert!(matches!(
        stranger.load().await,
        Err(ClientError::Persistence(_))
    ));
}
