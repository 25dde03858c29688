//! Encryption service collaborator.
//!
//! The platform's KMS-backed encryption service is an external dependency:
//! this module defines the seam the SDK calls through, plus a deterministic
//! in-memory implementation for tests. No cryptographic primitives live in
//! this repository.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Decrypted secure content reference: the descriptor an SCR ciphertext
/// resolves to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureContentReference {
    /// Download location of the referenced binary content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    /// Size of the referenced content in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// MIME type of the referenced content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// An SCR-bearing field: ciphertext on the wire, a decrypted descriptor
/// after the transform engine has visited it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrField {
    /// Decrypted descriptor.
    Decrypted(SecureContentReference),
    /// JWE ciphertext as received.
    Encrypted(String),
}

impl ScrField {
    /// The ciphertext, if this field has not been decrypted yet.
    pub fn as_encrypted(&self) -> Option<&str> {
        match self {
            Self::Encrypted(ciphertext) => Some(ciphertext),
            Self::Decrypted(_) => None,
        }
    }

    /// The decrypted descriptor, if available.
    pub fn as_decrypted(&self) -> Option<&SecureContentReference> {
        match self {
            Self::Decrypted(scr) => Some(scr),
            Self::Encrypted(_) => None,
        }
    }
}

/// External encryption/KMS collaborator.
///
/// Every method is an asynchronous suspension point and may fail; callers
/// decide whether a failure degrades (conversation decryption) or propagates
/// (board content codec).
#[async_trait]
pub trait CryptoService: Send + Sync {
    /// Decrypt a text ciphertext under the key referenced by `key_url`.
    async fn decrypt_text(&self, key_url: &str, ciphertext: &str) -> Result<String>;

    /// Encrypt plaintext under the key referenced by `key_url`.
    async fn encrypt_text(&self, key_url: &str, plaintext: &str) -> Result<String>;

    /// Decrypt an SCR ciphertext into its content descriptor.
    async fn decrypt_scr(&self, key_url: &str, ciphertext: &str) -> Result<SecureContentReference>;

    /// Encrypt a content descriptor into SCR ciphertext.
    async fn encrypt_scr(&self, key_url: &str, scr: &SecureContentReference) -> Result<String>;
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockCryptoService;

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! Deterministic in-memory [`CryptoService`] for tests.
    //!
    //! "Ciphertext" is `enc:<base64(plaintext)>`, so encryption round-trips
    //! without key material and malformed input fails decryption naturally.
    //! Every call is logged for traversal-count assertions.

    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    use super::{CryptoService, SecureContentReference};
    use crate::error::{Error, Result};

    const CIPHERTEXT_PREFIX: &str = "enc:";

    /// One logged call into the mock service.
    #[derive(Debug, Clone)]
    pub struct CryptoCall {
        pub operation: String,
        pub key_url: String,
        pub input: String,
    }

    /// Mock encryption service with reversible framing and failure injection.
    #[derive(Clone, Default)]
    pub struct MockCryptoService {
        call_log: Arc<Mutex<Vec<CryptoCall>>>,
        poisoned: Arc<Mutex<HashSet<String>>>,
    }

    impl MockCryptoService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Produce the mock ciphertext for a plaintext, for building fixtures.
        pub fn seal(plaintext: &str) -> String {
            format!("{CIPHERTEXT_PREFIX}{}", BASE64.encode(plaintext))
        }

        /// Produce the mock ciphertext for a content descriptor.
        pub fn seal_scr(scr: &SecureContentReference) -> String {
            Self::seal(&serde_json::to_string(scr).expect("SCR serializes"))
        }

        /// Make every future decryption of this exact ciphertext fail.
        pub fn poison(&self, ciphertext: &str) {
            self.poisoned.lock().unwrap().insert(ciphertext.to_string());
        }

        /// All logged calls, in order.
        pub fn calls(&self) -> Vec<CryptoCall> {
            self.call_log.lock().unwrap().clone()
        }

        /// Number of calls logged for one operation.
        pub fn call_count(&self, operation: &str) -> usize {
            self.call_log
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.operation == operation)
                .count()
        }

        /// Total number of logged calls.
        pub fn total_calls(&self) -> usize {
            self.call_log.lock().unwrap().len()
        }

        fn log(&self, operation: &str, key_url: &str, input: &str) {
            self.call_log.lock().unwrap().push(CryptoCall {
                operation: operation.to_string(),
                key_url: key_url.to_string(),
                input: input.to_string(),
            });
        }

        fn unseal(&self, ciphertext: &str) -> Result<String> {
            if self.poisoned.lock().unwrap().contains(ciphertext) {
                return Err(Error::Crypto("key rejected by KMS".to_string()));
            }
            let encoded = ciphertext
                .strip_prefix(CIPHERTEXT_PREFIX)
                .ok_or_else(|| Error::Crypto("malformed ciphertext".to_string()))?;
            let bytes = BASE64
                .decode(encoded)
                .map_err(|e| Error::Crypto(format!("invalid ciphertext encoding: {e}")))?;
            String::from_utf8(bytes).map_err(|e| Error::Crypto(format!("invalid plaintext: {e}")))
        }
    }

    #[async_trait]
    impl CryptoService for MockCryptoService {
        async fn decrypt_text(&self, key_url: &str, ciphertext: &str) -> Result<String> {
            self.log("decrypt_text", key_url, ciphertext);
            self.unseal(ciphertext)
        }

        async fn encrypt_text(&self, key_url: &str, plaintext: &str) -> Result<String> {
            self.log("encrypt_text", key_url, plaintext);
            Ok(Self::seal(plaintext))
        }

        async fn decrypt_scr(
            &self,
            key_url: &str,
            ciphertext: &str,
        ) -> Result<SecureContentReference> {
            self.log("decrypt_scr", key_url, ciphertext);
            let json = self.unseal(ciphertext)?;
            serde_json::from_str(&json)
                .map_err(|e| Error::Crypto(format!("SCR payload is not a descriptor: {e}")))
        }

        async fn encrypt_scr(&self, key_url: &str, scr: &SecureContentReference) -> Result<String> {
            self.log("encrypt_scr", key_url, &format!("{scr:?}"));
            Ok(Self::seal_scr(scr))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn mock_round_trips_text() {
        let crypto = MockCryptoService::new();
        let sealed = crypto.encrypt_text("kms://keys/1", "hello").await.unwrap();
        let plain = crypto.decrypt_text("kms://keys/1", &sealed).await.unwrap();
        assert_eq!(plain, "hello");
    }

    #[tokio::test]
    async fn mock_round_trips_scr() {
        let crypto = MockCryptoService::new();
        let scr = SecureContentReference {
            loc: Some("https://files.confab.io/blobs/42".to_string()),
            size: Some(1024),
            mime_type: Some("image/png".to_string()),
        };
        let sealed = crypto.encrypt_scr("kms://keys/1", &scr).await.unwrap();
        let opened = crypto.decrypt_scr("kms://keys/1", &sealed).await.unwrap();
        assert_eq!(opened, scr);
    }

    #[tokio::test]
    async fn malformed_ciphertext_fails() {
        let crypto = MockCryptoService::new();
        let err = crypto
            .decrypt_text("kms://keys/1", "not-a-ciphertext")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }

    #[tokio::test]
    async fn poisoned_ciphertext_fails() {
        let crypto = MockCryptoService::new();
        let sealed = MockCryptoService::seal("secret");
        crypto.poison(&sealed);
        assert!(crypto.decrypt_text("kms://keys/1", &sealed).await.is_err());
    }

    #[tokio::test]
    async fn call_log_counts_operations() {
        let crypto = MockCryptoService::new();
        crypto.encrypt_text("k", "a").await.unwrap();
        let sealed = MockCryptoService::seal("b");
        crypto.decrypt_text("k", &sealed).await.unwrap();
        crypto.decrypt_text("k", &sealed).await.unwrap();

        assert_eq!(crypto.call_count("encrypt_text"), 1);
        assert_eq!(crypto.call_count("decrypt_text"), 2);
        assert_eq!(crypto.total_calls(), 3);
    }

    #[test]
    fn scr_field_deserializes_ciphertext_and_descriptor() {
        let encrypted: ScrField = serde_json::from_str("\"enc:abcd\"").unwrap();
        assert_eq!(encrypted.as_encrypted(), Some("enc:abcd"));

        let decrypted: ScrField =
            serde_json::from_str(r#"{"loc": "https://files.confab.io/blobs/1"}"#).unwrap();
        assert_eq!(
            decrypted.as_decrypted().and_then(|scr| scr.loc.as_deref()),
            Some("https://files.confab.io/blobs/1")
        );
    }
}
