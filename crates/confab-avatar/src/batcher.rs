//! Avatar URL batch handler.
//!
//! Coalesces individual `(uuid, size)` avatar lookups into one
//! `POST profiles/urls` call. Requests for the same uuid are merged into a
//! single record with a deduplicated size list; the response is indexed by
//! uuid and size on the way back out.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use confab_core::{ApiClient, BatchHandler, ItemDisposition, Result};

/// One caller's avatar lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvatarRequest {
    pub uuid: Uuid,
    /// Requested edge length in pixels.
    pub size: u32,
}

/// A resolved avatar URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarUrl {
    pub uuid: Uuid,
    /// Size actually served. May differ from the requested size when the
    /// service substitutes the closest one it has.
    pub size: u32,
    pub url: String,
    pub has_default_avatar: bool,
}

/// One record of the shaped request body: a uuid with every size requested
/// for it in this batch, deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarUrlEntry {
    pub uuid: Uuid,
    pub sizes: Vec<u32>,
}

/// One entry of the response body, keyed by uuid and then by size.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUrlRecord {
    pub size: u32,
    pub url: String,
    #[serde(default)]
    pub default_avatar: bool,
}

/// Response body: uuid → size (as a decimal string key) → record.
pub type AvatarUrlResponse = HashMap<Uuid, HashMap<String, AvatarUrlRecord>>;

/// Batch handler for the avatar URL endpoint.
pub struct AvatarUrlBatcher {
    api: ApiClient,
}

impl AvatarUrlBatcher {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl BatchHandler for AvatarUrlBatcher {
    type Item = AvatarRequest;
    type Payload = Vec<AvatarUrlEntry>;
    type Response = AvatarUrlResponse;
    type Output = AvatarUrl;

    fn fingerprint_request(&self, item: &AvatarRequest) -> String {
        format!("{}-{}", item.uuid, item.size)
    }

    fn prepare_request(&self, queue: &[AvatarRequest]) -> Vec<AvatarUrlEntry> {
        let mut order: Vec<Uuid> = Vec::new();
        let mut sizes_by_uuid: HashMap<Uuid, Vec<u32>> = HashMap::new();

        for item in queue {
            let sizes = sizes_by_uuid.entry(item.uuid).or_insert_with(|| {
                order.push(item.uuid);
                Vec::new()
            });
            if !sizes.contains(&item.size) {
                sizes.push(item.size);
            }
        }

        order
            .into_iter()
            .map(|uuid| AvatarUrlEntry {
                uuid,
                sizes: sizes_by_uuid.remove(&uuid).unwrap_or_default(),
            })
            .collect()
    }

    async fn submit(&self, payload: Vec<AvatarUrlEntry>) -> Result<AvatarUrlResponse> {
        self.api.post_json("profiles/urls", &payload).await
    }

    fn accept_item(
        &self,
        item: &AvatarRequest,
        response: &AvatarUrlResponse,
    ) -> ItemDisposition<AvatarUrl> {
        let record = response
            .get(&item.uuid)
            .and_then(|by_size| by_size.get(&item.size.to_string()));

        match record {
            None => ItemDisposition::Failed(format!(
                "failed to retrieve avatar for {}-{}",
                item.uuid, item.size
            )),
            Some(record) => {
                let output = AvatarUrl {
                    uuid: item.uuid,
                    size: record.size,
                    url: record.url.clone(),
                    has_default_avatar: record.default_avatar,
                };
                if record.size != item.size {
                    ItemDisposition::Substituted {
                        output,
                        warning: format!(
                            "substituted size \"{}\" for \"{}\"",
                            record.size, item.size
                        ),
                    }
                } else {
                    ItemDisposition::Success(output)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uuid: Uuid, size: u32) -> AvatarRequest {
        AvatarRequest { uuid, size }
    }

    #[test]
    fn fingerprint_is_uuid_dash_size() {
        let batcher = AvatarUrlBatcher::new(ApiClient::new("http://localhost"));
        let uuid = Uuid::new_v4();
        assert_eq!(
            batcher.fingerprint_request(&request(uuid, 80)),
            format!("{uuid}-80")
        );
    }

    #[test]
    fn prepare_request_groups_by_uuid_and_dedupes_sizes() {
        let batcher = AvatarUrlBatcher::new(ApiClient::new("http://localhost"));
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        let payload = batcher.prepare_request(&[
            request(u1, 40),
            request(u2, 80),
            request(u1, 80),
            request(u1, 40),
        ]);

        assert_eq!(
            payload,
            vec![
                AvatarUrlEntry {
                    uuid: u1,
                    sizes: vec![40, 80],
                },
                AvatarUrlEntry {
                    uuid: u2,
                    sizes: vec![80],
                },
            ]
        );
    }

    #[test]
    fn accept_item_fails_on_absent_entry() {
        let batcher = AvatarUrlBatcher::new(ApiClient::new("http://localhost"));
        let response = AvatarUrlResponse::new();

        match batcher.accept_item(&request(Uuid::new_v4(), 80), &response) {
            ItemDisposition::Failed(reason) => assert!(reason.contains("failed to retrieve")),
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn accept_item_flags_size_substitution() {
        let batcher = AvatarUrlBatcher::new(ApiClient::new("http://localhost"));
        let uuid = Uuid::new_v4();

        let mut by_size = HashMap::new();
        by_size.insert(
            "80".to_string(),
            AvatarUrlRecord {
                size: 110,
                url: "https://cdn.confab.io/a/110".to_string(),
                default_avatar: false,
            },
        );
        let mut response = AvatarUrlResponse::new();
        response.insert(uuid, by_size);

        match batcher.accept_item(&request(uuid, 80), &response) {
            ItemDisposition::Substituted { output, warning } => {
                assert_eq!(output.size, 110, "substituted size is reported");
                assert!(warning.contains("substituted size \"110\" for \"80\""));
            }
            other => panic!("Expected Substituted, got {other:?}"),
        }
    }
}
