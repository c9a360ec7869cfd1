//! Mock metadata resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{parse_link, CatalogError, MetadataResolver, ResolvedCollection};

/// Mock implementation of the MetadataResolver trait.
///
/// Links must still parse; unknown but valid links answer with a 404
/// `ApiError`.
#[derive(Debug, Default)]
pub struct MockResolver {
    collections: Arc<RwLock<HashMap<String, ResolvedCollection>>>,
    fail_auth: Arc<RwLock<bool>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `link` with `collection`.
    pub async fn add_collection(&self, link: impl Into<String>, collection: ResolvedCollection) {
        self.collections.write().await.insert(link.into(), collection);
    }

    /// Make every call fail authentication.
    pub async fn set_fail_auth(&self, fail: bool) {
        *self.fail_auth.write().await = fail;
    }

    /// Links resolved so far.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl MetadataResolver for MockResolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, link: &str) -> Result<ResolvedCollection, CatalogError> {
        self.calls.write().await.push(link.to_string());

        if *self.fail_auth.read().await {
            return Err(CatalogError::AuthFailed("mock auth failure".to_string()));
        }
        parse_link(link)?;

        self.collections
            .read()
            .await
            .get(link)
            .cloned()
            .ok_or_else(|| CatalogError::ApiError {
                status: 404,
                message: "not found".to_string(),
            })
    }
}
