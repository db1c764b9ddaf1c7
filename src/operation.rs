//! Resource operations exposed to a workflow host.
//!
//! Each operation has a display name, a `resource:action` value and a `call`
//! taking the item index of the host's calling convention. Credentials and
//! the client are passed in explicitly.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::{Credentials, Error, OaClient, Result};

#[async_trait]
pub trait ResourceOperation: Send + Sync {
    /// Display name shown to the user
    fn name(&self) -> &'static str;

    /// Stable identifier, `resource:action`
    fn value(&self) -> &'static str;

    async fn call(
        &self,
        client: &OaClient,
        credentials: &Credentials,
        index: usize,
    ) -> Result<Value>;
}

/// `auth:getAccessToken`: returns `{"accessToken": "..."}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GetAccessToken;

#[async_trait]
impl ResourceOperation for GetAccessToken {
    fn name(&self) -> &'static str {
        "获取AccessToken"
    }

    fn value(&self) -> &'static str {
        "auth:getAccessToken"
    }

    async fn call(
        &self,
        client: &OaClient,
        credentials: &Credentials,
        _index: usize,
    ) -> Result<Value> {
        let token = client.fetch_access_token(credentials).await?;
        Ok(json!({ "accessToken": token }))
    }
}

/// All operations, looked up by value.
pub struct OperationRegistry {
    operations: Vec<Box<dyn ResourceOperation>>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::empty().with(GetAccessToken)
    }
}

impl OperationRegistry {
    pub fn empty() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    pub fn with(mut self, op: impl ResourceOperation + 'static) -> Self {
        self.operations.push(Box::new(op));
        self
    }

    pub fn find(&self, value: &str) -> Option<&dyn ResourceOperation> {
        self.operations
            .iter()
            .find(|op| op.value() == value)
            .map(|op| op.as_ref())
    }

    /// `(name, value)` pairs in registration order
    pub fn options(&self) -> Vec<(&'static str, &'static str)> {
        self.operations
            .iter()
            .map(|op| (op.name(), op.value()))
            .collect()
    }

    #[instrument(level = "debug", skip(self, client, credentials))]
    pub async fn execute(
        &self,
        value: &str,
        client: &OaClient,
        credentials: &Credentials,
        index: usize,
    ) -> Result<Value> {
        let op = self
            .find(value)
            .ok_or_else(|| Error::UnknownOperation(value.to_string()))?;
        debug!(operation = op.name(), "executing");
        op.call(client, credentials, index).await
    }
}
