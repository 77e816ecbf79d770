//! Content-addressed retrieval of blocks and states from the node's query service.

use crate::error::Error;
use crate::types::{Block, Root, State};
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Retrieves blocks and state snapshots by root.
///
/// Each call is a single best-effort attempt: an unknown root is a normal
/// [Error::NotFound], a failed connection is [Error::Transport], and neither
/// is retried. Calls are independent and may run concurrently with unrelated
/// fetches.
pub trait Fetcher: Clone + Send + Sync + 'static {
    /// Fetch the block identified by `root`.
    fn block(&self, root: Root) -> impl Future<Output = Result<Block, Error>> + Send;

    /// Fetch the state snapshot identified by `root`.
    fn state(&self, root: Root) -> impl Future<Output = Result<State, Error>> + Send;
}

/// [Fetcher] backed by the node's HTTP query service.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    node: String,
}

impl HttpFetcher {
    /// Create a fetcher targeting the query service at `node` (a `host:port`).
    pub fn new(node: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            node,
        }
    }

    async fn get(&self, kind: &str, root: Root) -> Result<Value, Error> {
        let url = format!("http://{}/beacon/{}?root={}", self.node, kind, root);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            debug!(%root, kind, status = %response.status(), "query returned non-success");
            return Err(Error::NotFound);
        }
        Ok(response.json().await?)
    }
}

impl Fetcher for HttpFetcher {
    async fn block(&self, root: Root) -> Result<Block, Error> {
        let mut body = self.get("block", root).await?;
        let payload = body
            .get_mut("beacon_block")
            .map(Value::take)
            .ok_or_else(|| Error::Decode("missing beacon_block".into()))?;
        Block::decode(payload)
    }

    async fn state(&self, root: Root) -> Result<State, Error> {
        let mut body = self.get("state", root).await?;
        let payload = body
            .get_mut("beacon_state")
            .map(Value::take)
            .ok_or_else(|| Error::Decode("missing beacon_state".into()))?;
        Ok(State::decode(payload))
    }
}
