//! Routing of raw stream messages to verifications.

use crate::fetch::Fetcher;
use crate::oracle::Transition;
use crate::report::Reporter;
use crate::types::ExpectedOutcome;
use crate::verify::Verifier;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Event kind announcing a block the node accepted.
const BLOCK_IMPORTED: &str = "beacon_block_imported";
/// Event kind announcing a block the node rejected.
const BLOCK_REJECTED: &str = "beacon_block_rejected";

/// Envelope carried by each stream message.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    data: Option<EnvelopeData>,
}

#[derive(Deserialize)]
struct EnvelopeData {
    block: Option<Value>,
}

/// Classifies inbound events and spawns one verification task per recognized
/// block announcement.
#[derive(Clone)]
pub struct Dispatcher<F: Fetcher, T: Transition, R: Reporter> {
    verifier: Arc<Verifier<F, T, R>>,
    limiter: Option<Arc<Semaphore>>,
}

impl<F: Fetcher, T: Transition, R: Reporter> Dispatcher<F, T, R> {
    pub fn new(verifier: Verifier<F, T, R>) -> Self {
        Self {
            verifier: Arc::new(verifier),
            limiter: None,
        }
    }

    /// Bound the number of in-flight verifications. Message intake is never
    /// blocked; excess verifications wait on the limiter inside their own
    /// task.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(limit)));
        self
    }

    /// Route one raw stream message. Fire-and-forget: malformed envelopes and
    /// unknown event kinds are dropped without disturbing later messages.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, raw: &str) {
        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                debug!(%err, "dropping malformed envelope");
                return;
            }
        };
        let expected = match envelope.event.as_str() {
            BLOCK_IMPORTED => ExpectedOutcome::Accepted,
            BLOCK_REJECTED => ExpectedOutcome::Rejected,
            other => {
                debug!(event = other, "ignoring unknown event kind");
                return;
            }
        };
        let Some(payload) = envelope.data.and_then(|data| data.block) else {
            debug!(event = %envelope.event, "dropping envelope without block payload");
            return;
        };

        info!(event = %envelope.event, "processing new block from stream");
        let verifier = self.verifier.clone();
        let limiter = self.limiter.clone();
        tokio::spawn(async move {
            let _permit = match &limiter {
                Some(limiter) => limiter.acquire().await.ok(),
                None => None,
            };
            if let Err(err) = verifier.verify(payload, expected).await {
                warn!(%err, "skipping block that could not be decoded");
            }
        });
    }
}
