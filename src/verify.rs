//! One-shot verification of a single block announcement.

use crate::error::Error;
use crate::fetch::Fetcher;
use crate::oracle::Transition;
use crate::report::Reporter;
use crate::types::{Block, ExpectedOutcome, Missing, Verdict};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Re-derives the accept/reject decision for one announced block and
/// reconciles it with the node's.
///
/// Each invocation is independent: nothing is cached or retained across
/// calls, so a failed verification can be retried simply by re-sending the
/// event.
#[derive(Clone)]
pub struct Verifier<F: Fetcher, T: Transition, R: Reporter> {
    fetcher: F,
    transition: T,
    reporter: R,
    deadline: Option<Duration>,
}

impl<F: Fetcher, T: Transition, R: Reporter> Verifier<F, T, R> {
    pub fn new(fetcher: F, transition: T, reporter: R) -> Self {
        Self {
            fetcher,
            transition,
            reporter,
            deadline: None,
        }
    }

    /// Bound each verification with a deadline; expiry yields
    /// [Verdict::Inconclusive] with [Missing::Deadline] rather than hanging
    /// on a stalled fetch or engine call.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Verify one candidate block payload against the node's decision.
    ///
    /// The verdict is emitted to the reporter and returned. Only a payload
    /// that cannot be decoded fails the call itself; fetch failures are
    /// contained as [Verdict::Inconclusive].
    pub async fn verify(
        &self,
        payload: Value,
        expected: ExpectedOutcome,
    ) -> Result<Verdict, Error> {
        let block = Block::decode(payload)?;
        let verdict = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, self.check(&block, expected)).await {
                Ok(verdict) => verdict,
                Err(_) => Verdict::Inconclusive(Missing::Deadline),
            },
            None => self.check(&block, expected).await,
        };
        self.reporter.report(&verdict);
        Ok(verdict)
    }

    async fn check(&self, block: &Block, expected: ExpectedOutcome) -> Verdict {
        // The two fetches are sequential: the pre-state root is only known
        // once the parent block has been loaded.
        let parent = match self.fetcher.block(block.parent_root()).await {
            Ok(parent) => parent,
            Err(err) => {
                debug!(root = %block.parent_root(), ?err, "parent block unavailable");
                return Verdict::Inconclusive(Missing::ParentBlock);
            }
        };
        let pre_state = match self.fetcher.state(parent.state_root()).await {
            Ok(state) => state,
            Err(err) => {
                debug!(root = %parent.state_root(), ?err, "pre-state unavailable");
                return Verdict::Inconclusive(Missing::PreState);
            }
        };
        match (self.transition.apply(&pre_state, block).await, expected) {
            (Ok(_), ExpectedOutcome::Accepted) => Verdict::Confirmed,
            (Ok(_), ExpectedOutcome::Rejected) => Verdict::FalseReject,
            (Err(err), ExpectedOutcome::Rejected) => {
                debug!(?err, "engine rejected block, as did the node");
                Verdict::Confirmed
            }
            (Err(err), ExpectedOutcome::Accepted) => Verdict::FalseAccept {
                detail: err.to_string(),
            },
        }
    }
}
