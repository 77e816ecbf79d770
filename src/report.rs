//! Verdict sinks.

use crate::types::{Missing, Verdict};
use tracing::{info, warn};

/// Receives the verdict of each completed verification.
pub trait Reporter: Clone + Send + Sync + 'static {
    /// Record one verdict.
    fn report(&self, verdict: &Verdict);
}

/// [Reporter] that emits structured log events: agreements at INFO, every
/// discrepancy as a distinct warning identifying which side it favors.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, verdict: &Verdict) {
        match verdict {
            Verdict::Confirmed => info!("confirmed block"),
            Verdict::FalseAccept { detail } => {
                warn!(%detail, "reference engine failed block that node accepted")
            }
            Verdict::FalseReject => {
                warn!("reference engine did not fail block when node did")
            }
            Verdict::Inconclusive(Missing::ParentBlock) => warn!("failed to load block"),
            Verdict::Inconclusive(Missing::PreState) => warn!("failed to load state"),
            Verdict::Inconclusive(Missing::Deadline) => warn!("verification timed out"),
        }
    }
}
