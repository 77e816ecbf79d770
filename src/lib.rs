//! Cross-validate a beacon node's block-import decisions against a reference
//! state-transition engine.
//!
//! The watchdog subscribes to a node's block-import event stream and, for
//! each announced block, independently replays the reference state transition
//! on top of the block's ancestry: fetch the parent block, fetch the parent's
//! post-state, and apply the transition. The node's decision (imported or
//! rejected) is then reconciled with the engine's result to one of four
//! verdicts: confirmed, false accept, false reject, or inconclusive (a
//! dependency could not be loaded).
//!
//! Pipeline: [listen](listener::listen) → [Dispatcher](dispatch::Dispatcher)
//! → [Verifier](verify::Verifier) → ([Fetcher](fetch::Fetcher) ×2,
//! [Transition](oracle::Transition)) → [Verdict](types::Verdict) →
//! [Reporter](report::Reporter).
//!
//! This is an observation tool for protocol testing, not a consensus
//! participant: it keeps no state, joins no network, and evaluates each
//! announcement independently.

pub mod dispatch;
mod error;
pub mod fetch;
pub mod listener;
pub mod oracle;
pub mod report;
pub mod types;
pub mod verify;

pub use error::Error;
