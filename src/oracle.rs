//! The reference state-transition boundary.

use crate::error::Error;
use crate::types::{Block, State};
use serde_json::{json, Value};
use std::future::Future;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Applies the reference state-transition function.
///
/// A pure-function boundary: deterministic given its inputs, no network I/O.
/// Any failure it raises means the reference implementation rejected the
/// block, never that the watchdog itself faulted.
pub trait Transition: Clone + Send + Sync + 'static {
    /// Apply `block` on top of `pre_state`, producing the post-state.
    fn apply(
        &self,
        pre_state: &State,
        block: &Block,
    ) -> impl Future<Output = Result<State, Error>> + Send;
}

/// Configuration for the external reference engine.
///
/// Built once before the listener starts and immutable for the process
/// lifetime.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Command executed for each transition.
    pub command: String,
    /// Arguments passed to the command (preset selection, config paths).
    pub args: Vec<String>,
}

/// [Transition] implemented by an external reference-engine process.
///
/// The engine receives `{"pre_state": …, "block": …}` as JSON on stdin and
/// prints the post-state as JSON on stdout. A nonzero exit, unparseable
/// output, or any process failure means the engine rejected the block.
#[derive(Clone)]
pub struct EngineOracle {
    config: EngineConfig,
}

impl EngineOracle {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    async fn run(&self, input: &Value) -> Result<Value, String> {
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn engine: {e}"))?;
        if let Some(mut stdin) = child.stdin.take() {
            let bytes = serde_json::to_vec(input).map_err(|e| e.to_string())?;
            stdin
                .write_all(&bytes)
                .await
                .map_err(|e| format!("failed to write engine input: {e}"))?;
            // Dropping stdin closes the pipe so the engine sees EOF.
        }
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("engine did not exit: {e}"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "engine exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("unparseable engine output: {e}"))
    }
}

impl Transition for EngineOracle {
    async fn apply(&self, pre_state: &State, block: &Block) -> Result<State, Error> {
        let input = json!({
            "pre_state": pre_state.payload(),
            "block": block.payload(),
        });
        match self.run(&input).await {
            Ok(post) => Ok(State::decode(post)),
            Err(detail) => Err(Error::Transition(detail)),
        }
    }
}
