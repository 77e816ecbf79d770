//! Domain objects shared across the verification pipeline.

use crate::error::Error;
use serde_json::Value;
use std::fmt;

/// Number of bytes in a content root.
pub const ROOT_LENGTH: usize = 32;

/// A content hash uniquely identifying a block or state object, used as the
/// lookup key for fetches.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Root([u8; ROOT_LENGTH]);

impl Root {
    pub const fn new(bytes: [u8; ROOT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses a root from a hexadecimal string, tolerating a `0x` prefix.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if !hex.is_ascii() || hex.len() != ROOT_LENGTH * 2 {
            return None;
        }
        let mut bytes = [0u8; ROOT_LENGTH];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A proposed chain extension, decoded from an opaque wire payload.
///
/// Only the two roots are interpreted here; the rest of the payload is
/// carried untouched for the reference engine.
#[derive(Clone, Debug)]
pub struct Block {
    parent_root: Root,
    state_root: Root,
    raw: Value,
}

impl Block {
    /// Decodes a block from its wire payload.
    pub fn decode(payload: Value) -> Result<Self, Error> {
        let parent_root = extract_root(&payload, "parent_root")?;
        let state_root = extract_root(&payload, "state_root")?;
        Ok(Self {
            parent_root,
            state_root,
            raw: payload,
        })
    }

    /// Root of the predecessor block.
    pub fn parent_root(&self) -> Root {
        self.parent_root
    }

    /// Root of the state this block claims to produce.
    pub fn state_root(&self) -> Root {
        self.state_root
    }

    /// The full wire payload, as received.
    pub fn payload(&self) -> &Value {
        &self.raw
    }
}

fn extract_root(payload: &Value, field: &str) -> Result<Root, Error> {
    let text = payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Decode(format!("missing {field}")))?;
    Root::from_hex(text).ok_or_else(|| Error::Decode(format!("invalid {field}: {text}")))
}

/// A snapshot of chain state, opaque to the watchdog and used only as the
/// reference engine's pre-state input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State(Value);

impl State {
    pub fn decode(payload: Value) -> Self {
        Self(payload)
    }

    pub fn payload(&self) -> &Value {
        &self.0
    }
}

/// The node's decision for an announced block, implied by the event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedOutcome {
    /// The node imported the block and expects the transition to succeed.
    Accepted,
    /// The node rejected the block and expects the transition to fail.
    Rejected,
}

/// Why a verification could not reach a judgment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Missing {
    /// The parent block could not be fetched.
    ParentBlock,
    /// The parent's post-state could not be fetched.
    PreState,
    /// The verification deadline expired.
    Deadline,
}

/// The reconciliation of the node's decision against the reference engine's
/// independent result for the same block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Node and reference engine agree.
    Confirmed,
    /// The node accepted a block the reference engine rejects.
    FalseAccept {
        /// The engine's failure detail, preserved for the report.
        detail: String,
    },
    /// The node rejected a block the reference engine accepts.
    FalseReject,
    /// A dependency was unavailable; no comparison was possible.
    Inconclusive(Missing),
}
