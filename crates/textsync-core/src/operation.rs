//! Edit operations and the pure routine that applies one to a text.
//!
//! Positions and lengths count `char`s, so an operation can never split a
//! UTF-8 sequence. [`apply`] takes no lock; callers that share a text must
//! hold the document guard for the whole validate-and-apply step.

use crate::error::{OperationError, Result};
use serde::{Deserialize, Serialize};

/// What an operation does to the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Delete,
    /// Any `type` value other than `insert` or `delete`. It decodes, but
    /// [`apply`] always rejects it.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single edit request, as it travels on the wire.
///
/// Missing fields decode to their zero values and unknown fields are
/// ignored, so `{"type":"insert","position":0,"text":"a"}` is a complete
/// operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    /// Zero-based offset into the document, in characters.
    pub position: i64,
    /// Number of characters to remove. Only meaningful for deletes.
    pub length: i64,
    /// Characters to insert. Only meaningful for inserts.
    pub text: String,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Opaque id of the submitting participant, carried through untouched.
    #[serde(rename = "clientId")]
    pub origin_id: String,
}

impl Operation {
    pub fn insert(position: i64, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            kind: OperationKind::Insert,
            ..Default::default()
        }
    }

    pub fn delete(position: i64, length: i64) -> Self {
        Self {
            position,
            length,
            kind: OperationKind::Delete,
            ..Default::default()
        }
    }

    /// Attribute the operation to a participant.
    pub fn with_origin(mut self, origin_id: impl Into<String>) -> Self {
        self.origin_id = origin_id.into();
        self
    }

    /// Decode an operation from a JSON request body.
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Encode the operation in the same shape it was decoded from.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Apply `op` to `text`, returning the new text.
///
/// `text` is never modified; on error nothing changes.
pub fn apply(text: &str, op: &Operation) -> Result<String> {
    let len = text.chars().count();
    let position = checked_position(op.position, len)?;

    match op.kind {
        OperationKind::Insert => {
            let at = byte_offset(text, position);
            let mut out = String::with_capacity(text.len() + op.text.len());
            out.push_str(&text[..at]);
            out.push_str(&op.text);
            out.push_str(&text[at..]);
            Ok(out)
        }
        OperationKind::Delete => {
            let end = checked_end(op, position, len)?;
            let start = byte_offset(text, position);
            let end = byte_offset(text, end);
            let mut out = String::with_capacity(text.len() - (end - start));
            out.push_str(&text[..start]);
            out.push_str(&text[end..]);
            Ok(out)
        }
        OperationKind::Unknown => Err(OperationError::UnknownKind),
    }
}

fn checked_position(position: i64, len: usize) -> Result<usize> {
    usize::try_from(position)
        .ok()
        .filter(|&p| p <= len)
        .ok_or(OperationError::InvalidPosition { position, len })
}

fn checked_end(op: &Operation, position: usize, len: usize) -> Result<usize> {
    usize::try_from(op.length)
        .ok()
        .and_then(|length| position.checked_add(length))
        .filter(|&end| end <= len)
        .ok_or(OperationError::InvalidLength {
            position: op.position,
            length: op.length,
            len,
        })
}

/// Byte offset of the `index`-th char, or `text.len()` past the end.
fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
