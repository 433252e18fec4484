//! # textsync-core
//!
//! The data model and the guarded document behind textsync.
//!
//! This crate provides:
//! - [`Operation`], the wire-level insert/delete request
//! - [`operation::apply`], the pure validate-and-apply routine
//! - [`Document`], the single shared text buffer and its mutex
//!
//! ## Example
//!
//! ```rust
//! use textsync_core::{Document, Operation};
//!
//! let doc = Document::with_text("Hello World");
//! let text = doc.apply_operation(&Operation::insert(5, ",")).unwrap();
//! assert_eq!(text, "Hello, World");
//!
//! // Out-of-range edits are rejected and change nothing.
//! assert!(doc.apply_operation(&Operation::delete(0, 100)).is_err());
//! assert_eq!(doc.current_text(), "Hello, World");
//! ```

pub mod document;
pub mod error;
pub mod operation;

pub use document::{Document, DocumentGuard, StagedEdit};
pub use error::{OperationError, Result};
pub use operation::{Operation, OperationKind};
