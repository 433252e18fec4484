//! The shared document and its exclusivity guarantee.
//!
//! A [`Document`] owns one text buffer behind a single mutex. Every read and
//! every validate-and-apply step happens while that mutex is held, so no
//! reader ever sees a half-applied operation and no two operations are
//! validated against the same text.
//!
//! Callers that need to do more work between validation and commit (the
//! server encodes the broadcast payload there, then fans out before letting
//! go) take the lock explicitly with [`Document::lock`] and drive
//! [`DocumentGuard::stage`] / [`DocumentGuard::commit`] themselves.

use crate::error::{OperationError, Result};
use crate::operation::{self, Operation};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
struct DocumentState {
    id: u64,
    text: String,
    revision: u64,
}

/// The single shared text buffer.
#[derive(Debug)]
pub struct Document {
    state: Mutex<DocumentState>,
}

impl Document {
    /// An empty document at revision 0.
    pub fn new() -> Self {
        Self::with_text(String::new())
    }

    /// A document seeded with `text`, still at revision 0.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(DocumentState {
                id: NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed),
                text: text.into(),
                revision: 0,
            }),
        }
    }

    /// Take the exclusivity guarantee. It is released when the guard drops.
    pub fn lock(&self) -> DocumentGuard<'_> {
        DocumentGuard {
            state: self.state.lock(),
        }
    }

    /// Validate and apply `op`, returning the full text afterwards.
    ///
    /// On error the document is left exactly as it was.
    pub fn apply_operation(&self, op: &Operation) -> Result<String> {
        let mut doc = self.lock();
        let staged = doc.stage(op)?;
        doc.commit(staged)?;
        Ok(doc.text().to_owned())
    }

    /// A snapshot of the current text.
    pub fn current_text(&self) -> String {
        self.lock().text().to_owned()
    }

    /// Number of operations accepted so far.
    pub fn revision(&self) -> u64 {
        self.lock().revision()
    }

    /// Length of the text in characters.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().text().is_empty()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to a [`Document`].
pub struct DocumentGuard<'a> {
    state: MutexGuard<'a, DocumentState>,
}

/// The result of validating an operation, not yet visible to anyone.
#[derive(Debug)]
#[must_use = "a staged edit does nothing until it is committed"]
pub struct StagedEdit {
    document: u64,
    text: String,
    base_revision: u64,
}

impl StagedEdit {
    /// The text the document will hold once this edit is committed.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl DocumentGuard<'_> {
    pub fn text(&self) -> &str {
        &self.state.text
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    pub fn len(&self) -> usize {
        self.state.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.state.text.is_empty()
    }

    /// Validate `op` against the current text without changing it.
    pub fn stage(&self, op: &Operation) -> Result<StagedEdit> {
        let text = operation::apply(&self.state.text, op)?;
        Ok(StagedEdit {
            document: self.state.id,
            text,
            base_revision: self.state.revision,
        })
    }

    /// Make a staged edit visible and return the new revision.
    ///
    /// Fails without touching the text if `staged` came from another
    /// document or the document has moved on since it was staged.
    pub fn commit(&mut self, staged: StagedEdit) -> Result<u64> {
        if staged.document != self.state.id {
            return Err(OperationError::ForeignEdit);
        }
        if staged.base_revision != self.state.revision {
            return Err(OperationError::StaleEdit {
                staged: staged.base_revision,
                current: self.state.revision,
            });
        }
        self.state.text = staged.text;
        self.state.revision += 1;
        Ok(self.state.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationError;
    use crate::operation::OperationKind;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_empty() {
        let doc = Document::new();
        assert_eq!(doc.current_text(), "");
        assert_eq!(doc.revision(), 0);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_insert_then_delete() {
        let doc = Document::with_text("Hello World");

        let text = doc.apply_operation(&Operation::insert(5, ",")).unwrap();
        assert_eq!(text, "Hello, World");

        let text = doc.apply_operation(&Operation::delete(5, 1)).unwrap();
        assert_eq!(text, "Hello World");
        assert_eq!(doc.revision(), 2);
    }

    #[test]
    fn test_rejected_operations_leave_document_unchanged() {
        let doc = Document::with_text("Hello");

        let unknown = Operation {
            text: "Test".to_string(),
            kind: OperationKind::Unknown,
            ..Default::default()
        };

        assert!(doc.apply_operation(&Operation::insert(-1, "Test")).is_err());
        assert!(doc.apply_operation(&Operation::delete(0, 10)).is_err());
        assert_eq!(
            doc.apply_operation(&unknown),
            Err(OperationError::UnknownKind)
        );

        assert_eq!(doc.current_text(), "Hello");
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_current_text_is_stable_without_writes() {
        let doc = Document::with_text("same");
        assert_eq!(doc.current_text(), doc.current_text());
    }

    #[test]
    fn test_staged_edit_invisible_until_commit() {
        let doc = Document::with_text("ab");
        let mut guard = doc.lock();

        let staged = guard.stage(&Operation::insert(1, "-")).unwrap();
        assert_eq!(staged.text(), "a-b");
        assert_eq!(guard.text(), "ab");

        assert_eq!(guard.commit(staged), Ok(1));
        assert_eq!(guard.text(), "a-b");
    }

    #[test]
    fn test_dropping_staged_edit_discards_it() {
        let doc = Document::with_text("ab");
        {
            let guard = doc.lock();
            let _ = guard.stage(&Operation::delete(0, 2)).unwrap();
        }
        assert_eq!(doc.current_text(), "ab");
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_stale_staged_edit_is_refused() {
        let doc = Document::with_text("ab");
        let staged = doc.lock().stage(&Operation::insert(2, "X")).unwrap();

        doc.apply_operation(&Operation::insert(0, "Y")).unwrap();

        assert_eq!(
            doc.lock().commit(staged),
            Err(OperationError::StaleEdit {
                staged: 0,
                current: 1
            })
        );
        assert_eq!(doc.current_text(), "Yab");
        assert_eq!(doc.revision(), 1);
    }

    #[test]
    fn test_staged_edit_cannot_cross_documents() {
        let source = Document::with_text("short");
        let target = Document::with_text("a much longer text");
        let staged = source.lock().stage(&Operation::insert(0, "!")).unwrap();

        assert_eq!(target.lock().commit(staged), Err(OperationError::ForeignEdit));
        assert_eq!(target.current_text(), "a much longer text");
        assert_eq!(target.revision(), 0);
        assert_eq!(source.current_text(), "short");
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        let doc = Arc::new(Document::new());
        let threads = 8;
        let per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let doc = Arc::clone(&doc);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        // Read length and insert under the same guard so the
                        // append position is always valid.
                        let mut guard = doc.lock();
                        let end = guard.len() as i64;
                        let staged = guard.stage(&Operation::insert(end, "x")).unwrap();
                        guard.commit(staged).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(doc.len(), threads * per_thread);
        assert_eq!(doc.revision(), (threads * per_thread) as u64);
    }
}
