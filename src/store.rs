//! Storage interface: documents, scopes, grouped writes and live subscriptions.
//!
//! The backend is modelled as an owner-namespaced document store. Each owner
//! holds a `projects` collection and a `tasks` collection, with subtasks
//! nested under their owning task. The store supports per-scope live
//! subscriptions delivering full replacement snapshots, and grouped writes
//! committed as a single all-or-nothing unit.
//!
//! Ownership is structural: every call names the owner, and no document
//! carries (or is checked against) an owner field of its own.

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::error::{Error, Result};

/// Opaque, store-assigned document identifier.
pub type DocId = String;

/// Raw field map of a document, as stored on the wire.
pub type Fields = serde_json::Map<String, Value>;

/// A raw document: id plus its field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    pub id: DocId,
    pub fields: Fields,
}

impl Doc {
    /// Fetch a string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Fetch an integer field. JSON numbers are decoded as `i64`.
    pub fn int_field(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(Value::as_i64)
    }

    /// Fetch a boolean field.
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    /// Fetch a string field that the schema requires, or fail decoding.
    pub fn require_str(&self, name: &'static str) -> Result<String> {
        self.str_field(name).map(str::to_owned).ok_or_else(|| Error::Decode {
            id: self.id.clone(),
            reason: format!("missing field `{name}`"),
        })
    }
}

/// A subscribable slice of an owner's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every project of the owner.
    Projects,
    /// Every task of the owner.
    Tasks,
    /// Tasks referencing one project.
    ProjectTasks(DocId),
    /// Subtasks nested under one task.
    Subtasks(DocId),
}

/// Target collection of a single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    Projects,
    Tasks,
    /// The subtask collection nested under `task_id`.
    Subtasks { task_id: DocId },
}

/// One document mutation inside a grouped write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert a new document. Fails the batch if the id already exists.
    Create {
        collection: Collection,
        id: DocId,
        fields: Fields,
    },
    /// Field-level merge into an existing document. Fails the batch if the
    /// document does not exist. Fields not named in the map are left alone.
    Merge {
        collection: Collection,
        id: DocId,
        fields: Fields,
    },
    /// Atomically add `delta` to a numeric field of an existing document,
    /// treating a missing or non-numeric field as zero. Fails the batch if
    /// the document does not exist.
    Increment {
        collection: Collection,
        id: DocId,
        field: String,
        delta: i64,
    },
    /// Remove an existing document. Fails the batch if it does not exist.
    Delete { collection: Collection, id: DocId },
}

impl WriteOp {
    /// The collection this write lands in.
    pub fn collection(&self) -> &Collection {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Merge { collection, .. }
            | WriteOp::Increment { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// Snapshot callback: receives the full current document list for the scope.
pub type SnapshotFn = Box<dyn Fn(Vec<Doc>) + Send + Sync>;

/// Error callback for subscription channel failures.
pub type ErrorFn = Box<dyn Fn(Error) + Send + Sync>;

/// Owner-namespaced document store with grouped writes and live snapshots.
pub trait Store: Send + Sync {
    /// Allocate a fresh document id. Ids are opaque; callers must not parse
    /// them.
    fn new_id(&self) -> DocId;

    /// One-shot read of every document currently matching `scope`.
    fn list(&self, owner: &str, scope: &Scope) -> Result<Vec<Doc>>;

    /// Commit a grouped write. The batch is applied in order and is
    /// all-or-nothing: if any operation is invalid (missing target, duplicate
    /// create) the whole batch is rejected and nothing is applied.
    fn commit(&self, owner: &str, batch: Vec<WriteOp>) -> Result<()>;

    /// Open a live subscription on `scope`. The current snapshot is delivered
    /// immediately, then again after every commit that touches the scope.
    /// Channel failures go to `on_error` and leave the subscription open.
    fn subscribe(
        &self,
        owner: &str,
        scope: Scope,
        on_snapshot: SnapshotFn,
        on_error: ErrorFn,
    ) -> Subscription;
}

/// Handle for an open live subscription.
///
/// [`Subscription::unsubscribe`] synchronously stops further snapshot
/// delivery; calling it again is a no-op. Dropping the handle unsubscribes
/// as well.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Wrap a teardown closure.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A subscription with nothing to tear down (used when no owner is
    /// signed in and no channel was opened).
    pub fn inert() -> Self {
        Subscription {
            cancel: Mutex::new(None),
        }
    }

    /// Stop snapshot delivery. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(cancel) = lock(&self.cancel).take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = lock(&self.cancel).is_some();
        f.debug_struct("Subscription").field("active", &active).finish()
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn unsubscribe_runs_teardown_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let sub = Subscription::new(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        sub.unsubscribe();
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_unsubscribes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        drop(Subscription::new(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inert_subscription_is_harmless() {
        let sub = Subscription::inert();
        sub.unsubscribe();
        sub.unsubscribe();
    }

    #[test]
    fn doc_field_accessors_decode_json_values() {
        let mut fields = Fields::new();
        fields.insert("title".into(), Value::from("Write spec"));
        fields.insert("order".into(), Value::from(42_i64));
        fields.insert("completed".into(), Value::from(true));
        let doc = Doc {
            id: "d1".into(),
            fields,
        };
        assert_eq!(doc.str_field("title"), Some("Write spec"));
        assert_eq!(doc.int_field("order"), Some(42));
        assert_eq!(doc.bool_field("completed"), Some(true));
        assert_eq!(doc.str_field("missing"), None);
    }
}
