//! In-process document store with live snapshot listeners.
//!
//! `MemoryStore` is the reference [`Store`] implementation: it keeps every
//! owner's collections in memory, applies grouped writes all-or-nothing, and
//! notifies matching subscriptions synchronously after each commit. It doubles
//! as the test fake — commit failures and subscription channel errors can be
//! injected — and can persist its contents to a JSON file using an atomic
//! write (temp file + rename).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{
    lock, Collection, Doc, DocId, ErrorFn, Fields, Scope, SnapshotFn, Store, Subscription,
    WriteOp,
};

/// One owner's collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OwnerSpace {
    projects: BTreeMap<DocId, Fields>,
    tasks: BTreeMap<DocId, Fields>,
    /// Subtask collections keyed by owning task id.
    subtasks: BTreeMap<DocId, BTreeMap<DocId, Fields>>,
}

impl OwnerSpace {
    fn snapshot(&self, scope: &Scope) -> Vec<Doc> {
        let to_doc = |(id, fields): (&DocId, &Fields)| Doc {
            id: id.clone(),
            fields: fields.clone(),
        };
        match scope {
            Scope::Projects => self.projects.iter().map(to_doc).collect(),
            Scope::Tasks => self.tasks.iter().map(to_doc).collect(),
            Scope::ProjectTasks(project_id) => self
                .tasks
                .iter()
                .filter(|(_, fields)| {
                    fields.get("project_id").and_then(serde_json::Value::as_str)
                        == Some(project_id.as_str())
                })
                .map(to_doc)
                .collect(),
            Scope::Subtasks(task_id) => self
                .subtasks
                .get(task_id)
                .map(|m| m.iter().map(to_doc).collect())
                .unwrap_or_default(),
        }
    }

    fn apply(&mut self, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::Create {
                collection,
                id,
                fields,
            } => {
                let map = self.collection_mut(collection);
                if map.contains_key(id) {
                    return Err(Error::Backend(format!(
                        "create of existing document: {id}"
                    )));
                }
                map.insert(id.clone(), fields.clone());
            }
            WriteOp::Merge {
                collection,
                id,
                fields,
            } => {
                let kind = entity_kind(collection);
                let map = self.collection_mut(collection);
                let doc = map
                    .get_mut(id)
                    .ok_or_else(|| Error::not_found(kind, id.clone()))?;
                doc.extend(fields.clone());
            }
            WriteOp::Increment {
                collection,
                id,
                field,
                delta,
            } => {
                let kind = entity_kind(collection);
                let map = self.collection_mut(collection);
                let doc = map
                    .get_mut(id)
                    .ok_or_else(|| Error::not_found(kind, id.clone()))?;
                let current = doc
                    .get(field.as_str())
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or(0);
                doc.insert(field.clone(), serde_json::Value::from(current + delta));
            }
            WriteOp::Delete { collection, id } => {
                let kind = entity_kind(collection);
                let map = self.collection_mut(collection);
                if map.remove(id).is_none() {
                    return Err(Error::not_found(kind, id.clone()));
                }
            }
        }
        Ok(())
    }

    fn collection_mut(&mut self, collection: &Collection) -> &mut BTreeMap<DocId, Fields> {
        match collection {
            Collection::Projects => &mut self.projects,
            Collection::Tasks => &mut self.tasks,
            Collection::Subtasks { task_id } => {
                self.subtasks.entry(task_id.clone()).or_default()
            }
        }
    }
}

fn entity_kind(collection: &Collection) -> &'static str {
    match collection {
        Collection::Projects => "project",
        Collection::Tasks => "task",
        Collection::Subtasks { .. } => "subtask",
    }
}

/// Does a write to `collection` feed a subscription on `scope`?
fn touches(collection: &Collection, scope: &Scope) -> bool {
    match (collection, scope) {
        (Collection::Projects, Scope::Projects) => true,
        (Collection::Tasks, Scope::Tasks | Scope::ProjectTasks(_)) => true,
        (Collection::Subtasks { task_id }, Scope::Subtasks(sub_task)) => task_id == sub_task,
        _ => false,
    }
}

struct Listener {
    id: u64,
    owner: String,
    scope: Scope,
    on_snapshot: SnapshotFn,
    on_error: ErrorFn,
    active: Arc<AtomicBool>,
}

/// In-process [`Store`] with synchronous live snapshots.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, OwnerSpace>>,
    listeners: Arc<Mutex<Vec<Arc<Listener>>>>,
    next_seq: AtomicU64,
    fail_next_commit: Mutex<Option<Error>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Load a store from a JSON file, starting empty if the file is missing
    /// or unreadable.
    pub fn load(path: &Path) -> Self {
        let store = MemoryStore::new();
        if !path.exists() {
            return store;
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(owners) => *lock(&store.data) = owners,
                Err(e) => {
                    tracing::warn!("store file parse failed, starting empty: {e}");
                }
            },
            Err(e) => {
                tracing::warn!("store file read failed, starting empty: {e}");
            }
        }
        store
    }

    /// Save the store to a JSON file using an atomic write (temp + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let data = serde_json::to_string_pretty(&*lock(&self.data))
            .map_err(std::io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Reject the next commit with `err`, applying nothing. Simulates the
    /// backend refusing a grouped write.
    pub fn inject_commit_error(&self, err: Error) {
        *lock(&self.fail_next_commit) = Some(err);
    }

    /// Report a channel failure to every open subscription of `owner`.
    /// Subscriptions stay open and keep their last-known-good data.
    pub fn emit_subscription_error(&self, owner: &str, err: &Error) {
        let targets: Vec<Arc<Listener>> = lock(&self.listeners)
            .iter()
            .filter(|l| l.owner == owner && l.active.load(Ordering::SeqCst))
            .map(Arc::clone)
            .collect();
        for listener in targets {
            (listener.on_error)(err.clone());
        }
    }
}

impl Store for MemoryStore {
    fn new_id(&self) -> DocId {
        let n = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("doc-{n}")
    }

    fn list(&self, owner: &str, scope: &Scope) -> Result<Vec<Doc>> {
        let data = lock(&self.data);
        Ok(data
            .get(owner)
            .map(|space| space.snapshot(scope))
            .unwrap_or_default())
    }

    fn commit(&self, owner: &str, batch: Vec<WriteOp>) -> Result<()> {
        if let Some(err) = lock(&self.fail_next_commit).take() {
            return Err(err);
        }

        // Apply against a scratch copy so a mid-batch failure leaves the
        // committed state untouched.
        let notify: Vec<(Arc<Listener>, Vec<Doc>)>;
        {
            let mut data = lock(&self.data);
            let mut space = data.get(owner).cloned().unwrap_or_default();
            for op in &batch {
                space.apply(op)?;
            }
            data.insert(owner.to_string(), space);

            let space = &data[owner];
            notify = lock(&self.listeners)
                .iter()
                .filter(|l| {
                    l.owner == owner
                        && l.active.load(Ordering::SeqCst)
                        && batch.iter().any(|op| touches(op.collection(), &l.scope))
                })
                .map(|l| (Arc::clone(l), space.snapshot(&l.scope)))
                .collect();
        }

        // Callbacks run outside the data lock; they may re-enter the store.
        for (listener, docs) in notify {
            if listener.active.load(Ordering::SeqCst) {
                (listener.on_snapshot)(docs);
            }
        }
        Ok(())
    }

    fn subscribe(
        &self,
        owner: &str,
        scope: Scope,
        on_snapshot: SnapshotFn,
        on_error: ErrorFn,
    ) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        let listener = Arc::new(Listener {
            id: self.next_seq.fetch_add(1, Ordering::SeqCst) + 1,
            owner: owner.to_string(),
            scope: scope.clone(),
            on_snapshot,
            on_error,
            active: Arc::clone(&active),
        });

        // Register while holding the data lock so a racing commit cannot
        // deliver a newer snapshot before the initial one below.
        let initial = {
            let data = lock(&self.data);
            lock(&self.listeners).push(Arc::clone(&listener));
            data.get(owner)
                .map(|space| space.snapshot(&scope))
                .unwrap_or_default()
        };
        (listener.on_snapshot)(initial);

        let listeners = Arc::clone(&self.listeners);
        let id = listener.id;
        Subscription::new(move || {
            active.store(false, Ordering::SeqCst);
            lock(&listeners).retain(|l| l.id != id);
        })
    }
}
