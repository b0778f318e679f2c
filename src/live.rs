//! Live query layer: owner-scoped subscriptions to typed, sorted lists.
//!
//! Every snapshot from the store is mapped document-by-document into its
//! typed entity and re-sorted client-side (the backend is never asked to
//! order, which keeps it free of composite indexes). Callbacks always receive
//! the full replacement list — never a diff — and callers must treat each
//! delivery as authoritative state.
//!
//! Documents that fail to decode are logged and skipped; they never tear the
//! subscription down. Channel failures are reported through the error
//! callback while the last delivered list stays in force.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::project::Project;
use crate::store::{lock, Doc, DocId, Scope, Store, Subscription};
use crate::task::{Subtask, Task};

/// Sort projects most-recently-created first. A missing creation timestamp
/// decodes as zero and therefore sorts last.
pub fn sort_projects(projects: &mut [Project]) {
    projects.sort_by_key(|p| std::cmp::Reverse(p.created_at_utc));
}

/// Ordering key for tasks and subtasks: ascending `order` where present,
/// ascending creation time otherwise. Since order values are creation-time
/// millis, an item without one takes its creation time as the key it would
/// have been assigned; creation time breaks ties. Deterministic for a given
/// snapshot, and the sort is stable, so equal keys keep their input order.
fn order_key(order: Option<i64>, created_at_utc: i64) -> (i64, i64) {
    (order.unwrap_or(created_at_utc), created_at_utc)
}

/// Sort tasks by their creation-order key.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| order_key(t.order, t.created_at_utc));
}

/// Sort subtasks by their creation-order key.
pub fn sort_subtasks(subtasks: &mut [Subtask]) {
    subtasks.sort_by_key(|s| order_key(s.order, s.created_at_utc));
}

/// Decode every document in a snapshot, skipping (and logging) malformed ones.
fn decode_docs<T>(docs: &[Doc], decode: fn(&Doc) -> Result<T>) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match decode(doc) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!("skipping document in snapshot: {e}");
                None
            }
        })
        .collect()
}

/// Subscribe to the owner's projects, sorted most recent first.
///
/// With no owner signed in, `on_change` is invoked once with an empty list
/// and no store subscription is opened.
pub fn subscribe_projects(
    store: &dyn Store,
    owner: Option<&str>,
    on_change: impl Fn(Vec<Project>) + Send + Sync + 'static,
    on_error: impl Fn(Error) + Send + Sync + 'static,
) -> Subscription {
    let Some(owner) = owner else {
        on_change(Vec::new());
        return Subscription::inert();
    };
    store.subscribe(
        owner,
        Scope::Projects,
        Box::new(move |docs| {
            let mut projects = decode_docs(&docs, Project::from_doc);
            sort_projects(&mut projects);
            on_change(projects);
        }),
        Box::new(move |e| {
            tracing::error!("projects subscription channel error: {e}");
            on_error(e);
        }),
    )
}

/// Subscribe to the owner's tasks, optionally narrowed to one project,
/// sorted by creation order.
pub fn subscribe_tasks(
    store: &dyn Store,
    owner: Option<&str>,
    project_id: Option<DocId>,
    on_change: impl Fn(Vec<Task>) + Send + Sync + 'static,
    on_error: impl Fn(Error) + Send + Sync + 'static,
) -> Subscription {
    let Some(owner) = owner else {
        on_change(Vec::new());
        return Subscription::inert();
    };
    let scope = match project_id {
        Some(project_id) => Scope::ProjectTasks(project_id),
        None => Scope::Tasks,
    };
    store.subscribe(
        owner,
        scope,
        Box::new(move |docs| {
            let mut tasks = decode_docs(&docs, Task::from_doc);
            sort_tasks(&mut tasks);
            on_change(tasks);
        }),
        Box::new(move |e| {
            tracing::error!("tasks subscription channel error: {e}");
            on_error(e);
        }),
    )
}

/// Subscribe to the subtasks nested under one task, sorted by creation order.
pub fn subscribe_subtasks(
    store: &dyn Store,
    owner: Option<&str>,
    task_id: DocId,
    on_change: impl Fn(Vec<Subtask>) + Send + Sync + 'static,
    on_error: impl Fn(Error) + Send + Sync + 'static,
) -> Subscription {
    let Some(owner) = owner else {
        on_change(Vec::new());
        return Subscription::inert();
    };
    store.subscribe(
        owner,
        Scope::Subtasks(task_id),
        Box::new(move |docs| {
            let mut subtasks = decode_docs(&docs, Subtask::from_doc);
            sort_subtasks(&mut subtasks);
            on_change(subtasks);
        }),
        Box::new(move |e| {
            tracing::error!("subtasks subscription channel error: {e}");
            on_error(e);
        }),
    )
}

struct ListState<T> {
    items: Vec<T>,
    loading: bool,
    last_error: Option<Error>,
}

type Resubscribe<T> =
    Box<dyn Fn(Option<&str>, &Arc<Mutex<ListState<T>>>) -> Subscription + Send + Sync>;

/// A reactive list with a loading flag, fed by a live subscription.
///
/// `loading` is true from (re)subscription until the first snapshot arrives;
/// with no owner it settles to false immediately with an empty list. Channel
/// errors are retained in `last_error` while the items keep their
/// last-known-good value.
pub struct LiveList<T> {
    state: Arc<Mutex<ListState<T>>>,
    sub: Mutex<Subscription>,
    resubscribe: Resubscribe<T>,
    /// Session watch guard, when this list follows a [`crate::session::Session`].
    /// Dropped (and thereby deregistered) together with the list.
    watch: Mutex<Option<Subscription>>,
}

impl<T> LiveList<T> {
    fn build(owner: Option<&str>, resubscribe: Resubscribe<T>) -> Self {
        let state = Arc::new(Mutex::new(ListState {
            items: Vec::new(),
            loading: true,
            last_error: None,
        }));
        let sub = resubscribe(owner, &state);
        LiveList {
            state,
            sub: Mutex::new(sub),
            resubscribe,
            watch: Mutex::new(None),
        }
    }

    /// Tie a session watch guard to this list's lifetime.
    pub(crate) fn attach_watch(&self, guard: Subscription) {
        *lock(&self.watch) = Some(guard);
    }

    /// Tear down the current subscription and follow a new owner identity.
    /// Passing `None` (sign-out) flushes the list to empty.
    pub(crate) fn set_owner(&self, owner: Option<&str>) {
        lock(&self.sub).unsubscribe();
        {
            let mut st = lock(&self.state);
            st.items = Vec::new();
            st.loading = true;
            st.last_error = None;
        }
        let sub = (self.resubscribe)(owner, &self.state);
        *lock(&self.sub) = sub;
    }

    /// Stop following the store. Idempotent.
    pub fn unsubscribe(&self) {
        lock(&self.sub).unsubscribe();
    }

    /// True until the first snapshot of the current subscription lands.
    pub fn loading(&self) -> bool {
        lock(&self.state).loading
    }

    /// Most recent subscription channel error, if any.
    pub fn last_error(&self) -> Option<Error> {
        lock(&self.state).last_error.clone()
    }
}

impl<T: Clone> LiveList<T> {
    /// The current list. Authoritative as of the latest snapshot.
    pub fn items(&self) -> Vec<T> {
        lock(&self.state).items.clone()
    }
}

fn feed<T: Send + 'static>(
    state: &Arc<Mutex<ListState<T>>>,
) -> (
    impl Fn(Vec<T>) + Send + Sync + 'static,
    impl Fn(Error) + Send + Sync + 'static,
) {
    let on_change_state = Arc::clone(state);
    let on_error_state = Arc::clone(state);
    (
        move |items| {
            let mut st = lock(&on_change_state);
            st.items = items;
            st.loading = false;
        },
        move |e| {
            lock(&on_error_state).last_error = Some(e);
        },
    )
}

impl LiveList<Project> {
    /// Live list of the owner's projects.
    pub fn projects(store: Arc<dyn Store>, owner: Option<&str>) -> Self {
        LiveList::build(
            owner,
            Box::new(move |owner, state| {
                let (on_change, on_error) = feed(state);
                subscribe_projects(store.as_ref(), owner, on_change, on_error)
            }),
        )
    }
}

impl LiveList<Task> {
    /// Live list of the owner's tasks, optionally narrowed to one project.
    pub fn tasks(store: Arc<dyn Store>, owner: Option<&str>, project_id: Option<DocId>) -> Self {
        LiveList::build(
            owner,
            Box::new(move |owner, state| {
                let (on_change, on_error) = feed(state);
                subscribe_tasks(store.as_ref(), owner, project_id.clone(), on_change, on_error)
            }),
        )
    }
}

impl LiveList<Subtask> {
    /// Live list of the subtasks under one task.
    pub fn subtasks(store: Arc<dyn Store>, owner: Option<&str>, task_id: DocId) -> Self {
        LiveList::build(
            owner,
            Box::new(move |owner, state| {
                let (on_change, on_error) = feed(state);
                subscribe_subtasks(store.as_ref(), owner, task_id.clone(), on_change, on_error)
            }),
        )
    }
}
