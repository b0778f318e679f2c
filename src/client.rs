//! Owner-bound facade over the store, the session and the live query layer.
//!
//! `Client` is what a presentation layer holds: it hands out live lists that
//! follow the signed-in identity (sign-out flushes them to empty) and exposes
//! every mutation, failing fast with [`Error::Unauthenticated`] before any
//! store call when no owner is resolved.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::live::LiveList;
use crate::mutate;
use crate::project::{Project, ProjectDraft, ProjectPatch};
use crate::session::Session;
use crate::store::{DocId, Store};
use crate::task::{Subtask, SubtaskDraft, SubtaskPatch, Task, TaskDraft, TaskPatch};

/// Facade binding a store to a session.
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn Store>,
    session: Arc<Session>,
}

impl Client {
    pub fn new(store: Arc<dyn Store>, session: Arc<Session>) -> Self {
        Client { store, session }
    }

    /// The session this client follows.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn owner(&self) -> Result<String> {
        self.session.owner().ok_or(Error::Unauthenticated)
    }

    /// Wire a live list to the session so identity changes re-subscribe it.
    fn follow_session<T: Send + Sync + 'static>(&self, list: LiveList<T>) -> Arc<LiveList<T>> {
        let list = Arc::new(list);
        let weak = Arc::downgrade(&list);
        let guard = self.session.watch(move |owner| {
            if let Some(list) = weak.upgrade() {
                list.set_owner(owner);
            }
        });
        list.attach_watch(guard);
        list
    }

    /// Live list of the owner's projects, most recent first.
    pub fn projects(&self) -> Arc<LiveList<Project>> {
        let list = LiveList::projects(Arc::clone(&self.store), self.session.owner().as_deref());
        self.follow_session(list)
    }

    /// Live list of the owner's tasks, optionally narrowed to one project.
    pub fn tasks(&self, project_id: Option<DocId>) -> Arc<LiveList<Task>> {
        let list = LiveList::tasks(
            Arc::clone(&self.store),
            self.session.owner().as_deref(),
            project_id,
        );
        self.follow_session(list)
    }

    /// Live list of the subtasks under one task.
    pub fn subtasks(&self, task_id: DocId) -> Arc<LiveList<Subtask>> {
        let list = LiveList::subtasks(
            Arc::clone(&self.store),
            self.session.owner().as_deref(),
            task_id,
        );
        self.follow_session(list)
    }

    /// Create a project. Returns the new id.
    pub fn create_project(&self, draft: &ProjectDraft) -> Result<DocId> {
        mutate::create_project(self.store.as_ref(), &self.owner()?, draft)
    }

    /// Partially update a project.
    pub fn update_project(&self, project_id: &str, patch: &ProjectPatch) -> Result<()> {
        mutate::update_project(self.store.as_ref(), &self.owner()?, project_id, patch)
    }

    /// Delete a project and cascade to its tasks and their subtasks.
    pub fn delete_project(&self, project_id: &str) -> Result<()> {
        mutate::delete_project(self.store.as_ref(), &self.owner()?, project_id)
    }

    /// Create a task under its project. Returns the new id.
    pub fn create_task(&self, draft: &TaskDraft) -> Result<DocId> {
        mutate::create_task(self.store.as_ref(), &self.owner()?, draft)
    }

    /// Partially update a task.
    pub fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<()> {
        mutate::update_task(self.store.as_ref(), &self.owner()?, task_id, patch)
    }

    /// Delete a task and its subtasks. `project_id` names the parent whose
    /// task count is decremented; callers resolve it from the live list.
    pub fn delete_task(&self, task_id: &str, project_id: &str) -> Result<()> {
        mutate::delete_task(self.store.as_ref(), &self.owner()?, task_id, project_id)
    }

    /// Create a subtask under a task. Returns the new id.
    pub fn create_subtask(&self, task_id: &str, draft: &SubtaskDraft) -> Result<DocId> {
        mutate::create_subtask(self.store.as_ref(), &self.owner()?, task_id, draft)
    }

    /// Partially update a subtask.
    pub fn update_subtask(
        &self,
        task_id: &str,
        subtask_id: &str,
        patch: &SubtaskPatch,
    ) -> Result<()> {
        mutate::update_subtask(self.store.as_ref(), &self.owner()?, task_id, subtask_id, patch)
    }

    /// Delete a single subtask.
    pub fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> Result<()> {
        mutate::delete_subtask(self.store.as_ref(), &self.owner()?, task_id, subtask_id)
    }
}
