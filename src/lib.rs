//! # taskdeck — task management core
//!
//! An owner-scoped task management library: projects, tasks and subtasks over
//! a live document store, with grouped atomic writes and client-side view
//! projection. This crate is the data layer a presentation layer sits on;
//! it defines no CLI, no rendering and no auth flow of its own.
//!
//! ## Key pieces
//!
//! - **Entities** ([`Project`], [`Task`], [`Subtask`]): typed forms with
//!   validation and wire conversion. Timestamps are UTC epoch milliseconds.
//! - **Store** ([`Store`], [`MemoryStore`]): an owner-namespaced document
//!   store with per-scope live snapshots and all-or-nothing grouped writes.
//! - **Live queries** ([`LiveList`], `subscribe_*`): full-replacement
//!   snapshots mapped to typed, client-side-sorted lists. No diffing, no
//!   local authoritative cache — every list is rebuildable from the next
//!   snapshot.
//! - **Mutations** (`mutate`, or via [`Client`]): the count invariant
//!   (a project's `task_count` always equals its live tasks) and cascade
//!   invariant (subtasks never outlive their task, tasks never outlive their
//!   project) are maintained by grouped writes, never by local patching.
//! - **Views** ([`View`], `views`): filter the live task stream
//!   (all / today / upcoming / by-project) and partition by status.
//! - **Session** ([`Session`], [`Client`]): the resolved owner identity;
//!   everything is inert and empty without one, and sign-out flushes every
//!   live list.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use taskdeck::{Client, MemoryStore, ProjectDraft, Session};
//!
//! let session = Arc::new(Session::new());
//! session.sign_in("alice");
//! let client = Client::new(Arc::new(MemoryStore::new()), Arc::clone(&session));
//!
//! let projects = client.projects();
//! client.create_project(&ProjectDraft {
//!     name: "Launch".into(),
//!     color: "#10b981".into(),
//!     description: None,
//! })?;
//! assert_eq!(projects.items().len(), 1);
//! # Ok::<(), taskdeck::Error>(())
//! ```

pub mod client;
pub mod error;
pub mod fields;
pub mod live;
pub mod memory;
pub mod mutate;
pub mod project;
pub mod session;
pub mod store;
pub mod task;
pub mod views;

pub use client::Client;
pub use error::{Error, Result};
pub use fields::{Priority, Status, View};
pub use live::LiveList;
pub use memory::MemoryStore;
pub use project::{Project, ProjectDraft, ProjectPatch};
pub use session::Session;
pub use store::{Doc, DocId, Scope, Store, Subscription, WriteOp};
pub use task::{Subtask, SubtaskDraft, SubtaskPatch, Task, TaskDraft, TaskPatch};
pub use views::{filter_tasks, group_by_status, StatusGroups, ViewCounts};
