//! Mutation layer: create/update/delete for every entity as grouped writes.
//!
//! Any mutation touching more than one document is submitted as a single
//! grouped write so the denormalised task count and the cascade invariants
//! never observe a partial state. No local state is patched here: visible
//! lists change only when the live query layer receives the next snapshot.
//!
//! Cascading deletes enumerate children with a read immediately before the
//! grouped delete. The read is not covered by the batch's atomicity, so a
//! child created between enumeration and commit survives the cascade. This
//! matches the reference behaviour; stronger guarantees would need
//! server-side cascades.

use chrono::Utc;
use serde_json::Value;

use crate::error::Result;
use crate::project::{ProjectDraft, ProjectPatch};
use crate::store::{Collection, DocId, Scope, Store, WriteOp};
use crate::task::{SubtaskDraft, SubtaskPatch, TaskDraft, TaskPatch};

/// Current UTC time in epoch milliseconds. Creation-time millis double as
/// the `order` value for new tasks and subtasks; two items created in the
/// same instant may tie, which is accepted.
pub fn now_utc_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Create a project with a zero task count. Returns the new id.
pub fn create_project(store: &dyn Store, owner: &str, draft: &ProjectDraft) -> Result<DocId> {
    draft.validate()?;
    let id = store.new_id();
    let batch = vec![WriteOp::Create {
        collection: Collection::Projects,
        id: id.clone(),
        fields: draft.to_fields(now_utc_ms()),
    }];
    store.commit(owner, batch)?;
    Ok(id)
}

/// Merge the patch's fields into a project and bump its updated timestamp.
pub fn update_project(
    store: &dyn Store,
    owner: &str,
    project_id: &str,
    patch: &ProjectPatch,
) -> Result<()> {
    patch.validate()?;
    let mut fields = patch.to_fields();
    fields.insert("updated_at_utc".into(), Value::from(now_utc_ms()));
    store.commit(
        owner,
        vec![WriteOp::Merge {
            collection: Collection::Projects,
            id: project_id.to_string(),
            fields,
        }],
    )
}

/// Delete a project, every task under it and every subtask under each of
/// those tasks, in one grouped write. No task count adjustment is needed
/// since the parent goes with them.
pub fn delete_project(store: &dyn Store, owner: &str, project_id: &str) -> Result<()> {
    let tasks = store.list(owner, &Scope::ProjectTasks(project_id.to_string()))?;
    let mut batch = vec![WriteOp::Delete {
        collection: Collection::Projects,
        id: project_id.to_string(),
    }];
    for task in &tasks {
        for subtask in store.list(owner, &Scope::Subtasks(task.id.clone()))? {
            batch.push(WriteOp::Delete {
                collection: Collection::Subtasks {
                    task_id: task.id.clone(),
                },
                id: subtask.id,
            });
        }
        batch.push(WriteOp::Delete {
            collection: Collection::Tasks,
            id: task.id.clone(),
        });
    }
    store.commit(owner, batch)
}

/// Create a task under its project and increment the project's task count,
/// as one grouped write. Returns the new task id.
///
/// The order value is the creation time in milliseconds; it is assigned once
/// and stays stable unless explicitly reordered.
pub fn create_task(store: &dyn Store, owner: &str, draft: &TaskDraft) -> Result<DocId> {
    draft.validate()?;
    let id = store.new_id();
    let now = now_utc_ms();
    let mut project_bump = serde_json::Map::new();
    project_bump.insert("updated_at_utc".into(), Value::from(now));
    let batch = vec![
        WriteOp::Create {
            collection: Collection::Tasks,
            id: id.clone(),
            fields: draft.to_fields(now, now),
        },
        WriteOp::Increment {
            collection: Collection::Projects,
            id: draft.project_id.clone(),
            field: "task_count".into(),
            delta: 1,
        },
        WriteOp::Merge {
            collection: Collection::Projects,
            id: draft.project_id.clone(),
            fields: project_bump,
        },
    ];
    store.commit(owner, batch)?;
    Ok(id)
}

/// Merge the patch's fields into a task and bump its updated timestamp.
pub fn update_task(store: &dyn Store, owner: &str, task_id: &str, patch: &TaskPatch) -> Result<()> {
    patch.validate()?;
    let mut fields = patch.to_fields();
    fields.insert("updated_at_utc".into(), Value::from(now_utc_ms()));
    store.commit(
        owner,
        vec![WriteOp::Merge {
            collection: Collection::Tasks,
            id: task_id.to_string(),
            fields,
        }],
    )
}

/// Delete a task and its subtasks and decrement the parent project's task
/// count, as one grouped write.
pub fn delete_task(store: &dyn Store, owner: &str, task_id: &str, project_id: &str) -> Result<()> {
    let subtasks = store.list(owner, &Scope::Subtasks(task_id.to_string()))?;
    let mut batch = vec![WriteOp::Delete {
        collection: Collection::Tasks,
        id: task_id.to_string(),
    }];
    for subtask in subtasks {
        batch.push(WriteOp::Delete {
            collection: Collection::Subtasks {
                task_id: task_id.to_string(),
            },
            id: subtask.id,
        });
    }
    let mut project_bump = serde_json::Map::new();
    project_bump.insert("updated_at_utc".into(), Value::from(now_utc_ms()));
    batch.push(WriteOp::Increment {
        collection: Collection::Projects,
        id: project_id.to_string(),
        field: "task_count".into(),
        delta: -1,
    });
    batch.push(WriteOp::Merge {
        collection: Collection::Projects,
        id: project_id.to_string(),
        fields: project_bump,
    });
    store.commit(owner, batch)
}

/// Create a subtask under a task. Returns the new id.
pub fn create_subtask(
    store: &dyn Store,
    owner: &str,
    task_id: &str,
    draft: &SubtaskDraft,
) -> Result<DocId> {
    draft.validate()?;
    let id = store.new_id();
    let now = now_utc_ms();
    store.commit(
        owner,
        vec![WriteOp::Create {
            collection: Collection::Subtasks {
                task_id: task_id.to_string(),
            },
            id: id.clone(),
            fields: draft.to_fields(now, now),
        }],
    )?;
    Ok(id)
}

/// Merge the patch's fields into a subtask.
pub fn update_subtask(
    store: &dyn Store,
    owner: &str,
    task_id: &str,
    subtask_id: &str,
    patch: &SubtaskPatch,
) -> Result<()> {
    patch.validate()?;
    store.commit(
        owner,
        vec![WriteOp::Merge {
            collection: Collection::Subtasks {
                task_id: task_id.to_string(),
            },
            id: subtask_id.to_string(),
            fields: patch.to_fields(),
        }],
    )
}

/// Delete a single subtask.
pub fn delete_subtask(store: &dyn Store, owner: &str, task_id: &str, subtask_id: &str) -> Result<()> {
    store.commit(
        owner,
        vec![WriteOp::Delete {
            collection: Collection::Subtasks {
                task_id: task_id.to_string(),
            },
            id: subtask_id.to_string(),
        }],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fields::{Priority, Status};
    use crate::memory::MemoryStore;
    use crate::project::Project;
    use crate::task::Task;

    const OWNER: &str = "alice";

    fn project_draft(name: &str) -> ProjectDraft {
        ProjectDraft {
            name: name.into(),
            color: "#10b981".into(),
            description: None,
        }
    }

    fn task_draft(project_id: &str, title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            description: None,
            project_id: project_id.into(),
            status: Status::Todo,
            priority: Priority::Medium,
            due_utc: None,
        }
    }

    fn project(store: &MemoryStore, id: &str) -> Project {
        let docs = store.list(OWNER, &Scope::Projects).expect("list");
        let doc = docs.iter().find(|d| d.id == id).expect("project doc");
        Project::from_doc(doc).expect("decode")
    }

    fn task_ids(store: &MemoryStore) -> Vec<String> {
        store
            .list(OWNER, &Scope::Tasks)
            .expect("list")
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    #[test]
    fn task_count_tracks_creates_and_deletes_exactly() {
        let store = MemoryStore::new();
        let pid = create_project(&store, OWNER, &project_draft("Launch")).expect("project");
        assert_eq!(project(&store, &pid).task_count, 0);

        let t1 = create_task(&store, OWNER, &task_draft(&pid, "one")).expect("t1");
        assert_eq!(project(&store, &pid).task_count, 1);

        let _t2 = create_task(&store, OWNER, &task_draft(&pid, "two")).expect("t2");
        assert_eq!(project(&store, &pid).task_count, 2);

        delete_task(&store, OWNER, &t1, &pid).expect("delete");
        assert_eq!(project(&store, &pid).task_count, 1);
        assert_eq!(task_ids(&store).len(), 1);
    }

    #[test]
    fn create_task_under_missing_project_applies_nothing() {
        let store = MemoryStore::new();
        let err = create_task(&store, OWNER, &task_draft("p-missing", "orphan")).unwrap_err();
        assert_eq!(err, Error::not_found("project", "p-missing"));
        assert!(task_ids(&store).is_empty());
    }

    #[test]
    fn delete_project_cascades_to_tasks_and_subtasks() {
        let store = MemoryStore::new();
        let pid = create_project(&store, OWNER, &project_draft("Launch")).expect("project");
        let other = create_project(&store, OWNER, &project_draft("Keep")).expect("project");

        let t1 = create_task(&store, OWNER, &task_draft(&pid, "one")).expect("t1");
        let _s1 = create_subtask(
            &store,
            OWNER,
            &t1,
            &SubtaskDraft {
                title: "nested".into(),
                completed: false,
            },
        )
        .expect("s1");
        let keep_task = create_task(&store, OWNER, &task_draft(&other, "survivor")).expect("t2");

        delete_project(&store, OWNER, &pid).expect("cascade");

        let projects = store.list(OWNER, &Scope::Projects).expect("list");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, other);
        assert_eq!(task_ids(&store), vec![keep_task]);
        assert!(store
            .list(OWNER, &Scope::Subtasks(t1.clone()))
            .expect("list")
            .is_empty());

        // Deleting an already-deleted project reports not-found, not a crash.
        let err = delete_project(&store, OWNER, &pid).unwrap_err();
        assert_eq!(err, Error::not_found("project", pid));
    }

    #[test]
    fn update_task_merges_fields_and_bumps_updated_at() {
        let store = MemoryStore::new();
        let pid = create_project(&store, OWNER, &project_draft("Launch")).expect("project");
        let tid = create_task(&store, OWNER, &task_draft(&pid, "Write spec")).expect("task");

        update_task(
            &store,
            OWNER,
            &tid,
            &TaskPatch {
                status: Some(Status::Done),
                due_utc: Some(42),
                ..TaskPatch::default()
            },
        )
        .expect("update");

        let docs = store.list(OWNER, &Scope::Tasks).expect("list");
        let t = Task::from_doc(&docs[0]).expect("decode");
        assert_eq!(t.status, Status::Done);
        assert_eq!(t.due_utc, Some(42));
        assert_eq!(t.title, "Write spec");
        assert!(t.updated_at_utc >= t.created_at_utc);

        update_task(
            &store,
            OWNER,
            &tid,
            &TaskPatch {
                clear_due: true,
                ..TaskPatch::default()
            },
        )
        .expect("clear due");
        let docs = store.list(OWNER, &Scope::Tasks).expect("list");
        assert_eq!(Task::from_doc(&docs[0]).expect("decode").due_utc, None);
    }

    #[test]
    fn subtask_lifecycle() {
        let store = MemoryStore::new();
        let pid = create_project(&store, OWNER, &project_draft("Launch")).expect("project");
        let tid = create_task(&store, OWNER, &task_draft(&pid, "parent")).expect("task");

        let sid = create_subtask(
            &store,
            OWNER,
            &tid,
            &SubtaskDraft {
                title: "step".into(),
                completed: false,
            },
        )
        .expect("create");

        update_subtask(
            &store,
            OWNER,
            &tid,
            &sid,
            &SubtaskPatch {
                completed: Some(true),
                ..SubtaskPatch::default()
            },
        )
        .expect("update");
        let docs = store.list(OWNER, &Scope::Subtasks(tid.clone())).expect("list");
        assert_eq!(docs[0].bool_field("completed"), Some(true));

        delete_subtask(&store, OWNER, &tid, &sid).expect("delete");
        assert!(store
            .list(OWNER, &Scope::Subtasks(tid))
            .expect("list")
            .is_empty());
    }

    #[test]
    fn validation_failures_never_reach_the_store() {
        let store = MemoryStore::new();
        let mut draft = project_draft(" ");
        let err = create_project(&store, OWNER, &draft).unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "name", .. }));

        draft = project_draft("ok");
        draft.color = "teal".into();
        assert!(matches!(
            create_project(&store, OWNER, &draft).unwrap_err(),
            Error::Invalid { field: "color", .. }
        ));
        assert!(store.list(OWNER, &Scope::Projects).expect("list").is_empty());
    }

    #[test]
    fn write_failures_propagate_and_apply_nothing() {
        let store = MemoryStore::new();
        let pid = create_project(&store, OWNER, &project_draft("Launch")).expect("project");
        store.inject_commit_error(Error::Backend("permission denied".into()));
        let err = create_task(&store, OWNER, &task_draft(&pid, "blocked")).unwrap_err();
        assert_eq!(err, Error::Backend("permission denied".into()));
        assert!(task_ids(&store).is_empty());
        assert_eq!(project(&store, &pid).task_count, 0);
    }
}
