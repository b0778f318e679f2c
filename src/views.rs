//! View projection: filter the live task list by the selected view, then
//! group by status for presentation.
//!
//! Filtering is purely client-side over whatever task stream the caller
//! holds; re-filtering an "all tasks" stream and subscribing to a narrower
//! project scope both satisfy the same semantics.

use chrono::{DateTime, Duration, Local, NaiveDate};

use crate::fields::{Status, View};
use crate::store::DocId;
use crate::task::Task;

/// The local calendar date a UTC-millisecond instant falls on, if it is
/// representable.
fn local_date(utc_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(utc_ms).map(|dt| dt.with_timezone(&Local).date_naive())
}

/// Does the task belong to `view` at instant `now`?
///
/// Tasks without a due date never match `Today` or `Upcoming` and always
/// match `All`. `Project` ignores due dates entirely; with no selected
/// project it matches everything.
pub fn task_in_view(
    task: &Task,
    view: View,
    selected_project: Option<&DocId>,
    now: DateTime<Local>,
) -> bool {
    match view {
        View::All => true,
        View::Today => match task.due_utc.and_then(local_date) {
            Some(due) => due == now.date_naive(),
            None => false,
        },
        View::Upcoming => match task.due_utc {
            Some(due_ms) => {
                let horizon = now + Duration::days(7);
                due_ms > now.timestamp_millis() && due_ms <= horizon.timestamp_millis()
            }
            None => false,
        },
        View::Project => match selected_project {
            Some(project_id) => &task.project_id == project_id,
            None => true,
        },
    }
}

/// Filter a task list down to the selected view, preserving input order.
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    view: View,
    selected_project: Option<&DocId>,
    now: DateTime<Local>,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| task_in_view(t, view, selected_project, now))
        .collect()
}

/// Convenience wrapper over [`filter_tasks`] at the current instant.
pub fn filter_tasks_now<'a>(
    tasks: &'a [Task],
    view: View,
    selected_project: Option<&DocId>,
) -> Vec<&'a Task> {
    filter_tasks(tasks, view, selected_project, Local::now())
}

/// A filtered task list partitioned into the three status buckets. Every
/// task lands in exactly one bucket; relative order from the input list is
/// preserved within each.
#[derive(Debug, Default)]
pub struct StatusGroups<'a> {
    pub todo: Vec<&'a Task>,
    pub in_progress: Vec<&'a Task>,
    pub done: Vec<&'a Task>,
}

impl StatusGroups<'_> {
    /// Total across all three buckets; equals the filtered list's length.
    pub fn total(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }
}

/// Partition an already-filtered list by status.
pub fn group_by_status<'a>(tasks: &[&'a Task]) -> StatusGroups<'a> {
    let mut groups = StatusGroups::default();
    for &task in tasks {
        match task.status {
            Status::Todo => groups.todo.push(task),
            Status::InProgress => groups.in_progress.push(task),
            Status::Done => groups.done.push(task),
        }
    }
    groups
}

/// Per-view task totals for sidebar badges. Pure function of the list; the
/// counts always agree with what [`filter_tasks`] would render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewCounts {
    pub all: usize,
    pub today: usize,
    pub upcoming: usize,
}

/// Count the tasks each date-based view would show at instant `now`.
pub fn view_counts(tasks: &[Task], now: DateTime<Local>) -> ViewCounts {
    ViewCounts {
        all: tasks.len(),
        today: filter_tasks(tasks, View::Today, None, now).len(),
        upcoming: filter_tasks(tasks, View::Upcoming, None, now).len(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::fields::Priority;

    fn task(id: &str, status: Status, due_utc: Option<i64>) -> Task {
        Task {
            id: id.into(),
            title: format!("task {id}"),
            description: None,
            project_id: "p1".into(),
            status,
            priority: Priority::Medium,
            due_utc,
            order: None,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .expect("unambiguous local time")
    }

    fn ms(dt: DateTime<Local>) -> i64 {
        dt.timestamp_millis()
    }

    #[test]
    fn today_view_covers_the_local_day_half_open() {
        let now = at(2026, 3, 10, 12, 0);
        let tasks = vec![
            task("start", Status::Todo, Some(ms(at(2026, 3, 10, 0, 0)))),
            task("evening", Status::Todo, Some(ms(at(2026, 3, 10, 23, 59)))),
            task("tomorrow", Status::Todo, Some(ms(at(2026, 3, 11, 0, 0)))),
            task("yesterday", Status::Todo, Some(ms(at(2026, 3, 9, 23, 59)))),
            task("undated", Status::Todo, None),
        ];
        let ids: Vec<_> = filter_tasks(&tasks, View::Today, None, now)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["start", "evening"]);
    }

    #[test]
    fn upcoming_view_is_exclusive_of_now_inclusive_of_day_seven() {
        let now = at(2026, 3, 10, 12, 0);
        let tasks = vec![
            task("now", Status::Todo, Some(ms(now))),
            task("soon", Status::Todo, Some(ms(now) + 1_000)),
            task("week", Status::Todo, Some(ms(at(2026, 3, 17, 12, 0)))),
            task("beyond", Status::Todo, Some(ms(at(2026, 3, 17, 12, 1)))),
            task("undated", Status::Todo, None),
        ];
        let ids: Vec<_> = filter_tasks(&tasks, View::Upcoming, None, now)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["soon", "week"]);
    }

    #[test]
    fn project_view_ignores_due_dates_and_matches_reference() {
        let now = at(2026, 3, 10, 12, 0);
        let mut other = task("other", Status::Todo, None);
        other.project_id = "p2".into();
        let tasks = vec![task("mine", Status::Todo, None), other];

        let selected: DocId = "p1".into();
        let ids: Vec<_> = filter_tasks(&tasks, View::Project, Some(&selected), now)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["mine"]);

        // No selection falls back to the full list.
        assert_eq!(filter_tasks(&tasks, View::Project, None, now).len(), 2);
    }

    #[test]
    fn grouping_partitions_without_loss_or_duplication() {
        let tasks = vec![
            task("a", Status::Done, None),
            task("b", Status::Todo, None),
            task("c", Status::InProgress, None),
            task("d", Status::Todo, None),
            task("e", Status::Done, None),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();
        let groups = group_by_status(&refs);

        assert_eq!(groups.total(), tasks.len());
        let todo: Vec<_> = groups.todo.iter().map(|t| t.id.as_str()).collect();
        let done: Vec<_> = groups.done.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(todo, vec!["b", "d"]);
        assert_eq!(groups.in_progress.len(), 1);
        assert_eq!(done, vec!["a", "e"]);
    }

    #[test]
    fn view_counts_agree_with_the_filtered_lists() {
        let now = at(2026, 3, 10, 12, 0);
        let tasks = vec![
            task("today", Status::Todo, Some(ms(at(2026, 3, 10, 18, 0)))),
            task("upcoming", Status::Todo, Some(ms(at(2026, 3, 12, 9, 0)))),
            task("undated", Status::Todo, None),
        ];
        let counts = view_counts(&tasks, now);
        assert_eq!(counts.all, 3);
        assert_eq!(counts.today, filter_tasks(&tasks, View::Today, None, now).len());
        assert_eq!(
            counts.upcoming,
            filter_tasks(&tasks, View::Upcoming, None, now).len()
        );
    }
}
