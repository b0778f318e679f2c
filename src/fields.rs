//! Enumerations and field types shared across entities and views.
//!
//! This module defines the structured value types used to categorise tasks
//! (status, priority), the view selector used by the projection layer, and
//! small validation helpers for wire-level field values.

use serde::{Deserialize, Serialize};

/// Task completion status. Every task is in exactly one of these states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

/// Task priority level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A named task-filtering mode selected by the presentation layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    All,
    Today,
    Upcoming,
    Project,
}

impl View {
    /// Human-readable label for this view.
    pub fn label(self) -> &'static str {
        match self {
            View::All => "All Tasks",
            View::Today => "Today",
            View::Upcoming => "Upcoming",
            View::Project => "Project",
        }
    }
}

/// Format a status as its wire string.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Todo => "todo",
        Status::InProgress => "in-progress",
        Status::Done => "done",
    }
}

/// Parse a status from its wire string.
pub fn parse_status(s: &str) -> Option<Status> {
    match s {
        "todo" => Some(Status::Todo),
        "in-progress" => Some(Status::InProgress),
        "done" => Some(Status::Done),
        _ => None,
    }
}

/// Format a priority as its wire string.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

/// Parse a priority from its wire string.
pub fn parse_priority(s: &str) -> Option<Priority> {
    match s {
        "low" => Some(Priority::Low),
        "medium" => Some(Priority::Medium),
        "high" => Some(Priority::High),
        _ => None,
    }
}

/// Check that a colour string is a display hex value of the form `#rrggbb`.
pub fn is_hex_color(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('#') else {
        return false;
    };
    rest.len() == 6 && rest.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_strings() {
        for s in [Status::Todo, Status::InProgress, Status::Done] {
            assert_eq!(parse_status(format_status(s)), Some(s));
        }
        assert_eq!(parse_status("blocked"), None);
    }

    #[test]
    fn priority_round_trips_through_wire_strings() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(parse_priority(format_priority(p)), Some(p));
        }
        assert_eq!(parse_priority(""), None);
    }

    #[test]
    fn hex_colours_are_validated() {
        assert!(is_hex_color("#10b981"));
        assert!(is_hex_color("#3B82F6"));
        assert!(!is_hex_color("10b981"));
        assert!(!is_hex_color("#10b98"));
        assert!(!is_hex_color("#10b9811"));
        assert!(!is_hex_color("#10b98z"));
    }
}
