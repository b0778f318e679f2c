//! Project entity: typed form, create/update inputs and wire conversion.
//!
//! A project owns tasks and carries a denormalised `task_count` that the
//! mutation layer keeps in step with the task collection. The count is never
//! recomputed by scanning in normal operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::fields::is_hex_color;
use crate::store::{Doc, DocId, Fields};

/// A project as held in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: DocId,
    pub name: String,
    /// Display colour for the project dot, `#rrggbb`.
    pub color: String,
    pub description: Option<String>,
    /// Denormalised count of tasks referencing this project.
    pub task_count: u32,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Project {
    /// Decode a project from its wire document.
    ///
    /// `name` and `color` are required; the counters and timestamps default
    /// to zero when absent so that partially written documents still sort.
    pub fn from_doc(doc: &Doc) -> Result<Project> {
        Ok(Project {
            id: doc.id.clone(),
            name: doc.require_str("name")?,
            color: doc.require_str("color")?,
            description: doc.str_field("description").map(str::to_owned),
            task_count: u32::try_from(doc.int_field("task_count").unwrap_or(0)).unwrap_or(0),
            created_at_utc: doc.int_field("created_at_utc").unwrap_or(0),
            updated_at_utc: doc.int_field("updated_at_utc").unwrap_or(0),
        })
    }
}

/// Input for creating a project. Id, timestamps and the task count are
/// assigned by the mutation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

impl ProjectDraft {
    /// Validate the draft: non-empty name, well-formed hex colour.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid("name", "must not be empty"));
        }
        if !is_hex_color(&self.color) {
            return Err(Error::invalid(
                "color",
                format!("expected #rrggbb, got {:?}", self.color),
            ));
        }
        Ok(())
    }

    /// Wire fields for the create write. Task count starts at zero.
    pub fn to_fields(&self, now_utc: i64) -> Fields {
        let mut f = Fields::new();
        f.insert("name".into(), Value::from(self.name.clone()));
        f.insert("color".into(), Value::from(self.color.clone()));
        if let Some(desc) = &self.description {
            f.insert("description".into(), Value::from(desc.clone()));
        }
        f.insert("task_count".into(), Value::from(0));
        f.insert("created_at_utc".into(), Value::from(now_utc));
        f.insert("updated_at_utc".into(), Value::from(now_utc));
        f
    }
}

/// Field-level partial update for a project. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl ProjectPatch {
    /// Validate the fields that are present.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::invalid("name", "must not be empty"));
            }
        }
        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                return Err(Error::invalid(
                    "color",
                    format!("expected #rrggbb, got {color:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Wire fields for the merge write. Only set fields are included; the
    /// mutation layer adds the `updated_at_utc` bump.
    pub fn to_fields(&self) -> Fields {
        let mut f = Fields::new();
        if let Some(name) = &self.name {
            f.insert("name".into(), Value::from(name.clone()));
        }
        if let Some(color) = &self.color {
            f.insert("color".into(), Value::from(color.clone()));
        }
        if let Some(desc) = &self.description {
            f.insert("description".into(), Value::from(desc.clone()));
        }
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProjectDraft {
        ProjectDraft {
            name: "Launch".into(),
            color: "#10b981".into(),
            description: None,
        }
    }

    #[test]
    fn draft_validation_rejects_bad_input() {
        assert!(draft().validate().is_ok());

        let mut d = draft();
        d.name = "   ".into();
        assert_eq!(
            d.validate(),
            Err(Error::invalid("name", "must not be empty"))
        );

        let mut d = draft();
        d.color = "green".into();
        assert!(matches!(d.validate(), Err(Error::Invalid { field: "color", .. })));
    }

    #[test]
    fn draft_round_trips_through_a_doc() {
        let doc = Doc {
            id: "p1".into(),
            fields: draft().to_fields(1_700_000_000_000),
        };
        let p = Project::from_doc(&doc).expect("decode");
        assert_eq!(p.id, "p1");
        assert_eq!(p.name, "Launch");
        assert_eq!(p.color, "#10b981");
        assert_eq!(p.task_count, 0);
        assert_eq!(p.created_at_utc, 1_700_000_000_000);
    }

    #[test]
    fn decode_requires_name_and_color() {
        let mut fields = Fields::new();
        fields.insert("color".into(), Value::from("#10b981"));
        let doc = Doc {
            id: "p1".into(),
            fields,
        };
        assert!(matches!(Project::from_doc(&doc), Err(Error::Decode { .. })));
    }

    #[test]
    fn decode_defaults_missing_count_and_timestamps_to_zero() {
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::from("Launch"));
        fields.insert("color".into(), Value::from("#10b981"));
        let doc = Doc {
            id: "p1".into(),
            fields,
        };
        let p = Project::from_doc(&doc).expect("decode");
        assert_eq!(p.task_count, 0);
        assert_eq!(p.created_at_utc, 0);
        assert_eq!(p.updated_at_utc, 0);
    }

    #[test]
    fn patch_emits_only_set_fields() {
        let patch = ProjectPatch {
            name: Some("Launch v2".into()),
            ..ProjectPatch::default()
        };
        assert!(patch.validate().is_ok());
        let f = patch.to_fields();
        assert_eq!(f.len(), 1);
        assert_eq!(f.get("name").and_then(Value::as_str), Some("Launch v2"));
    }
}
