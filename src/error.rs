//! Error taxonomy for the task management core.
//!
//! Every mutation failure is propagated to the caller; subscription channel
//! failures are reported through the subscription's error callback instead
//! and never tear the subscription down.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the store, the live query layer and the mutation layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A mutation was attempted without a resolved owner identity. Raised
    /// locally, before any store call is issued.
    #[error("not signed in")]
    Unauthenticated,

    /// A referenced document does not exist in its collection.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"project"` or `"task"`.
        kind: &'static str,
        /// The missing document id.
        id: String,
    },

    /// Input failed entity validation (empty title, malformed colour, ...).
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A document could not be decoded into its typed form.
    #[error("malformed document {id}: {reason}")]
    Decode {
        /// Id of the offending document.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Transport or permission failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] with an owned id.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a [`Error::Invalid`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_offender() {
        let e = Error::not_found("task", "t42");
        assert_eq!(e.to_string(), "task not found: t42");

        let e = Error::invalid("name", "must not be empty");
        assert_eq!(e.to_string(), "invalid name: must not be empty");

        assert_eq!(Error::Unauthenticated.to_string(), "not signed in");
    }
}
