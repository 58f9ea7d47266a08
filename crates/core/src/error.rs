use thiserror::Error;

/// Domain-level errors raised while inspecting or patching entity data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A field did not have any shape the transform rules can interpret.
    /// Indicates an unanticipated legacy shape; the affected entity's
    /// migration fails, not the batch.
    #[error("unexpected shape at '{path}': {detail}")]
    UnexpectedShape { path: String, detail: String },

    /// Two patch entries target the same path or a nested prefix of it.
    /// Rules must produce disjoint paths; this is enforced at merge time.
    #[error("patch path conflict: '{path}' overlaps an existing entry")]
    PatchConflict { path: String },

    /// A patch path was empty or contained an empty segment.
    #[error("invalid patch path: '{path}'")]
    InvalidPatchPath { path: String },

    /// A document failed to round-trip through JSON.
    #[error("document serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn unexpected_shape(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn unexpected_shape_display_names_the_path() {
        let err = CoreError::unexpected_shape("data.skills.active", "expected an object");
        assert_eq!(
            err.to_string(),
            "unexpected shape at 'data.skills.active': expected an object"
        );
    }

    #[test]
    fn helper_constructor_sets_variant() {
        let err = CoreError::unexpected_shape("data", "bad");
        assert!(matches!(err, CoreError::UnexpectedShape { .. }));
    }
}
