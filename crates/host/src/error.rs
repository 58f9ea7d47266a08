use thiserror::Error;

/// Errors raised by host implementations.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("host data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A world or bundle file exists but does not have the expected shape.
    #[error("corrupt host data at {path}: {detail}")]
    Corrupt { path: String, detail: String },

    #[error("entity not found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },

    /// An update document was rejected before it could be applied.
    #[error("update rejected: {0}")]
    Patch(#[from] sprawl_core::CoreError),

    /// The host (or a simulated one) refused the operation.
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    pub fn corrupt(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::HostError;

    #[test]
    fn not_found_display_names_the_entity() {
        let err = HostError::NotFound {
            kind: "Actor",
            id: "a1".to_string(),
        };
        assert_eq!(err.to_string(), "entity not found: Actor a1");
    }

    #[test]
    fn corrupt_helper_sets_variant() {
        let err = HostError::corrupt("packs/q.json", "no entities array");
        assert!(matches!(err, HostError::Corrupt { .. }));
    }
}
