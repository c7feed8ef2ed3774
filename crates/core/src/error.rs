use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// The entity exists but lacks a marker the operation requires.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Expected exactly one tag '{value}' in scope, found {}", format_ids(.matches))]
    AmbiguousTag { value: String, matches: Vec<DbId> },

    #[error("Expected at most one label file '{name}', found {}", format_ids(.matches))]
    AmbiguousLabelFile { name: String, matches: Vec<DbId> },

    #[error("Label file '{name}' is not a valid JSON object: {reason}")]
    MalformedLabelFile { name: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any failure reported by the annotation store (connection, permission, query).
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_ids(ids: &[DbId]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("{} (ids: {})", ids.len(), joined.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_tag_lists_matches() {
        let err = CoreError::AmbiguousTag {
            value: "FASTMAL_ROI_COMPLETE".into(),
            matches: vec![3, 9],
        };
        assert_eq!(
            err.to_string(),
            "Expected exactly one tag 'FASTMAL_ROI_COMPLETE' in scope, found 2 (ids: 3, 9)"
        );
    }

    #[test]
    fn ambiguous_tag_with_no_matches_says_none() {
        let err = CoreError::AmbiguousTag {
            value: "MISSING".into(),
            matches: vec![],
        };
        assert!(err.to_string().ends_with("found none"));
    }
}
