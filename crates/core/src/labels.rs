//! ROI label dictionaries stored as file annotations on projects.
//!
//! A project named `P` may carry a file annotation `P_RoiLabels.json` holding
//! a JSON object. Only strict JSON is accepted.

use serde_json::{Map, Value};

use crate::annotation::{ObjectInfo, TargetRef};
use crate::error::CoreError;
use crate::scope::StoreContext;
use crate::store::AnnotationStore;

pub type LabelDictionary = Map<String, Value>;

/// File name of the label artifact for `project_name`.
pub fn label_file_name(project_name: &str, suffix: &str) -> String {
    format!("{project_name}{suffix}")
}

/// Parse label file content, requiring a top-level JSON object.
pub fn parse_label_file(name: &str, content: &[u8]) -> Result<LabelDictionary, CoreError> {
    let malformed = |reason: String| CoreError::MalformedLabelFile {
        name: name.to_string(),
        reason,
    };
    match serde_json::from_slice::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(malformed(format!(
            "expected an object, found {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Load the label dictionary of the project that owns `dataset`.
///
/// Returns `Ok(None)` when the dataset has no parent project or the project
/// has no label file.
pub async fn resolve_labels(
    store: &dyn AnnotationStore,
    ctx: &StoreContext,
    dataset: &ObjectInfo,
    suffix: &str,
) -> Result<Option<LabelDictionary>, CoreError> {
    let Some(project_id) = dataset.parent_id else {
        return Ok(None);
    };
    let project_ref = TargetRef::project(project_id);
    let Some(project) = store.find_object(ctx, project_ref).await? else {
        return Ok(None);
    };

    let name = label_file_name(project.name.as_deref().unwrap_or_default(), suffix);
    let mut files = store.find_file_annotations(ctx, project_ref, &name).await?;

    match files.len() {
        0 => {
            tracing::debug!(project_id, file = %name, "No ROI label file");
            Ok(None)
        }
        1 => {
            let file = files.remove(0);
            let content = store.file_content(ctx, file.id).await?;
            parse_label_file(&name, &content).map(Some)
        }
        _ => Err(CoreError::AmbiguousLabelFile {
            name,
            matches: files.iter().map(|f| f.id).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn file_name_appends_suffix() {
        assert_eq!(
            label_file_name("Malaria 2017", "_RoiLabels.json"),
            "Malaria 2017_RoiLabels.json"
        );
    }

    #[test]
    fn object_with_newlines_parses() {
        let content = b"{\n  \"FASTMAL:PARASITE\": \"Parasite\",\n  \"FASTMAL:WHITE_CELL\": \"White cell\"\n}\n";
        let labels = parse_label_file("p_RoiLabels.json", content).unwrap();
        assert_eq!(labels["FASTMAL:PARASITE"], "Parasite");
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn python_literal_syntax_is_rejected() {
        let content = b"{'FASTMAL:PARASITE': 'Parasite'}";
        let err = parse_label_file("p_RoiLabels.json", content).unwrap_err();
        assert_matches!(err, CoreError::MalformedLabelFile { ref name, .. } if name == "p_RoiLabels.json");
    }

    #[test]
    fn non_object_is_rejected() {
        let err = parse_label_file("p_RoiLabels.json", b"[1, 2]").unwrap_err();
        assert_matches!(err, CoreError::MalformedLabelFile { ref reason, .. } if reason.contains("an array"));
    }
}
