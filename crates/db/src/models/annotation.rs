//! Annotation rows.
//!
//! All annotation kinds share the `annotations` table; [`AnnotationRow`]
//! converts into the tagged [`AnnotationValue`] and [`AnnotationColumns`]
//! flattens one back into bindable columns.

use fastmal_core::annotation::{Annotation, AnnotationValue, MapEntry};
use fastmal_core::error::CoreError;
use fastmal_core::types::DbId;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `annotations` table.
#[derive(Debug, Clone, FromRow)]
pub struct AnnotationRow {
    pub id: DbId,
    pub kind: String,
    pub text_value: Option<String>,
    pub namespace: Option<String>,
    pub map_entries: Option<Json<Vec<MapEntry>>>,
    pub file_name: Option<String>,
    pub file_mimetype: Option<String>,
    pub file_size: Option<i64>,
    pub owner_id: DbId,
    pub group_id: Option<DbId>,
}

impl TryFrom<AnnotationRow> for Annotation {
    type Error = CoreError;

    fn try_from(row: AnnotationRow) -> Result<Self, Self::Error> {
        let missing = |column: &str| {
            CoreError::Store(format!(
                "annotation {} of kind '{}' has no {column}",
                row.id, row.kind
            ))
        };
        let value = match row.kind.as_str() {
            "tag" => AnnotationValue::Tag {
                value: row.text_value.clone().ok_or_else(|| missing("text_value"))?,
            },
            "map" => AnnotationValue::Map {
                entries: row
                    .map_entries
                    .clone()
                    .map(|Json(entries)| entries)
                    .ok_or_else(|| missing("map_entries"))?,
            },
            "comment" => AnnotationValue::Comment {
                text: row.text_value.clone().ok_or_else(|| missing("text_value"))?,
                namespace: row.namespace.clone(),
            },
            "file" => AnnotationValue::File {
                name: row.file_name.clone().ok_or_else(|| missing("file_name"))?,
                mimetype: row.file_mimetype.clone(),
                size: row.file_size.unwrap_or_default(),
            },
            other => {
                return Err(CoreError::Store(format!(
                    "annotation {} has unknown kind '{other}'",
                    row.id
                )))
            }
        };
        Ok(Annotation {
            id: row.id,
            owner_id: row.owner_id,
            group_id: row.group_id,
            value,
        })
    }
}

/// Kind-specific column values of an [`AnnotationValue`], ready to bind.
#[derive(Debug, Clone, Default)]
pub struct AnnotationColumns<'a> {
    pub kind: &'static str,
    pub text_value: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub map_entries: Option<Json<&'a [MapEntry]>>,
    pub file_name: Option<&'a str>,
    pub file_mimetype: Option<&'a str>,
    pub file_size: Option<i64>,
}

impl<'a> From<&'a AnnotationValue> for AnnotationColumns<'a> {
    fn from(value: &'a AnnotationValue) -> Self {
        let base = AnnotationColumns {
            kind: value.kind_str(),
            ..Default::default()
        };
        match value {
            AnnotationValue::Tag { value } => AnnotationColumns {
                text_value: Some(value),
                ..base
            },
            AnnotationValue::Map { entries } => AnnotationColumns {
                map_entries: Some(Json(entries.as_slice())),
                ..base
            },
            AnnotationValue::Comment { text, namespace } => AnnotationColumns {
                text_value: Some(text),
                namespace: namespace.as_deref(),
                ..base
            },
            AnnotationValue::File {
                name,
                mimetype,
                size,
            } => AnnotationColumns {
                file_name: Some(name),
                file_mimetype: mimetype.as_deref(),
                file_size: Some(*size),
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn row(kind: &str) -> AnnotationRow {
        AnnotationRow {
            id: 5,
            kind: kind.to_string(),
            text_value: None,
            namespace: None,
            map_entries: None,
            file_name: None,
            file_mimetype: None,
            file_size: None,
            owner_id: 1,
            group_id: Some(3),
        }
    }

    #[test]
    fn map_row_converts_to_entries() {
        let mut map = row("map");
        map.map_entries = Some(Json(vec![MapEntry::new("stage", "ring")]));

        let annotation = Annotation::try_from(map).unwrap();

        assert_eq!(annotation.value.first_map_entry().unwrap().value, "ring");
        assert_eq!(annotation.group_id, Some(3));
    }

    #[test]
    fn tag_row_without_value_is_a_store_error() {
        let err = Annotation::try_from(row("tag")).unwrap_err();
        assert_matches!(err, CoreError::Store(msg) if msg.contains("text_value"));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Annotation::try_from(row("rating")).unwrap_err();
        assert_matches!(err, CoreError::Store(msg) if msg.contains("rating"));
    }

    #[test]
    fn comment_columns_carry_namespace() {
        let value = AnnotationValue::Comment {
            text: "debris".into(),
            namespace: Some("ns".into()),
        };
        let columns = AnnotationColumns::from(&value);
        assert_eq!(columns.kind, "comment");
        assert_eq!(columns.text_value, Some("debris"));
        assert_eq!(columns.namespace, Some("ns"));
        assert!(columns.map_entries.is_none());
    }
}
