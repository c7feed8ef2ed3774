//! Annotation entities, link targets, and the marker names that drive the
//! ROI annotation workflow.
//!
//! An [`Annotation`] carries exactly one [`AnnotationValue`] variant. Callers
//! match on the variant instead of inspecting wrapper types.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Marker defaults
// ---------------------------------------------------------------------------

/// Tag value marking both datasets and images as eligible for ROI annotation.
pub const DEFAULT_ANNOTATE_TAG: &str = "FASTMAL_ANNOTATE";

/// Tag value an annotator links to an image once its ROIs are complete.
pub const DEFAULT_ROI_COMPLETE_TAG: &str = "FASTMAL_ROI_COMPLETE";

/// Namespace partitioning ROI comment identity.
pub const DEFAULT_COMMENT_NAMESPACE: &str = "openmicroscopy.org/fastmal/roi_comment";

/// Suffix appended to a project name to locate its ROI label file.
pub const DEFAULT_LABEL_FILE_SUFFIX: &str = "_RoiLabels.json";

/// Names of the tags, namespace and file suffix the workflow relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Tag a dataset must carry before it can be summarised.
    pub dataset_annotate: String,
    /// Tag an image must carry to be part of the annotatable set.
    pub image_annotate: String,
    /// Tag linked to an image when its annotation is complete.
    pub roi_complete: String,
    pub comment_namespace: String,
    pub label_file_suffix: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            dataset_annotate: DEFAULT_ANNOTATE_TAG.to_string(),
            image_annotate: DEFAULT_ANNOTATE_TAG.to_string(),
            roi_complete: DEFAULT_ROI_COMPLETE_TAG.to_string(),
            comment_namespace: DEFAULT_COMMENT_NAMESPACE.to_string(),
            label_file_suffix: DEFAULT_LABEL_FILE_SUFFIX.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Kinds of entity in the project → dataset → image → ROI → shape hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Project,
    Dataset,
    Image,
    Roi,
    Shape,
}

/// All valid target kind strings.
const VALID_TARGET_KINDS: &[&str] = &["project", "dataset", "image", "roi", "shape"];

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Dataset => "dataset",
            Self::Image => "image",
            Self::Roi => "roi",
            Self::Shape => "shape",
        }
    }

    /// Entity name used in not-found errors.
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Dataset => "Dataset",
            Self::Image => "Image",
            Self::Roi => "Roi",
            Self::Shape => "Shape",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "project" => Ok(Self::Project),
            "dataset" => Ok(Self::Dataset),
            "image" => Ok(Self::Image),
            "roi" => Ok(Self::Roi),
            "shape" => Ok(Self::Shape),
            _ => Err(CoreError::Validation(format!(
                "Invalid target kind '{s}'. Must be one of: {}",
                VALID_TARGET_KINDS.join(", ")
            ))),
        }
    }
}

/// A typed reference to an entity annotations can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: DbId,
}

impl TargetRef {
    pub fn new(kind: TargetKind, id: DbId) -> Self {
        Self { kind, id }
    }

    pub fn project(id: DbId) -> Self {
        Self::new(TargetKind::Project, id)
    }

    pub fn dataset(id: DbId) -> Self {
        Self::new(TargetKind::Dataset, id)
    }

    pub fn image(id: DbId) -> Self {
        Self::new(TargetKind::Image, id)
    }

    pub fn roi(id: DbId) -> Self {
        Self::new(TargetKind::Roi, id)
    }

    pub fn shape(id: DbId) -> Self {
        Self::new(TargetKind::Shape, id)
    }

    /// The error to raise when this target cannot be resolved.
    pub fn not_found(&self) -> CoreError {
        CoreError::NotFound {
            entity: self.kind.entity_name(),
            id: self.id,
        }
    }
}

/// Identity and placement of a hierarchy entity as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub kind: TargetKind,
    pub id: DbId,
    /// Display name. ROIs and shapes have none.
    pub name: Option<String>,
    /// Parent in the hierarchy (dataset → project, image → dataset, ...).
    pub parent_id: Option<DbId>,
    pub owner_id: DbId,
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// One key/value pair of a map annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: String,
}

impl MapEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Per-kind annotation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationValue {
    Tag {
        value: String,
    },
    Map {
        entries: Vec<MapEntry>,
    },
    Comment {
        text: String,
        namespace: Option<String>,
    },
    File {
        name: String,
        mimetype: Option<String>,
        size: i64,
    },
}

impl AnnotationValue {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Tag { .. } => "tag",
            Self::Map { .. } => "map",
            Self::Comment { .. } => "comment",
            Self::File { .. } => "file",
        }
    }

    /// The tag value, when this is a tag.
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            Self::Tag { value } => Some(value),
            _ => None,
        }
    }

    /// The comment text, when this is a comment in `namespace`.
    pub fn comment_in(&self, namespace: &str) -> Option<&str> {
        match self {
            Self::Comment {
                text,
                namespace: Some(ns),
            } if ns == namespace => Some(text),
            _ => None,
        }
    }

    /// The first entry of a map annotation.
    pub fn first_map_entry(&self) -> Option<&MapEntry> {
        match self {
            Self::Map { entries } => entries.first(),
            _ => None,
        }
    }
}

/// An annotation entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub id: DbId,
    pub owner_id: DbId,
    /// Visibility scope the annotation was created in.
    pub group_id: Option<DbId>,
    #[serde(flatten)]
    pub value: AnnotationValue,
}

/// Join between an annotation and the target it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationLink {
    pub id: DbId,
    pub target: TargetRef,
    pub annotation_id: DbId,
    pub owner_id: DbId,
}

/// A link together with the annotation it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAnnotation {
    pub link: AnnotationLink,
    pub annotation: Annotation,
}

/// The acting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub full_name: String,
}
