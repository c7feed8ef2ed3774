//! ROI type catalogs for thick and thin blood films.
//!
//! Each shape's text value is the `code` of one of these types. Entry 0 is
//! the "Off" selector used by the drawing UI and never appears in tallies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Blood film preparation, which decides the applicable ROI types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilmKind {
    #[default]
    Thick,
    Thin,
}

impl FilmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thick => "thick",
            Self::Thin => "thin",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "thick" => Ok(Self::Thick),
            "thin" => Ok(Self::Thin),
            other => Err(CoreError::Validation(format!(
                "Unknown film kind '{other}', expected 'thick' or 'thin'"
            ))),
        }
    }

    /// ROI types for this film, selector entry first.
    pub fn roi_types(&self) -> &'static [RoiType] {
        match self {
            Self::Thick => THICK_FILM_ROI_TYPES,
            Self::Thin => THIN_FILM_ROI_TYPES,
        }
    }
}

/// One selectable ROI type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoiType {
    pub id: u8,
    pub name: &'static str,
    /// Value written to a shape's text field.
    pub code: &'static str,
    /// Stroke colour as `"r,g,b"`.
    pub colour: &'static str,
}

impl RoiType {
    /// Whether this entry is the drawing-off selector.
    pub fn is_selector(&self) -> bool {
        self.id == 0
    }
}

const SELECTOR: RoiType = RoiType {
    id: 0,
    name: "Off",
    code: "FASTMAL:ERROR_SELECTION_ROI!",
    colour: "0,0,0",
};

pub const THICK_FILM_ROI_TYPES: &[RoiType] = &[
    SELECTOR,
    RoiType {
        id: 1,
        name: "White cell",
        code: "FASTMAL:WHITE_CELL",
        colour: "102,194,165",
    },
    RoiType {
        id: 2,
        name: "Parasite",
        code: "FASTMAL:PARASITE",
        colour: "252,141,98",
    },
    RoiType {
        id: 3,
        name: "Background",
        code: "FASTMAL:BACKGROUND",
        colour: "141,160,203",
    },
    RoiType {
        id: 4,
        name: "Ignore",
        code: "FASTMAL:IGNORE",
        colour: "231,138,195",
    },
];

pub const THIN_FILM_ROI_TYPES: &[RoiType] = &[
    SELECTOR,
    RoiType {
        id: 1,
        name: "Interesting",
        code: "FASTMAL:INTERESTING",
        colour: "102,194,165",
    },
    RoiType {
        id: 2,
        name: "Not interesting",
        code: "FASTMAL:NOT INTERESTING",
        colour: "252,141,98",
    },
];

/// Count of one ROI type on an image next to its dataset-wide total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyRow {
    pub name: &'static str,
    pub code: &'static str,
    pub image: u64,
    pub dataset: u64,
}

/// Pair image counts with dataset totals for every non-selector type of `film`.
///
/// Types absent from either map count as zero.
pub fn tally_rows(
    film: FilmKind,
    image_counts: &BTreeMap<String, u64>,
    dataset_counts: &BTreeMap<String, u64>,
) -> Vec<TallyRow> {
    film.roi_types()
        .iter()
        .filter(|t| !t.is_selector())
        .map(|t| TallyRow {
            name: t.name,
            code: t.code,
            image: image_counts.get(t.code).copied().unwrap_or(0),
            dataset: dataset_counts.get(t.code).copied().unwrap_or(0),
        })
        .collect()
}

/// Render rows as `"name = image/dataset; "` segments.
pub fn tally_summary(rows: &[TallyRow]) -> String {
    rows.iter()
        .map(|row| format!("{} = {}/{}; ", row.name, row.image, row.dataset))
        .collect()
}
