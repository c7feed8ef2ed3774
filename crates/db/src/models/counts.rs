//! Aggregate rows produced by the dataset projections.

use fastmal_core::store::{ImageTypeCount, TypeCount};
use fastmal_core::types::DbId;
use sqlx::FromRow;

/// `COUNT(*)` is a BIGINT; negative values cannot occur.
fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

#[derive(Debug, Clone, FromRow)]
pub struct TypeCountRow {
    pub label: String,
    pub count: i64,
}

impl From<TypeCountRow> for TypeCount {
    fn from(row: TypeCountRow) -> Self {
        TypeCount {
            label: row.label,
            count: to_count(row.count),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ImageTypeCountRow {
    pub image_id: DbId,
    pub label: String,
    pub count: i64,
}

impl From<ImageTypeCountRow> for ImageTypeCount {
    fn from(row: ImageTypeCountRow) -> Self {
        ImageTypeCount {
            image_id: row.image_id,
            label: row.label,
            count: to_count(row.count),
        }
    }
}
