use fastmal_core::types::DbId;
use sqlx::PgPool;

use crate::models::experimenter::{CreateExperimenter, Experimenter, ExperimenterGroup};

/// Column list for `experimenters` queries.
const COLUMNS: &str = "id, name, full_name, created_at, updated_at";

/// Provides lookups for experimenters and their groups.
pub struct ExperimenterRepo;

impl ExperimenterRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateExperimenter,
    ) -> Result<Experimenter, sqlx::Error> {
        let query = format!(
            "INSERT INTO experimenters (name, full_name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Experimenter>(&query)
            .bind(&input.name)
            .bind(&input.full_name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Experimenter>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM experimenters WHERE id = $1");
        sqlx::query_as::<_, Experimenter>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_group(pool: &PgPool, name: &str) -> Result<ExperimenterGroup, sqlx::Error> {
        sqlx::query_as::<_, ExperimenterGroup>(
            "INSERT INTO experimenter_groups (name) VALUES ($1) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }
}
