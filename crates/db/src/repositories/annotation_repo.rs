//! Repository for the `annotations` and `file_contents` tables.

use fastmal_core::annotation::{AnnotationValue, TargetKind};
use fastmal_core::types::DbId;
use sqlx::PgPool;

use crate::models::annotation::{AnnotationColumns, AnnotationRow};

/// Column list for `annotations` queries, qualified with the `a` alias.
pub(crate) const ANNOTATION_COLUMNS: &str = "\
    a.id, a.kind, a.text_value, a.namespace, a.map_entries, \
    a.file_name, a.file_mimetype, a.file_size, a.owner_id, a.group_id";

/// Provides creation, update and lookups for annotations.
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Insert an annotation owned by `owner_id` in `group_id`.
    pub async fn create(
        pool: &PgPool,
        value: &AnnotationValue,
        owner_id: DbId,
        group_id: Option<DbId>,
    ) -> Result<AnnotationRow, sqlx::Error> {
        let columns = AnnotationColumns::from(value);
        let query = format!(
            "INSERT INTO annotations AS a \
                 (kind, text_value, namespace, map_entries, file_name, file_mimetype, file_size, \
                  owner_id, group_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ANNOTATION_COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationRow>(&query)
            .bind(columns.kind)
            .bind(columns.text_value)
            .bind(columns.namespace)
            .bind(columns.map_entries)
            .bind(columns.file_name)
            .bind(columns.file_mimetype)
            .bind(columns.file_size)
            .bind(owner_id)
            .bind(group_id)
            .fetch_one(pool)
            .await
    }

    /// Insert a comment in `namespace` unless one with the same text exists.
    ///
    /// Returns `None` on conflict, including with a concurrent insert.
    pub async fn create_comment(
        pool: &PgPool,
        namespace: &str,
        text: &str,
        owner_id: DbId,
        group_id: Option<DbId>,
    ) -> Result<Option<AnnotationRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotations AS a (kind, text_value, namespace, owner_id, group_id) \
             VALUES ('comment', $1, $2, $3, $4) \
             ON CONFLICT (namespace, text_value) \
                 WHERE kind = 'comment' AND namespace IS NOT NULL \
                 DO NOTHING \
             RETURNING {ANNOTATION_COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationRow>(&query)
            .bind(text)
            .bind(namespace)
            .bind(owner_id)
            .bind(group_id)
            .fetch_optional(pool)
            .await
    }

    /// The comment with `text` in `namespace`, if any.
    pub async fn find_comment(
        pool: &PgPool,
        namespace: &str,
        text: &str,
    ) -> Result<Option<AnnotationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations a \
             WHERE a.kind = 'comment' AND a.namespace = $1 AND a.text_value = $2"
        );
        sqlx::query_as::<_, AnnotationRow>(&query)
            .bind(namespace)
            .bind(text)
            .fetch_optional(pool)
            .await
    }

    /// Replace the payload of an existing annotation. The kind is not changed.
    ///
    /// Returns `None` if no annotation with the given ID exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        value: &AnnotationValue,
    ) -> Result<Option<AnnotationRow>, sqlx::Error> {
        let columns = AnnotationColumns::from(value);
        let query = format!(
            "UPDATE annotations AS a SET \
                 text_value = $2, namespace = $3, map_entries = $4, \
                 file_name = $5, file_mimetype = $6, file_size = $7 \
             WHERE a.id = $1 AND a.kind = $8 \
             RETURNING {ANNOTATION_COLUMNS}"
        );
        sqlx::query_as::<_, AnnotationRow>(&query)
            .bind(id)
            .bind(columns.text_value)
            .bind(columns.namespace)
            .bind(columns.map_entries)
            .bind(columns.file_name)
            .bind(columns.file_mimetype)
            .bind(columns.file_size)
            .bind(columns.kind)
            .fetch_optional(pool)
            .await
    }

    /// Tags valued `value`, restricted to `group_id` when one is given.
    pub async fn find_tags(
        pool: &PgPool,
        value: &str,
        group_id: Option<DbId>,
    ) -> Result<Vec<AnnotationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations a \
             WHERE a.kind = 'tag' AND a.text_value = $1 \
               AND ($2::BIGINT IS NULL OR a.group_id = $2) \
             ORDER BY a.id"
        );
        sqlx::query_as::<_, AnnotationRow>(&query)
            .bind(value)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }

    /// Every comment in `namespace`.
    pub async fn find_comments(
        pool: &PgPool,
        namespace: &str,
    ) -> Result<Vec<AnnotationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations a \
             WHERE a.kind = 'comment' AND a.namespace = $1 \
             ORDER BY a.id"
        );
        sqlx::query_as::<_, AnnotationRow>(&query)
            .bind(namespace)
            .fetch_all(pool)
            .await
    }

    /// File annotations named `name` linked to the given parent.
    pub async fn find_files_on(
        pool: &PgPool,
        parent_kind: TargetKind,
        parent_id: DbId,
        name: &str,
    ) -> Result<Vec<AnnotationRow>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT {ANNOTATION_COLUMNS} FROM annotations a \
             JOIN annotation_links l ON l.annotation_id = a.id \
             WHERE l.parent_type = $1 AND l.parent_id = $2 \
               AND a.kind = 'file' AND a.file_name = $3 \
             ORDER BY a.id"
        );
        sqlx::query_as::<_, AnnotationRow>(&query)
            .bind(parent_kind.as_str())
            .bind(parent_id)
            .bind(name)
            .fetch_all(pool)
            .await
    }

    /// Raw bytes stored for a file annotation.
    pub async fn file_content(
        pool: &PgPool,
        annotation_id: DbId,
    ) -> Result<Option<Vec<u8>>, sqlx::Error> {
        sqlx::query_scalar("SELECT content FROM file_contents WHERE annotation_id = $1")
            .bind(annotation_id)
            .fetch_optional(pool)
            .await
    }

    /// Store the content of a file annotation, replacing any previous bytes.
    pub async fn put_file_content(
        pool: &PgPool,
        annotation_id: DbId,
        content: &[u8],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO file_contents (annotation_id, content) VALUES ($1, $2) \
             ON CONFLICT (annotation_id) DO UPDATE SET content = EXCLUDED.content",
        )
        .bind(annotation_id)
        .bind(content)
        .execute(pool)
        .await?;
        Ok(())
    }
}
