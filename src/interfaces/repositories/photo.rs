use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    entities::photo::{Photo, PhotoSummary},
    errors::AppError,
    repositories::sqlx_repo::SqlxPhotoRepo,
};

const PHOTO_COLUMNS: &str = "id, location_id, url, image_data, position, created_at";
const SUMMARY_COLUMNS: &str =
    "id, location_id, url, image_data IS NOT NULL AS has_image, position, created_at";

#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// Swaps the whole photo set of a location in one transaction.
    async fn replace_photo_set(&self, location_id: &Uuid, urls: &[String]) -> Result<Vec<PhotoSummary>, AppError>;
    /// Lists the album in position order, without image bytes.
    async fn list_photos(&self, location_id: &Uuid) -> Result<Vec<PhotoSummary>, AppError>;
    async fn get_photo_by_id(&self, id: &Uuid) -> Result<Photo, AppError>;
    /// Returns `false` when the photo no longer exists.
    async fn set_image_data(&self, id: &Uuid, data: &[u8]) -> Result<bool, AppError>;
    /// Deletes whichever of `ids` still exist and returns how many went.
    async fn delete_photos(&self, ids: &[Uuid]) -> Result<u64, AppError>;
}

impl SqlxPhotoRepo {
    pub fn new(pool: SqlitePool) -> Self {
        SqlxPhotoRepo { pool }
    }
}

#[async_trait]
impl PhotoRepository for SqlxPhotoRepo {
    async fn replace_photo_set(&self, location_id: &Uuid, urls: &[String]) -> Result<Vec<PhotoSummary>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Must stay the first statement: it takes the write lock before any read.
        let removed = sqlx::query("DELETE FROM photos WHERE location_id = ?")
            .bind(location_id)
            .execute(&mut *tx)
            .await?;

        let owners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations WHERE id = ?")
            .bind(location_id)
            .fetch_one(&mut *tx)
            .await?;

        if owners == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound("Location not found".to_string()));
        }

        let now = Utc::now();
        let photos: Vec<PhotoSummary> = urls
            .iter()
            .enumerate()
            .map(|(position, url)| PhotoSummary {
                id: Uuid::new_v4(),
                location_id: *location_id,
                url: url.clone(),
                has_image: false,
                position: position as i64,
                created_at: now,
            })
            .collect();

        if !photos.is_empty() {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO photos (id, location_id, url, image_data, position, created_at) "
            );

            builder.push_values(&photos, |mut row, photo| {
                row.push_bind(photo.id)
                    .push_bind(photo.location_id)
                    .push_bind(&photo.url)
                    .push_bind(None::<Vec<u8>>)
                    .push_bind(photo.position)
                    .push_bind(photo.created_at);
            });

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            location_id = %location_id,
            removed = removed.rows_affected(),
            inserted = photos.len(),
            "Replaced photo set"
        );

        Ok(photos)
    }

    async fn list_photos(&self, location_id: &Uuid) -> Result<Vec<PhotoSummary>, AppError> {
        let photos = sqlx::query_as::<_, PhotoSummary>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM photos WHERE location_id = ? ORDER BY position, rowid"
        ))
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(photos)
    }

    async fn get_photo_by_id(&self, id: &Uuid) -> Result<Photo, AppError> {
        sqlx::query_as::<_, Photo>(&format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))
    }

    async fn set_image_data(&self, id: &Uuid, data: &[u8]) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE photos SET image_data = ? WHERE id = ?")
            .bind(data)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_photos(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM photos WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}
