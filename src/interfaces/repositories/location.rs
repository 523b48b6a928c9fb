use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    entities::location::{Location, LocationPoint},
    errors::AppError,
    repositories::sqlx_repo::SqlxLocationRepo,
};

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;
    async fn create_location(&self, point: &LocationPoint) -> Result<Uuid, AppError>;
    async fn get_location_by_id(&self, id: &Uuid) -> Result<Location, AppError>;
    async fn find_location_by_point(&self, point: &LocationPoint) -> Result<Option<Location>, AppError>;
    async fn list_locations(&self) -> Result<Vec<Location>, AppError>;
    /// Removes the location and every photo it owns. `false` if it was already gone.
    async fn delete_location(&self, id: &Uuid) -> Result<bool, AppError>;
}

impl SqlxLocationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        SqlxLocationRepo { pool }
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(AppError::from)
    }

    async fn create_location(&self, point: &LocationPoint) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO locations (id, latitude, longitude, created_at)
            VALUES (?, ?, ?, ?)
            "#
        )
        .bind(id)
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("A location already exists at these coordinates".to_string())
                }
                _ => AppError::from(e),
            }
        })?;

        Ok(id)
    }

    async fn get_location_by_id(&self, id: &Uuid) -> Result<Location, AppError> {
        sqlx::query_as::<_, Location>(
            "SELECT id, latitude, longitude, created_at FROM locations WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))
    }

    async fn find_location_by_point(&self, point: &LocationPoint) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, latitude, longitude, created_at
            FROM locations
            WHERE latitude = ? AND longitude = ?
            "#
        )
        .bind(point.latitude)
        .bind(point.longitude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn list_locations(&self) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, latitude, longitude, created_at FROM locations ORDER BY created_at, rowid"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    async fn delete_location(&self, id: &Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let photos = sqlx::query("DELETE FROM photos WHERE location_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::debug!(location_id = %id, photos = photos.rows_affected(), "Deleted location");
        }

        Ok(deleted)
    }
}
