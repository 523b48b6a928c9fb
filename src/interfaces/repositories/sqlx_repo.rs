use sqlx::SqlitePool;

#[derive(Clone)]
pub struct SqlxLocationRepo {
    pub pool: SqlitePool,
}

#[derive(Clone)]
pub struct SqlxPhotoRepo {
    pub pool: SqlitePool,
}
