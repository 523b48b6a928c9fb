
use async_trait::async_trait;
use mockall::{mock, Sequence};
use sqlx::SqlitePool;
use std::sync::Arc;
use test_utils::*;
use tokio::sync::Notify;
use uuid::Uuid;
use virtual_tourist::{
    entities::{
        album::{AlbumState, CollectionOutcome, PrimaryAction},
        location::LocationPoint,
        photo::{ImageReference, Photo, PhotoSummary},
    },
    errors::{AppError, FetchError, PhotoSetError, SearchError},
    repositories::{
        image_data::ImageDataRepository,
        photo::PhotoRepository,
        photo_search::PhotoSearchRepository,
        sqlx_repo::{SqlxLocationRepo, SqlxPhotoRepo},
    },
    use_cases::photo_set::PhotoSetHandler,
};

mock! {
    pub Search {}

    #[async_trait]
    impl PhotoSearchRepository for Search {
        async fn search_photos(
            &self,
            point: &LocationPoint,
            page: u32,
            per_page: u32,
        ) -> Result<Vec<ImageReference>, SearchError>;
    }
}

mock! {
    pub Images {}

    #[async_trait]
    impl ImageDataRepository for Images {
        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
    }
}

type TestHandler<S, F> = PhotoSetHandler<SqlxLocationRepo, SqlxPhotoRepo, S, F>;

fn refs(page: u32, count: usize) -> Vec<ImageReference> {
    (0..count)
        .map(|i| ImageReference::new(format!("https://live.staticflickr.com/{}/{}_m.jpg", page, i)))
        .collect()
}

fn handler<S, F>(pool: &SqlitePool, search: S, images: F) -> TestHandler<S, F>
where
    S: PhotoSearchRepository,
    F: ImageDataRepository,
{
    PhotoSetHandler::new(
        SqlxLocationRepo::new(pool.clone()),
        SqlxPhotoRepo::new(pool.clone()),
        search,
        images,
    )
    .with_page_size(21)
}

/// Search fake that parks inside the call until released.
struct GatedSearch {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl PhotoSearchRepository for GatedSearch {
    async fn search_photos(
        &self,
        _point: &LocationPoint,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ImageReference>, SearchError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(refs(page, per_page as usize))
    }
}

/// Photo store that parks after the replace has been written, until released.
struct GatedStore {
    inner: SqlxPhotoRepo,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl PhotoRepository for GatedStore {
    async fn replace_photo_set(&self, location_id: &Uuid, urls: &[String]) -> Result<Vec<PhotoSummary>, AppError> {
        let written = self.inner.replace_photo_set(location_id, urls).await;
        self.entered.notify_one();
        self.release.notified().await;
        written
    }

    async fn list_photos(&self, location_id: &Uuid) -> Result<Vec<PhotoSummary>, AppError> {
        self.inner.list_photos(location_id).await
    }

    async fn get_photo_by_id(&self, id: &Uuid) -> Result<Photo, AppError> {
        self.inner.get_photo_by_id(id).await
    }

    async fn set_image_data(&self, id: &Uuid, data: &[u8]) -> Result<bool, AppError> {
        self.inner.set_image_data(id, data).await
    }

    async fn delete_photos(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        self.inner.delete_photos(ids).await
    }
}

/// Image fake that deletes the photo row while its bytes are in flight.
struct VanishingImages {
    pool: SqlitePool,
}

#[async_trait]
impl ImageDataRepository for VanishingImages {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        sqlx::query("DELETE FROM photos WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(PNG_BYTES.to_vec())
    }
}

#[tokio::test]
async fn first_open_fetches_page_one_and_stores_references() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos()
        .withf(|point, page, per_page| {
            *point == LocationPoint::new(37.7, -122.4) && *page == 1 && *per_page == 21
        })
        .times(1)
        .returning(|_, page, per_page| Ok(refs(page, per_page as usize)));

    let handler = handler(&pool, search, MockImages::new());

    let album = handler.open(location_id).await.unwrap();

    assert_eq!(album.state, AlbumState::Ready);
    assert_eq!(album.page, 1);
    assert_eq!(album.photos.len(), 21);
    assert!(album.photos.iter().all(|p| !p.has_image));
    assert_eq!(album.primary_action, PrimaryAction::NewCollection);
    assert_eq!(handler.state(location_id), AlbumState::Ready);

    let stored = handler.photo_repo.list_photos(&location_id).await.unwrap();
    assert_eq!(stored.len(), 21);
    assert_eq!(stored[0].url, "https://live.staticflickr.com/1/0_m.jpg");
}

#[tokio::test]
async fn reopening_uses_stored_photos_without_searching() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos()
        .times(1)
        .returning(|_, page, per_page| Ok(refs(page, per_page as usize)));

    let handler = handler(&pool, search, MockImages::new());

    let first = handler.open(location_id).await.unwrap();
    assert!(handler.close(location_id));
    assert_eq!(handler.state(location_id), AlbumState::Idle);

    let second = handler.open(location_id).await.unwrap();
    assert_eq!(second.photos, first.photos);
}

#[tokio::test]
async fn delete_selected_removes_only_the_selection() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos()
        .times(1)
        .returning(|_, page, per_page| Ok(refs(page, per_page as usize)));

    let handler = handler(&pool, search, MockImages::new());
    let album = handler.open(location_id).await.unwrap();
    let doomed = album.photos[3].id;

    let change = handler.toggle_select(location_id, doomed).unwrap();
    assert!(change.selected);
    assert_eq!(change.selection_count, 1);
    assert_eq!(change.primary_action, PrimaryAction::DeleteSelected);
    assert_eq!(change.primary_label, "Delete");

    let response = handler.request_new_collection(location_id).await.unwrap();

    assert_eq!(response.outcome, CollectionOutcome::DeletedSelected { removed: 1 });
    assert_eq!(response.album.state, AlbumState::Ready);
    assert_eq!(response.album.photos.len(), 20);
    assert!(response.album.selected.is_empty());
    assert!(response.album.photos.iter().all(|p| p.id != doomed));
    assert_eq!(response.album.primary_action, PrimaryAction::NewCollection);
    assert_eq!(response.album.primary_label, "New Collection");
    assert_eq!(handler.current_page(location_id), 1);
}

#[tokio::test]
async fn search_failure_marks_album_failed_and_leaves_store_alone() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos()
        .times(1)
        .returning(|_, _, _| Err(SearchError::HttpStatus(500)));

    let handler = handler(&pool, search, MockImages::new());

    let err = handler.open(location_id).await.unwrap_err();

    assert_eq!(err, PhotoSetError::Search(SearchError::HttpStatus(500)));
    assert!(err.is_retryable());
    assert_eq!(handler.state(location_id), AlbumState::Failed);
    assert!(handler.photo_repo.list_photos(&location_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_replace_keeps_previous_collection() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut seq = Sequence::new();
    let mut search = MockSearch::new();
    search.expect_search_photos()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, page, per_page| Ok(refs(page, per_page as usize)));
    search.expect_search_photos()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(SearchError::MalformedResponse("missing 'stat' field".into())));

    let handler = handler(&pool, search, MockImages::new());
    let before = handler.open(location_id).await.unwrap();

    let err = handler.request_new_collection(location_id).await.unwrap_err();
    assert!(matches!(err, PhotoSetError::Search(SearchError::MalformedResponse(_))));
    assert_eq!(handler.state(location_id), AlbumState::Failed);

    let stored: Vec<Uuid> = handler.photo_repo
        .list_photos(&location_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    let shown: Vec<Uuid> = before.photos.iter().map(|p| p.id).collect();
    assert_eq!(stored, shown);
}

#[tokio::test]
async fn page_counter_advances_and_retry_reuses_failed_page() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut seq = Sequence::new();
    let mut search = MockSearch::new();
    for (expected, fails) in [(1, false), (2, false), (3, true), (3, false)] {
        search.expect_search_photos()
            .withf(move |_, page, _| *page == expected)
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, page, per_page| {
                if fails {
                    Err(SearchError::Transport("connection reset".into()))
                } else {
                    Ok(refs(page, per_page as usize))
                }
            });
    }

    let handler = handler(&pool, search, MockImages::new());
    handler.open(location_id).await.unwrap();

    let second = handler.request_new_collection(location_id).await.unwrap();
    assert_eq!(second.outcome, CollectionOutcome::Replaced { page: 2, fetched: 21 });
    assert_eq!(second.album.page, 2);

    let failed = handler.request_new_collection(location_id).await.unwrap_err();
    assert!(matches!(failed, PhotoSetError::Search(SearchError::Transport(_))));
    assert_eq!(handler.current_page(location_id), 3);

    let retried = handler.request_new_collection(location_id).await.unwrap();
    assert_eq!(retried.outcome, CollectionOutcome::Replaced { page: 3, fetched: 21 });
    assert_eq!(retried.album.state, AlbumState::Ready);
    assert_eq!(retried.album.photos[0].url, "https://live.staticflickr.com/3/0_m.jpg");
}

#[tokio::test]
async fn discard_resets_page_counter() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos()
        .times(2)
        .returning(|_, page, per_page| Ok(refs(page, per_page as usize)));

    let handler = handler(&pool, search, MockImages::new());
    handler.open(location_id).await.unwrap();
    handler.request_new_collection(location_id).await.unwrap();
    assert_eq!(handler.current_page(location_id), 2);

    handler.discard(location_id);

    assert_eq!(handler.current_page(location_id), 1);
    assert_eq!(handler.state(location_id), AlbumState::Idle);
    assert_eq!(handler.open_albums(), 0);
}

#[tokio::test]
async fn operations_need_an_open_album() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;
    let handler = handler(&pool, MockSearch::new(), MockImages::new());

    assert_eq!(
        handler.request_new_collection(location_id).await.unwrap_err(),
        PhotoSetError::NotOpened(location_id)
    );
    assert_eq!(
        handler.toggle_select(location_id, Uuid::new_v4()).unwrap_err(),
        PhotoSetError::NotOpened(location_id)
    );
    assert!(matches!(
        handler.open(Uuid::new_v4()).await,
        Err(PhotoSetError::Store(AppError::NotFound(_)))
    ));
}

#[tokio::test]
async fn toggling_twice_restores_selection() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos()
        .returning(|_, page, per_page| Ok(refs(page, per_page as usize)));

    let handler = handler(&pool, search, MockImages::new());
    let album = handler.open(location_id).await.unwrap();
    let (a, b) = (album.photos[0].id, album.photos[5].id);

    handler.toggle_select(location_id, a).unwrap();
    let on = handler.toggle_select(location_id, b).unwrap();
    let off = handler.toggle_select(location_id, b).unwrap();

    assert_eq!(on.selection_count, 2);
    assert!(!off.selected);
    assert_eq!(off.selection_count, 1);

    let stranger = handler.toggle_select(location_id, Uuid::new_v4()).unwrap_err();
    assert!(matches!(stranger, PhotoSetError::Store(AppError::NotFound(_))));
}

#[tokio::test]
async fn ensure_payload_downloads_once() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos().returning(|_, page, _| Ok(refs(page, 2)));

    let mut images = MockImages::new();
    images.expect_fetch_image()
        .withf(|url| url == "https://live.staticflickr.com/1/0_m.jpg")
        .times(1)
        .returning(|_| Ok(PNG_BYTES.to_vec()));

    let handler = handler(&pool, search, images);
    let album = handler.open(location_id).await.unwrap();
    let photo_id = album.photos[0].id;

    let first = handler.ensure_payload(photo_id).await.unwrap();
    let second = handler.ensure_payload(photo_id).await.unwrap();

    assert_eq!(first, PNG_BYTES);
    assert_eq!(second, first);
    assert!(handler.photo_repo.get_photo_by_id(&photo_id).await.unwrap().has_image_data());
}

#[tokio::test]
async fn failed_download_is_not_cached() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos().returning(|_, page, _| Ok(refs(page, 1)));

    let mut images = MockImages::new();
    images.expect_fetch_image()
        .times(1)
        .returning(|_| Err(FetchError::HttpStatus(404)));

    let handler = handler(&pool, search, images);
    let photo_id = handler.open(location_id).await.unwrap().photos[0].id;

    let err = handler.ensure_payload(photo_id).await.unwrap_err();

    assert_eq!(err, PhotoSetError::Fetch(FetchError::HttpStatus(404)));
    assert!(!handler.photo_repo.get_photo_by_id(&photo_id).await.unwrap().has_image_data());
    assert!(matches!(
        handler.ensure_payload(Uuid::new_v4()).await,
        Err(PhotoSetError::Store(AppError::NotFound(_)))
    ));
}

#[tokio::test]
async fn prefetch_reports_each_outcome() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos().returning(|_, page, _| Ok(refs(page, 3)));

    let mut images = MockImages::new();
    images.expect_fetch_image()
        .withf(|url| url.ends_with("/1_m.jpg"))
        .times(1)
        .returning(|_| Ok(PNG_BYTES.to_vec()));
    images.expect_fetch_image()
        .withf(|url| url.ends_with("/2_m.jpg"))
        .times(1)
        .returning(|_| Err(FetchError::Transport("timed out".into())));

    let handler = handler(&pool, search, images).with_prefetch_concurrency(2);
    let album = handler.open(location_id).await.unwrap();
    handler.photo_repo.set_image_data(&album.photos[0].id, PNG_BYTES).await.unwrap();

    let report = handler.prefetch_payloads(location_id).await.unwrap();

    assert_eq!((report.fetched, report.cached, report.failed), (1, 1, 1));
}

#[tokio::test]
async fn concurrent_requests_are_busy_while_searching() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let search = GatedSearch { entered: entered.clone(), release: release.clone() };
    let handler = Arc::new(handler(&pool, search, MockImages::new()));

    let opening = tokio::spawn({
        let handler = handler.clone();
        async move { handler.open(location_id).await }
    });
    entered.notified().await;

    assert_eq!(handler.state(location_id), AlbumState::Loading);
    assert_eq!(
        handler.request_new_collection(location_id).await.unwrap_err(),
        PhotoSetError::Busy(location_id)
    );
    assert_eq!(
        handler.toggle_select(location_id, Uuid::new_v4()).unwrap_err(),
        PhotoSetError::Busy(location_id)
    );

    release.notify_one();
    let album = opening.await.unwrap().unwrap();

    assert_eq!(album.state, AlbumState::Ready);
    assert_eq!(album.photos.len(), 21);
}

#[tokio::test]
async fn closing_during_search_discards_the_result() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let search = GatedSearch { entered: entered.clone(), release: release.clone() };
    let handler = Arc::new(handler(&pool, search, MockImages::new()));

    let opening = tokio::spawn({
        let handler = handler.clone();
        async move { handler.open(location_id).await }
    });
    entered.notified().await;

    assert!(handler.close(location_id));
    release.notify_one();

    let err = opening.await.unwrap().unwrap_err();

    assert_eq!(err, PhotoSetError::Superseded(location_id));
    assert_eq!(handler.state(location_id), AlbumState::Idle);
    assert!(handler.photo_repo.list_photos(&location_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn closing_during_store_write_is_superseded() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos()
        .times(1)
        .returning(|_, page, per_page| Ok(refs(page, per_page as usize)));

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let store = GatedStore {
        inner: SqlxPhotoRepo::new(pool.clone()),
        entered: entered.clone(),
        release: release.clone(),
    };
    let handler = Arc::new(PhotoSetHandler::new(
        SqlxLocationRepo::new(pool.clone()),
        store,
        search,
        MockImages::new(),
    ));

    let opening = tokio::spawn({
        let handler = handler.clone();
        async move { handler.open(location_id).await }
    });
    entered.notified().await;

    assert!(handler.close(location_id));
    release.notify_one();

    let err = opening.await.unwrap().unwrap_err();

    assert_eq!(err, PhotoSetError::Superseded(location_id));
    assert_eq!(handler.state(location_id), AlbumState::Idle);
    // The committed page stays in the store for the next open.
    assert_eq!(handler.photo_repo.list_photos(&location_id).await.unwrap().len(), 21);
}

#[tokio::test]
async fn photo_deleted_during_download_still_returns_bytes() {
    let pool = memory_pool().await;
    let location_id = insert_location(&pool, 37.7, -122.4).await;

    let mut search = MockSearch::new();
    search.expect_search_photos().returning(|_, page, _| Ok(refs(page, 2)));

    let handler = handler(&pool, search, VanishingImages { pool: pool.clone() });
    let album = handler.open(location_id).await.unwrap();
    let photo_id = album.photos[0].id;

    let data = handler.ensure_payload(photo_id).await.unwrap();

    assert_eq!(data, PNG_BYTES);
    assert!(matches!(
        handler.photo_repo.get_photo_by_id(&photo_id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(handler.photo_repo.list_photos(&location_id).await.unwrap().len(), 1);
}
