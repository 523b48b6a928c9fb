use std::{collections::HashSet, sync::Arc};

use dashmap::DashMap;
use futures::{stream, StreamExt};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    constants::DEFAULT_PHOTOS_PER_PAGE,
    entities::{
        album::{AlbumState, AlbumView, CollectionOutcome, NewCollectionResponse, PrimaryAction, SelectionChange},
        location::Location,
        photo::{PhotoResponse, PhotoSummary, PrefetchReport},
    },
    errors::{AppError, PhotoSetError},
    repositories::{
        image_data::ImageDataRepository,
        location::LocationRepository,
        photo::PhotoRepository,
        photo_search::PhotoSearchRepository,
    },
};

/// Drives the photo album of each location: cached or fresh pages, selection, and image downloads.
///
/// Every location gets one session. Mutating operations hold that session's lock across the
/// remote search and the store write, so a location never has two searches in flight.
pub struct PhotoSetHandler<L, P, S, F>
where
    L: LocationRepository,
    P: PhotoRepository,
    S: PhotoSearchRepository,
    F: ImageDataRepository,
{
    pub location_repo: L,
    pub photo_repo: P,
    pub search_service: S,
    pub image_service: F,
    per_page: u32,
    prefetch_concurrency: usize,
    sessions: DashMap<Uuid, Arc<AlbumSlot>>,
    pages: DashMap<Uuid, u32>,
}

#[derive(Default)]
struct AlbumSlot {
    session: Mutex<AlbumSession>,
}

#[derive(Debug, Default)]
struct AlbumSession {
    state: AlbumState,
    photo_ids: Vec<Uuid>,
    selection: HashSet<Uuid>,
}

impl AlbumSession {
    fn ready(&mut self, photos: &[PhotoSummary]) {
        self.state = AlbumState::Ready;
        self.photo_ids = photos.iter().map(|photo| photo.id).collect();

        let current = &self.photo_ids;
        self.selection.retain(|id| current.contains(id));
    }

    fn fail(&mut self) {
        self.state = AlbumState::Failed;
        self.selection.clear();
    }

    /// Flips membership of `photo_id` and reports whether it is now selected.
    fn toggle(&mut self, photo_id: Uuid) -> bool {
        if self.selection.remove(&photo_id) {
            false
        } else {
            self.selection.insert(photo_id);
            true
        }
    }

    /// Selected ids that are still part of the album, in album order.
    fn selected_ids(&self) -> Vec<Uuid> {
        self.photo_ids
            .iter()
            .filter(|id| self.selection.contains(id))
            .copied()
            .collect()
    }
}

impl<L, P, S, F> PhotoSetHandler<L, P, S, F>
where
    L: LocationRepository,
    P: PhotoRepository,
    S: PhotoSearchRepository,
    F: ImageDataRepository,
{
    pub fn new(location_repo: L, photo_repo: P, search_service: S, image_service: F) -> Self {
        PhotoSetHandler {
            location_repo,
            photo_repo,
            search_service,
            image_service,
            per_page: DEFAULT_PHOTOS_PER_PAGE,
            prefetch_concurrency: 4,
            sessions: DashMap::new(),
            pages: DashMap::new(),
        }
    }

    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_prefetch_concurrency(mut self, concurrency: usize) -> Self {
        self.prefetch_concurrency = concurrency.max(1);
        self
    }

    /// Shows the album for a location, searching page 1 when nothing is stored yet.
    pub async fn open(&self, location_id: Uuid) -> Result<AlbumView, PhotoSetError> {
        let location = self.location_repo.get_location_by_id(&location_id).await?;
        let slot = self.slot(location_id);
        let mut session = slot.session.lock().await;

        let photos = self.photo_repo.list_photos(&location_id).await?;
        if !photos.is_empty() {
            session.ready(&photos);
            tracing::debug!(location_id = %location_id, count = photos.len(), "Album opened from store");
            return Ok(self.view(location_id, &session, &photos));
        }

        let page = self.current_page(location_id);
        let photos = self.load_page(&location, &slot, &mut session, page).await?;

        Ok(self.view(location_id, &session, &photos))
    }

    /// Deletes the selected photos, or replaces the whole album with the next page when
    /// nothing is selected. A failed album retries the page that failed.
    pub async fn request_new_collection(&self, location_id: Uuid) -> Result<NewCollectionResponse, PhotoSetError> {
        let location = self.location_repo.get_location_by_id(&location_id).await?;
        let slot = self.existing_slot(&location_id)
            .ok_or(PhotoSetError::NotOpened(location_id))?;
        let mut session = slot.session
            .try_lock()
            .map_err(|_| PhotoSetError::Busy(location_id))?;

        let state = session.state;
        let (outcome, photos) = match state {
            AlbumState::Idle => return Err(PhotoSetError::NotOpened(location_id)),
            AlbumState::Ready if !session.selection.is_empty() => {
                let doomed = session.selected_ids();
                let removed = self.photo_repo.delete_photos(&doomed).await?;
                session.selection.clear();

                let photos = self.photo_repo.list_photos(&location_id).await?;
                session.ready(&photos);
                tracing::info!(location_id = %location_id, removed, "Deleted selected photos");

                (CollectionOutcome::DeletedSelected { removed }, photos)
            }
            AlbumState::Ready => {
                let page = self.advance_page(location_id);
                let photos = self.load_page(&location, &slot, &mut session, page).await?;
                (CollectionOutcome::Replaced { page, fetched: photos.len() }, photos)
            }
            // Loading is only seen here when a previous request was dropped mid-search.
            AlbumState::Failed | AlbumState::Loading => {
                let page = self.current_page(location_id);
                let photos = self.load_page(&location, &slot, &mut session, page).await?;
                (CollectionOutcome::Replaced { page, fetched: photos.len() }, photos)
            }
        };

        Ok(NewCollectionResponse {
            outcome,
            album: self.view(location_id, &session, &photos),
        })
    }

    pub fn toggle_select(&self, location_id: Uuid, photo_id: Uuid) -> Result<SelectionChange, PhotoSetError> {
        let slot = self.existing_slot(&location_id)
            .ok_or(PhotoSetError::NotOpened(location_id))?;
        let mut session = slot.session
            .try_lock()
            .map_err(|_| PhotoSetError::Busy(location_id))?;

        if session.state != AlbumState::Ready {
            return Err(PhotoSetError::NotOpened(location_id));
        }
        if !session.photo_ids.contains(&photo_id) {
            return Err(AppError::NotFound("Photo is not part of this album".to_string()).into());
        }

        let selected = session.toggle(photo_id);
        let selection_count = session.selection.len();
        let primary_action = PrimaryAction::for_selection(selection_count);

        Ok(SelectionChange {
            photo_id,
            selected,
            selection_count,
            primary_action,
            primary_label: primary_action.label(),
        })
    }

    /// Returns the photo's bytes, downloading and caching them on first use.
    pub async fn ensure_payload(&self, photo_id: Uuid) -> Result<Vec<u8>, PhotoSetError> {
        let photo = self.photo_repo.get_photo_by_id(&photo_id).await?;
        if let Some(data) = photo.image_data {
            return Ok(data);
        }

        let data = self.image_service
            .fetch_image(&photo.url)
            .await
            .map_err(|e| {
                tracing::warn!(photo_id = %photo_id, url = %photo.url, error = %e, "Image download failed");
                PhotoSetError::from(e)
            })?;

        if !self.photo_repo.set_image_data(&photo_id, &data).await? {
            tracing::debug!(photo_id = %photo_id, "Photo removed during download; bytes not cached");
        }

        Ok(data)
    }

    /// Downloads every missing image of the album with bounded concurrency.
    pub async fn prefetch_payloads(&self, location_id: Uuid) -> Result<PrefetchReport, PhotoSetError> {
        self.location_repo.get_location_by_id(&location_id).await?;
        let photos = self.photo_repo.list_photos(&location_id).await?;

        let mut report = PrefetchReport::default();
        let mut missing = Vec::new();
        for photo in &photos {
            if photo.has_image {
                report.cached += 1;
            } else {
                missing.push(photo.id);
            }
        }

        let results: Vec<_> = stream::iter(missing)
            .map(|photo_id| self.ensure_payload(photo_id))
            .buffer_unordered(self.prefetch_concurrency)
            .collect()
            .await;

        for result in results {
            match result {
                Ok(_) => report.fetched += 1,
                Err(_) => report.failed += 1,
            }
        }

        tracing::info!(
            location_id = %location_id,
            fetched = report.fetched,
            cached = report.cached,
            failed = report.failed,
            "Prefetched album images"
        );

        Ok(report)
    }

    /// Leaves the album. A search still running for it will not be applied.
    pub fn close(&self, location_id: Uuid) -> bool {
        self.sessions.remove(&location_id).is_some()
    }

    /// Forgets everything held for a location, including its page counter.
    pub fn discard(&self, location_id: Uuid) {
        self.close(location_id);
        self.pages.remove(&location_id);
    }

    /// Current album state. Reports `Loading` while another operation holds the album.
    pub fn state(&self, location_id: Uuid) -> AlbumState {
        match self.existing_slot(&location_id) {
            Some(slot) => slot.session
                .try_lock()
                .map(|session| session.state)
                .unwrap_or(AlbumState::Loading),
            None => AlbumState::Idle,
        }
    }

    pub fn open_albums(&self) -> usize {
        self.sessions.len()
    }

    pub fn current_page(&self, location_id: Uuid) -> u32 {
        self.pages.get(&location_id).map(|page| *page).unwrap_or(1)
    }

    async fn load_page(
        &self,
        location: &Location,
        slot: &Arc<AlbumSlot>,
        session: &mut AlbumSession,
        page: u32,
    ) -> Result<Vec<PhotoSummary>, PhotoSetError> {
        session.state = AlbumState::Loading;

        let result = self.search_service
            .search_photos(&location.point(), page, self.per_page)
            .await;

        if !self.is_current(&location.id, slot) {
            tracing::warn!(location_id = %location.id, page, "Album closed during search; result discarded");
            return Err(PhotoSetError::Superseded(location.id));
        }

        let references = match result {
            Ok(references) => references,
            Err(e) => {
                tracing::warn!(location_id = %location.id, page, error = %e, "Photo search failed");
                session.fail();
                return Err(e.into());
            }
        };

        let urls: Vec<String> = references.into_iter().map(|reference| reference.url).collect();
        let photos = match self.photo_repo.replace_photo_set(&location.id, &urls).await {
            Ok(photos) => photos,
            Err(e) => {
                session.fail();
                return Err(e.into());
            }
        };

        // The new set is committed either way; a closed album just never shows it.
        if !self.is_current(&location.id, slot) {
            tracing::warn!(location_id = %location.id, page, "Album closed during store write; page not shown");
            return Err(PhotoSetError::Superseded(location.id));
        }

        session.ready(&photos);
        tracing::info!(location_id = %location.id, page, count = photos.len(), "Loaded photo page");
        Ok(photos)
    }

    fn view(&self, location_id: Uuid, session: &AlbumSession, photos: &[PhotoSummary]) -> AlbumView {
        let selected = session.selected_ids();
        let primary_action = PrimaryAction::for_selection(selected.len());

        AlbumView {
            location_id,
            state: session.state,
            page: self.current_page(location_id),
            photos: photos.iter().map(PhotoResponse::from).collect(),
            primary_action,
            primary_label: primary_action.label(),
            selected,
        }
    }

    fn slot(&self, location_id: Uuid) -> Arc<AlbumSlot> {
        Arc::clone(self.sessions.entry(location_id).or_default().value())
    }

    fn existing_slot(&self, location_id: &Uuid) -> Option<Arc<AlbumSlot>> {
        self.sessions.get(location_id).map(|slot| Arc::clone(slot.value()))
    }

    fn is_current(&self, location_id: &Uuid, slot: &Arc<AlbumSlot>) -> bool {
        self.sessions
            .get(location_id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), slot))
    }

    fn advance_page(&self, location_id: Uuid) -> u32 {
        let mut page = self.pages.entry(location_id).or_insert(1);
        *page += 1;
        *page
    }
}
