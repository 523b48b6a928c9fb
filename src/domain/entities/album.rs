use serde::Serialize;
use uuid::Uuid;

use crate::entities::photo::PhotoResponse;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What the album's main button does right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryAction {
    NewCollection,
    DeleteSelected,
}

impl PrimaryAction {
    pub fn for_selection(selection_count: usize) -> Self {
        if selection_count > 0 {
            PrimaryAction::DeleteSelected
        } else {
            PrimaryAction::NewCollection
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrimaryAction::NewCollection => "New Collection",
            PrimaryAction::DeleteSelected => "Delete",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumView {
    pub location_id: Uuid,
    pub state: AlbumState,
    pub page: u32,
    pub photos: Vec<PhotoResponse>,
    pub selected: Vec<Uuid>,
    pub primary_action: PrimaryAction,
    pub primary_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionChange {
    pub photo_id: Uuid,
    pub selected: bool,
    pub selection_count: usize,
    pub primary_action: PrimaryAction,
    pub primary_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CollectionOutcome {
    DeletedSelected { removed: u64 },
    Replaced { page: u32, fetched: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCollectionResponse {
    pub outcome: CollectionOutcome,
    pub album: AlbumView,
}
