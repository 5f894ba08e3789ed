//! Record store interface.
//!
//! The matcher, engine and session only ever talk to a `RecordStore`, which
//! is handed to them explicitly. `SqliteStore` is the real backend;
//! `MemoryStore` is an isolated fake with identical semantics.

use thiserror::Error;

use crate::models::{Image, ImageId, MatchKey, RecordId, Species, SpeciesId, SpecimenRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("specimen record {0} not found")]
    RecordNotFound(RecordId),
    #[error("image {0} not found")]
    ImageNotFound(ImageId),
    #[error("specimen record {record} is still the label of image {image}")]
    RecordInUse { record: RecordId, image: ImageId },
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// What happens to an image's previous record when the image is saved with a
/// new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveMode {
    /// Delete the previous record if it still exists and no other image uses it.
    DiscardOld,
    /// Leave the previous record in the store.
    RetainOld,
}

/// Result of saving an image with a new record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reassignment {
    pub previous: RecordId,
    pub previous_deleted: bool,
}

pub trait RecordStore {
    /// Distinct species that have at least one image with a label,
    /// ordered by genus then epithet.
    fn species_with_images(&self) -> Result<Vec<Species>, StoreError>;

    /// Exact lookup by genus and epithet.
    fn find_species(&self, genus: &str, epithet: &str) -> Result<Option<Species>, StoreError>;

    /// Images of a species, ordered by image id.
    fn images_for_species(&self, species: SpeciesId) -> Result<Vec<Image>, StoreError>;

    fn image(&self, id: ImageId) -> Result<Option<Image>, StoreError>;

    fn record(&self, id: RecordId) -> Result<Option<SpecimenRecord>, StoreError>;

    /// Records whose match key equals `key`, excluding `exclude`, ordered by id.
    fn find_matching(
        &self,
        key: &MatchKey,
        exclude: RecordId,
    ) -> Result<Vec<SpecimenRecord>, StoreError>;

    /// Some image currently labelled with `record`, if any.
    fn image_for_record(&self, record: RecordId) -> Result<Option<ImageId>, StoreError>;

    /// Delete a record. Refused with `RecordInUse` while an image points at it.
    fn delete_record(&mut self, id: RecordId) -> Result<(), StoreError>;

    /// Point an image at `record` and persist it.
    fn reassign_image(
        &mut self,
        image: ImageId,
        record: RecordId,
        mode: SaveMode,
    ) -> Result<Reassignment, StoreError>;
}
