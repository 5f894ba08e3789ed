//! In-memory record store with the same semantics as `SqliteStore`.
//!
//! Backed by ordered maps so iteration order is the id order the SQLite
//! queries use.

use std::collections::BTreeMap;

use crate::models::{Image, ImageId, MatchKey, RecordId, Species, SpeciesId, SpecimenRecord};
use crate::store::{Reassignment, RecordStore, SaveMode, StoreError};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryStore {
    species: BTreeMap<SpeciesId, Species>,
    records: BTreeMap<RecordId, SpecimenRecord>,
    images: BTreeMap<ImageId, Image>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the record, registering its species if it is new.
    pub fn insert_record(&mut self, record: SpecimenRecord) {
        self.species
            .entry(record.species.id)
            .or_insert_with(|| record.species.clone());
        self.records.insert(record.id, record);
    }

    pub fn insert_image(&mut self, image: Image) {
        self.images.insert(image.id, image);
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    fn referencing_image(&self, record: RecordId, except: Option<ImageId>) -> Option<ImageId> {
        self.images
            .values()
            .find(|image| image.record_id == record && Some(image.id) != except)
            .map(|image| image.id)
    }
}

impl RecordStore for MemoryStore {
    fn species_with_images(&self) -> Result<Vec<Species>, StoreError> {
        let mut species: Vec<Species> = self
            .species
            .values()
            .filter(|s| self.images.values().any(|image| image.species_id == s.id))
            .cloned()
            .collect();
        species.sort_by(|a, b| {
            a.genus
                .cmp(&b.genus)
                .then_with(|| a.epithet.cmp(&b.epithet))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(species)
    }

    fn find_species(&self, genus: &str, epithet: &str) -> Result<Option<Species>, StoreError> {
        Ok(self
            .species
            .values()
            .find(|s| s.genus == genus && s.epithet == epithet)
            .cloned())
    }

    fn images_for_species(&self, species: SpeciesId) -> Result<Vec<Image>, StoreError> {
        Ok(self
            .images
            .values()
            .filter(|image| image.species_id == species)
            .copied()
            .collect())
    }

    fn image(&self, id: ImageId) -> Result<Option<Image>, StoreError> {
        Ok(self.images.get(&id).copied())
    }

    fn record(&self, id: RecordId) -> Result<Option<SpecimenRecord>, StoreError> {
        Ok(self.records.get(&id).cloned())
    }

    fn find_matching(
        &self,
        key: &MatchKey,
        exclude: RecordId,
    ) -> Result<Vec<SpecimenRecord>, StoreError> {
        Ok(self
            .records
            .values()
            .filter(|r| r.id != exclude && r.match_key() == *key)
            .cloned()
            .collect())
    }

    fn image_for_record(&self, record: RecordId) -> Result<Option<ImageId>, StoreError> {
        Ok(self.referencing_image(record, None))
    }

    fn delete_record(&mut self, id: RecordId) -> Result<(), StoreError> {
        if let Some(image) = self.referencing_image(id, None) {
            return Err(StoreError::RecordInUse { record: id, image });
        }
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RecordNotFound(id))
    }

    fn reassign_image(
        &mut self,
        image: ImageId,
        record: RecordId,
        mode: SaveMode,
    ) -> Result<Reassignment, StoreError> {
        if !self.records.contains_key(&record) {
            return Err(StoreError::RecordNotFound(record));
        }
        let entry = self
            .images
            .get_mut(&image)
            .ok_or(StoreError::ImageNotFound(image))?;
        let previous = entry.record_id;
        entry.record_id = record;

        let mut previous_deleted = false;
        if mode == SaveMode::DiscardOld
            && previous != record
            && self.referencing_image(previous, Some(image)).is_none()
        {
            previous_deleted = self.records.remove(&previous).is_some();
        }

        Ok(Reassignment {
            previous,
            previous_deleted,
        })
    }
}
