//! Candidate matching: find every specimen record that duplicates an image
//! label on (species, year, month, day, state, county, collection).

use crate::models::{SpeciesId, SpecimenRecord};
use crate::store::{RecordStore, StoreError};

pub struct CandidateMatcher<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> CandidateMatcher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Records of `species` sharing the label's match key, excluding the label
    /// itself, ordered by record id. An empty result is normal.
    pub fn find_candidates(
        &self,
        species: SpeciesId,
        label: &SpecimenRecord,
    ) -> Result<Vec<SpecimenRecord>, StoreError> {
        let mut key = label.match_key();
        key.species = species;

        let mut candidates = self.store.find_matching(&key, label.id)?;
        candidates.sort_by_key(|r| r.id);
        Ok(candidates)
    }
}
