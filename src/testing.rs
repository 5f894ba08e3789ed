//! Test fixtures shared across module tests.

use crate::memory_store::MemoryStore;
use crate::models::{Image, NamedRef, PartialDate, RecordId, Species, SpecimenRecord};

pub fn hemileuca() -> Species {
    Species {
        id: 1,
        genus: "Hemileuca".to_string(),
        epithet: "eglanterina".to_string(),
    }
}

pub fn acronicta() -> Species {
    Species {
        id: 2,
        genus: "Acronicta".to_string(),
        epithet: "americana".to_string(),
    }
}

/// Oregon, Lane County, 2001-06-04, UBC collection.
pub fn record(id: RecordId, species: &Species) -> SpecimenRecord {
    SpecimenRecord {
        id,
        species: species.clone(),
        record_type: Some("Specimen".to_string()),
        latitude: Some(44.05),
        longitude: Some(-123.09),
        state: Some(NamedRef::new(1, "OR")),
        county: Some(NamedRef::new(3, "Lane")),
        locality: Some("Spencer Butte".to_string()),
        elevation: None,
        date: PartialDate::new(2001, 6, 4),
        collector: Some(NamedRef::new(9, "J. Smith")),
        collection: Some(NamedRef::new(2, "UBC")),
    }
}

/// Image 100 labelled with record A (1); record B (2) duplicates it.
pub fn scenario_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let species = hemileuca();
    store.insert_record(record(1, &species));
    let mut b = record(2, &species);
    b.locality = Some("Eugene".to_string());
    store.insert_record(b);
    store.insert_image(Image {
        id: 100,
        species_id: species.id,
        record_id: 1,
    });
    store
}
