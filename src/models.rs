//! Core data models for label matching.
//!
//! Specimen records, the images that point at them, and the exact-match key
//! used to pair an image label with its duplicates.

use serde::Serialize;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Row id of a species
pub type SpeciesId = i64;

/// Row id of a specimen record
pub type RecordId = i64;

/// Row id of a species image
pub type ImageId = i64;

/// Row id of a lookup table entry (state, county, collector, collection)
pub type RefId = i64;

// ============================================================================
// Lookup References
// ============================================================================

/// A nullable foreign field resolved to its display name.
/// Equality for matching purposes is by `id` only.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedRef {
    pub id: RefId,
    pub name: String,
}

impl NamedRef {
    pub fn new(id: RefId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// ============================================================================
// Species
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Species {
    pub id: SpeciesId,
    pub genus: String,
    pub epithet: String,
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.genus, self.epithet)
    }
}

// ============================================================================
// Specimen Records
// ============================================================================

/// Collection date, any part of which may be unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
}

impl PartialDate {
    pub fn new(year: i32, month: i32, day: i32) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
        }
    }
}

impl fmt::Display for PartialDate {
    /// `2001-06-04`, with `??` standing in for unknown parts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year.is_none() && self.month.is_none() && self.day.is_none() {
            return write!(f, "-");
        }
        match self.year {
            Some(y) => write!(f, "{:04}", y)?,
            None => write!(f, "????")?,
        }
        for part in [self.month, self.day] {
            match part {
                Some(p) => write!(f, "-{:02}", p)?,
                None => write!(f, "-??")?,
            }
        }
        Ok(())
    }
}

/// A canonical observation. An image label has the same shape.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecimenRecord {
    pub id: RecordId,
    pub species: Species,
    pub record_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub state: Option<NamedRef>,
    pub county: Option<NamedRef>,
    pub locality: Option<String>,
    pub elevation: Option<String>,
    pub date: PartialDate,
    pub collector: Option<NamedRef>,
    pub collection: Option<NamedRef>,
}

impl SpecimenRecord {
    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            species: self.species.id,
            year: self.date.year,
            month: self.date.month,
            day: self.date.day,
            state: self.state.as_ref().map(|r| r.id),
            county: self.county.as_ref().map(|r| r.id),
            collection: self.collection.as_ref().map(|r| r.id),
        }
    }
}

/// The tuple two records must share exactly to be considered duplicates.
/// `None` only equals `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub species: SpeciesId,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
    pub state: Option<RefId>,
    pub county: Option<RefId>,
    pub collection: Option<RefId>,
}

// ============================================================================
// Images
// ============================================================================

/// A species image and the record it currently uses as its label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Image {
    pub id: ImageId,
    pub species_id: SpeciesId,
    pub record_id: RecordId,
}
