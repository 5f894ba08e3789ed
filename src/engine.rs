//! Resolution engine: applies one operator decision to an (image, candidate)
//! pair. Every mutation is committed as soon as it is applied.

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::models::{Image, ImageId, RecordId, SpecimenRecord};
use crate::store::{RecordStore, SaveMode, StoreError};

/// The four things an operator can do with a matching record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Delete the current label and use the candidate instead
    ReplaceAndDeleteOld,
    /// Use the candidate as the label, keep the old label in the store
    ReplaceAndKeepOld,
    /// Delete the candidate, leave the label alone
    DeleteCandidate,
    NoChange,
}

impl Decision {
    pub const ALL: [Decision; 4] = [
        Decision::ReplaceAndDeleteOld,
        Decision::ReplaceAndKeepOld,
        Decision::DeleteCandidate,
        Decision::NoChange,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            Decision::ReplaceAndDeleteOld => "Delete current label and replace with this record",
            Decision::ReplaceAndKeepOld => {
                "Replace current label with this record, but keep old label in database"
            }
            Decision::DeleteCandidate => {
                "Delete matching record from database, and leave label unchanged"
            }
            Decision::NoChange => "Make no changes",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Replaced {
        previous: RecordId,
        current: RecordId,
        previous_deleted: bool,
    },
    CandidateDeleted(RecordId),
    /// The candidate is another image's label and was left in place.
    CandidateInUse { candidate: RecordId, image: ImageId },
    Unchanged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Replaced {
                previous_deleted: true,
                ..
            } => write!(f, "Original label deleted, and matching record now used"),
            Outcome::Replaced { previous, .. } => write!(
                f,
                "Matching record now used as label, and old label {} kept in database",
                previous
            ),
            Outcome::CandidateDeleted(_) => {
                write!(f, "Matching record deleted, no changes made to label")
            }
            Outcome::CandidateInUse { candidate, image } => write!(
                f,
                "Matching record {} is the label of image {}, so it was not deleted. No changes made",
                candidate, image
            ),
            Outcome::Unchanged => write!(f, "No changes made"),
        }
    }
}

pub struct ResolutionEngine<'a, S: RecordStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: RecordStore + ?Sized> ResolutionEngine<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Apply `decision` to the pair. On a replacement, `image` is updated to
    /// point at the candidate.
    pub fn resolve(
        &mut self,
        image: &mut Image,
        candidate: &SpecimenRecord,
        decision: Decision,
    ) -> Result<Outcome, StoreError> {
        match decision {
            Decision::ReplaceAndDeleteOld | Decision::ReplaceAndKeepOld => {
                let mode = if decision == Decision::ReplaceAndDeleteOld {
                    SaveMode::DiscardOld
                } else {
                    SaveMode::RetainOld
                };
                // The image moves first so the old label is never deleted while referenced.
                let saved = self.store.reassign_image(image.id, candidate.id, mode)?;
                image.record_id = candidate.id;

                if mode == SaveMode::DiscardOld && !saved.previous_deleted {
                    warn!(
                        image = image.id,
                        previous = saved.previous,
                        "old label still referenced by another image, kept in store"
                    );
                }
                info!(
                    image = image.id,
                    previous = saved.previous,
                    current = candidate.id,
                    previous_deleted = saved.previous_deleted,
                    "label replaced"
                );
                Ok(Outcome::Replaced {
                    previous: saved.previous,
                    current: candidate.id,
                    previous_deleted: saved.previous_deleted,
                })
            }
            Decision::DeleteCandidate => {
                if let Some(owner) = self.store.image_for_record(candidate.id)? {
                    warn!(
                        candidate = candidate.id,
                        owner, "candidate is another image's label, not deleted"
                    );
                    return Ok(Outcome::CandidateInUse {
                        candidate: candidate.id,
                        image: owner,
                    });
                }
                self.store.delete_record(candidate.id)?;
                info!(image = image.id, candidate = candidate.id, "candidate deleted");
                Ok(Outcome::CandidateDeleted(candidate.id))
            }
            Decision::NoChange => {
                info!(image = image.id, candidate = candidate.id, "no change");
                Ok(Outcome::Unchanged)
            }
        }
    }
}
