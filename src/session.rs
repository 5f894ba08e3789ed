//! Session driver: walks species and their images, presents each matching
//! record to the operator and applies the chosen decision.

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::console::{Console, PromptError};
use crate::engine::{Outcome, ResolutionEngine};
use crate::grid::render_grid;
use crate::interrupt::FAREWELL;
use crate::matcher::CandidateMatcher;
use crate::models::{ImageId, RecordId, Species};
use crate::protocol::DecisionProtocol;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl ResolveError {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ResolveError::Prompt(PromptError::Interrupted))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpeciesNameError {
    #[error("Species name must be two words (genus species)")]
    NotTwoWords,
}

/// Split "Genus epithet" into its two words.
pub fn parse_species_name(name: &str) -> Result<(&str, &str), SpeciesNameError> {
    let mut words = name.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(genus), Some(epithet), None) => Ok((genus, epithet)),
        _ => Err(SpeciesNameError::NotTwoWords),
    }
}

/// Counts of what happened during a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub species: usize,
    pub images: usize,
    pub images_with_matches: usize,
    pub candidates_presented: usize,
    pub candidates_skipped: usize,
    pub labels_replaced: usize,
    pub old_labels_deleted: usize,
    pub candidates_deleted: usize,
    pub candidates_in_use: usize,
    pub unchanged: usize,
}

impl SessionStats {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Replaced {
                previous_deleted, ..
            } => {
                self.labels_replaced += 1;
                if *previous_deleted {
                    self.old_labels_deleted += 1;
                }
            }
            Outcome::CandidateDeleted(_) => self.candidates_deleted += 1,
            Outcome::CandidateInUse { .. } => self.candidates_in_use += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:=<60}", "")?;
        writeln!(f, "Session summary")?;
        writeln!(f, "  Species examined:     {}", self.species)?;
        writeln!(f, "  Images examined:      {}", self.images)?;
        writeln!(f, "  Images with matches:  {}", self.images_with_matches)?;
        writeln!(f, "  Matches presented:    {}", self.candidates_presented)?;
        writeln!(f, "  Matches already seen: {}", self.candidates_skipped)?;
        writeln!(f, "  Labels replaced:      {}", self.labels_replaced)?;
        writeln!(f, "  Old labels deleted:   {}", self.old_labels_deleted)?;
        writeln!(f, "  Matches deleted:      {}", self.candidates_deleted)?;
        writeln!(f, "  Unchanged:            {}", self.unchanged + self.candidates_in_use)?;
        write!(f, "{:=<60}", "")
    }
}

enum Flow {
    Continue,
    Done,
}

pub struct Session<'a, S: RecordStore + ?Sized, P, R, W> {
    store: &'a mut S,
    protocol: P,
    console: Console<R, W>,
    decided: FxHashSet<(ImageId, RecordId)>,
    stats: SessionStats,
}

impl<'a, S, P, R, W> Session<'a, S, P, R, W>
where
    S: RecordStore + ?Sized,
    P: DecisionProtocol,
    R: BufRead,
    W: Write,
{
    pub fn new(store: &'a mut S, protocol: P, console: Console<R, W>) -> Self {
        Self {
            store,
            protocol,
            console,
            decided: FxHashSet::default(),
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn console(&self) -> &Console<R, W> {
        &self.console
    }

    /// Top-level loop. Returns after mode 1 has drained every species or
    /// after the operator interrupts.
    pub fn run(&mut self) -> Result<(), ResolveError> {
        loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Done) => return Ok(()),
                Err(err) if err.is_interrupt() => {
                    info!("operator interrupted session");
                    self.console.blank()?;
                    self.console.say(FAREWELL)?;
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn step(&mut self) -> Result<Flow, ResolveError> {
        let option = self.console.prompt(
            "Enter 1 to find records for all species images, or 2 to examine images from a select species: ",
        )?;
        self.console.blank()?;

        match option.as_str() {
            "1" => {
                self.run_all_species()?;
                Ok(Flow::Done)
            }
            "2" => {
                let name = self.console.prompt("Enter species name: ")?;
                self.console.blank()?;
                self.run_named_species(&name)?;
                Ok(Flow::Continue)
            }
            _ => {
                self.console.say(format!(
                    "Entered text '{}' not a valid option. Please enter 1 or 2.",
                    option
                ))?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Mode 1: every species with at least one labelled image, by genus then epithet.
    pub fn run_all_species(&mut self) -> Result<(), ResolveError> {
        let species = self.store.species_with_images()?;
        info!(count = species.len(), "matching all species");
        for s in &species {
            self.console.say(format!("{} images:", s))?;
            self.match_species(s)?;
        }
        Ok(())
    }

    /// Mode 2: one species by name. Returns false when the name is malformed
    /// or unknown; the operator has already been told why.
    pub fn run_named_species(&mut self, name: &str) -> Result<bool, ResolveError> {
        let (genus, epithet) = match parse_species_name(name) {
            Ok(parts) => parts,
            Err(err) => {
                self.console.say(err)?;
                return Ok(false);
            }
        };
        match self.store.find_species(genus, epithet)? {
            Some(species) => {
                self.match_species(&species)?;
                Ok(true)
            }
            None => {
                warn!(genus, epithet, "species not found");
                self.console
                    .say(format!("Species {} not found in database", name.trim()))?;
                Ok(false)
            }
        }
    }

    /// Present every candidate for every image of `species`.
    pub fn match_species(&mut self, species: &Species) -> Result<(), ResolveError> {
        self.stats.species += 1;
        let images = self.store.images_for_species(species.id)?;
        if images.is_empty() {
            self.console.say("No images for entered species")?;
            self.console.blank()?;
            return Ok(());
        }

        let total = images.len();
        for (n, listed) in images.iter().enumerate() {
            self.console.say(format!("Image {} of {}:", n + 1, total))?;
            self.stats.images += 1;
            self.match_image(species, listed.id)?;
        }
        Ok(())
    }

    fn match_image(&mut self, species: &Species, image_id: ImageId) -> Result<(), ResolveError> {
        // Re-read: earlier decisions may have moved this image's label.
        let Some(mut image) = self.store.image(image_id)? else {
            return Ok(());
        };
        let Some(mut label) = self.store.record(image.record_id)? else {
            warn!(image = image.id, record = image.record_id, "image label record missing");
            return Ok(());
        };

        let candidates = CandidateMatcher::new(&*self.store).find_candidates(species.id, &label)?;
        debug!(image = image.id, label = label.id, count = candidates.len(), "candidates found");
        if candidates.is_empty() {
            self.console.say("No records match image label")?;
            self.console.blank()?;
            return Ok(());
        }
        self.stats.images_with_matches += 1;

        let total = candidates.len();
        for (m, candidate) in candidates.iter().enumerate() {
            if self.decided.contains(&(image.id, candidate.id)) {
                debug!(image = image.id, candidate = candidate.id, "pair already decided");
                self.stats.candidates_skipped += 1;
                continue;
            }

            self.console.say(format!("Match {} of {}:", m + 1, total))?;
            self.console.say(render_grid(&label, candidate))?;
            self.stats.candidates_presented += 1;

            let decision = self.protocol.decide(&mut self.console)?;
            let outcome =
                ResolutionEngine::new(&mut *self.store).resolve(&mut image, candidate, decision)?;
            self.decided.insert((image.id, candidate.id));
            self.stats.record(&outcome);

            self.console.say(outcome)?;
            self.console.blank()?;

            if let Outcome::Replaced { .. } = outcome {
                label = candidate.clone();
            }
        }
        Ok(())
    }
}
