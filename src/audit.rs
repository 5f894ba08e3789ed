//! Read-only duplicate audit: how many image labels have matching records,
//! per species, without asking the operator anything.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::matcher::CandidateMatcher;
use crate::models::Species;
use crate::progress::{format_duration, log_species_progress, species_bar};
use crate::store::{RecordStore, StoreError};

const LOG_INTERVAL: u64 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpeciesAudit {
    pub species: String,
    pub images: usize,
    pub images_with_matches: usize,
    pub candidates: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AuditReport {
    pub species: Vec<SpeciesAudit>,
    pub total_images: usize,
    pub total_images_with_matches: usize,
    pub total_candidates: usize,
    pub elapsed_secs: f64,
}

impl AuditReport {
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn audit_species<S: RecordStore + ?Sized>(
    store: &S,
    species: &Species,
) -> Result<SpeciesAudit, StoreError> {
    let matcher = CandidateMatcher::new(store);
    let mut result = SpeciesAudit {
        species: species.to_string(),
        images: 0,
        images_with_matches: 0,
        candidates: 0,
    };
    for image in store.images_for_species(species.id)? {
        result.images += 1;
        let Some(label) = store.record(image.record_id)? else {
            continue;
        };
        let found = matcher.find_candidates(species.id, &label)?.len();
        if found > 0 {
            result.images_with_matches += 1;
            result.candidates += found;
        }
    }
    Ok(result)
}

/// Audit one species, or every species with images when `only` is `None`.
/// Species with no duplicates are left out of the report.
pub fn run_audit<S: RecordStore + ?Sized>(
    store: &S,
    only: Option<&Species>,
) -> Result<AuditReport, StoreError> {
    let start = Instant::now();
    let species = match only {
        Some(s) => vec![s.clone()],
        None => store.species_with_images()?,
    };
    info!(count = species.len(), "auditing species");

    let total = species.len() as u64;
    let pb = species_bar(total);
    let mut report = AuditReport::default();

    for (i, s) in species.iter().enumerate() {
        let audit = audit_species(store, s)?;
        debug!(species = %s, candidates = audit.candidates, "species audited");
        report.total_images += audit.images;
        report.total_images_with_matches += audit.images_with_matches;
        report.total_candidates += audit.candidates;
        if audit.candidates > 0 {
            report.species.push(audit);
        }
        pb.inc(1);
        log_species_progress(i as u64 + 1, total, LOG_INTERVAL);
    }

    pb.finish_with_message("Audit complete");
    report.elapsed_secs = start.elapsed().as_secs_f64();
    Ok(report)
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.species.is_empty() {
            writeln!(f, "No image labels have matching records.")?;
        } else {
            let width = self
                .species
                .iter()
                .map(|s| s.species.len())
                .max()
                .unwrap_or(0)
                .max("Species".len());
            writeln!(
                f,
                "{:<width$}  {:>7}  {:>12}  {:>10}",
                "Species",
                "Images",
                "With matches",
                "Candidates",
                width = width
            )?;
            for s in &self.species {
                writeln!(
                    f,
                    "{:<width$}  {:>7}  {:>12}  {:>10}",
                    s.species,
                    s.images,
                    s.images_with_matches,
                    s.candidates,
                    width = width
                )?;
            }
        }
        writeln!(f, "{:=<60}", "")?;
        writeln!(f, "  Images: {}", self.total_images)?;
        writeln!(f, "  Images with matches: {}", self.total_images_with_matches)?;
        writeln!(f, "  Matching records: {}", self.total_candidates)?;
        writeln!(
            f,
            "  Elapsed: {}",
            format_duration(std::time::Duration::from_secs_f64(self.elapsed_secs))
        )?;
        write!(f, "{:=<60}", "")
    }
}
