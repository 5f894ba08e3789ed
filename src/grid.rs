//! Side-by-side rendering of an image label and a matching record.

use crate::models::{NamedRef, SpecimenRecord};

const HEADERS: [&str; 13] = [
    "ID",
    "Genus",
    "Species",
    "Voucher Type",
    "Latitude",
    "Longitude",
    "State",
    "County",
    "Locality",
    "Elevation",
    "Date",
    "Collector",
    "Collection",
];

/// Space between columns
const GUTTER: usize = 2;

const MISSING: &str = "-";

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| MISSING.to_string())
}

fn name(value: &Option<NamedRef>) -> String {
    value
        .as_ref()
        .map(|r| r.name.clone())
        .unwrap_or_else(|| MISSING.to_string())
}

fn number(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Display values of a record, one per header.
pub fn record_fields(record: &SpecimenRecord) -> [String; 13] {
    [
        record.id.to_string(),
        record.species.genus.clone(),
        record.species.epithet.clone(),
        text(&record.record_type),
        number(record.latitude),
        number(record.longitude),
        name(&record.state),
        name(&record.county),
        text(&record.locality),
        text(&record.elevation),
        record.date.to_string(),
        name(&record.collector),
        name(&record.collection),
    ]
}

/// Header row plus "Current Label:" and "Matching Record:" rows, each column
/// left-aligned and padded to its longest value.
pub fn render_grid(label: &SpecimenRecord, candidate: &SpecimenRecord) -> String {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(3);

    let mut header = vec![String::new()];
    header.extend(HEADERS.iter().map(|h| h.to_string()));
    rows.push(header);

    for (title, record) in [("Current Label:", label), ("Matching Record:", candidate)] {
        let mut row = vec![title.to_string()];
        row.extend(record_fields(record));
        rows.push(row);
    }

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
                + GUTTER
        })
        .collect();

    let mut out = String::new();
    for row in &rows {
        for (cell, width) in row.iter().zip(&widths) {
            out.push_str(&format!("{:<width$}", cell, width = *width));
        }
        out.push('\n');
    }
    out
}
