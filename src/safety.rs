//! Safety checks for files this tool writes.
//!
//! Report files must never land on top of the specimen database the
//! session is editing.

use anyhow::{bail, Result};
use std::path::Path;

const DATABASE_EXTENSIONS: [&str; 4] = ["sqlite", "sqlite3", "db", "db3"];

/// Validates that a report path is safe to overwrite.
///
/// Checks:
/// - Output must have the `required_extension` (e.g. "json")
/// - Output cannot be the database, directly or through another path to the same file
/// - Output cannot carry a database file extension
pub fn validate_output_path(output: &Path, required_extension: &str, database: &Path) -> Result<()> {
    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");

    if DATABASE_EXTENSIONS.contains(&extension.to_lowercase().as_str()) {
        bail!(
            "Safety check failed: output '{}' looks like a database file",
            output.display()
        );
    }

    if !extension.eq_ignore_ascii_case(required_extension) {
        bail!(
            "Safety check failed: output file '{}' must end in '.{}'",
            output.display(),
            required_extension
        );
    }

    if output == database {
        bail!(
            "Safety check failed: output '{}' cannot be the database",
            output.display()
        );
    }

    // Both exist: compare what they resolve to
    if let (Ok(a), Ok(b)) = (output.canonicalize(), database.canonicalize()) {
        if a == b {
            bail!(
                "Safety check failed: output '{}' resolves to the database '{}'",
                output.display(),
                database.display()
            );
        }
    }

    Ok(())
}
