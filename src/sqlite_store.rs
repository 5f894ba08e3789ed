//! SQLite-backed record store.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

use crate::models::{
    Image, ImageId, MatchKey, NamedRef, PartialDate, RecordId, Species, SpeciesId, SpecimenRecord,
};
use crate::store::{Reassignment, RecordStore, SaveMode, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

const RECORD_SELECT: &str = "
    SELECT r.id, s.id, s.genus, s.species, r.record_type, r.latitude, r.longitude,
           st.id, st.code, co.id, co.name, r.locality, r.elevation,
           r.year, r.month, r.day, cr.id, cr.name, cl.id, cl.name
    FROM specimen_records r
    JOIN species s ON s.id = r.species_id
    LEFT JOIN states st ON st.id = r.state_id
    LEFT JOIN counties co ON co.id = r.county_id
    LEFT JOIN collectors cr ON cr.id = r.collector_id
    LEFT JOIN collections cl ON cl.id = r.collection_id";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchemaVersion {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_specimen_schema.sql");
            self.conn.execute_batch(sql)?;
            self.conn.execute("PRAGMA user_version = 1", [])?;
        }

        Ok(())
    }
}

fn named_ref(id: Option<i64>, name: Option<String>) -> Option<NamedRef> {
    match (id, name) {
        (Some(id), Some(name)) => Some(NamedRef { id, name }),
        _ => None,
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<SpecimenRecord> {
    Ok(SpecimenRecord {
        id: row.get(0)?,
        species: Species {
            id: row.get(1)?,
            genus: row.get(2)?,
            epithet: row.get(3)?,
        },
        record_type: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        state: named_ref(row.get(7)?, row.get(8)?),
        county: named_ref(row.get(9)?, row.get(10)?),
        locality: row.get(11)?,
        elevation: row.get(12)?,
        date: PartialDate {
            year: row.get(13)?,
            month: row.get(14)?,
            day: row.get(15)?,
        },
        collector: named_ref(row.get(16)?, row.get(17)?),
        collection: named_ref(row.get(18)?, row.get(19)?),
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<Image> {
    Ok(Image {
        id: row.get(0)?,
        species_id: row.get(1)?,
        record_id: row.get(2)?,
    })
}

fn referencing_image(
    conn: &Connection,
    record: RecordId,
    except: Option<ImageId>,
) -> rusqlite::Result<Option<ImageId>> {
    conn.query_row(
        "SELECT id FROM species_images WHERE record_id = ?1 AND id IS NOT ?2 ORDER BY id LIMIT 1",
        params![record, except],
        |row| row.get(0),
    )
    .optional()
}

impl RecordStore for SqliteStore {
    fn species_with_images(&self) -> Result<Vec<Species>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT s.id, s.genus, s.species
             FROM species_images i
             JOIN species s ON s.id = i.species_id
             WHERE i.record_id IS NOT NULL
             ORDER BY s.genus, s.species, s.id",
        )?;
        let species = stmt
            .query_map([], |row| {
                Ok(Species {
                    id: row.get(0)?,
                    genus: row.get(1)?,
                    epithet: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(species)
    }

    fn find_species(&self, genus: &str, epithet: &str) -> Result<Option<Species>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, genus, species FROM species WHERE genus = ?1 AND species = ?2",
                params![genus, epithet],
                |row| {
                    Ok(Species {
                        id: row.get(0)?,
                        genus: row.get(1)?,
                        epithet: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn images_for_species(&self, species: SpeciesId) -> Result<Vec<Image>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, species_id, record_id FROM species_images
             WHERE species_id = ?1 AND record_id IS NOT NULL
             ORDER BY id",
        )?;
        let images = stmt
            .query_map([species], image_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(images)
    }

    fn image(&self, id: ImageId) -> Result<Option<Image>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, species_id, record_id FROM species_images
                 WHERE id = ?1 AND species_id IS NOT NULL AND record_id IS NOT NULL",
                [id],
                image_from_row,
            )
            .optional()?)
    }

    fn record(&self, id: RecordId) -> Result<Option<SpecimenRecord>, StoreError> {
        let sql = format!("{} WHERE r.id = ?1", RECORD_SELECT);
        Ok(self.conn.query_row(&sql, [id], record_from_row).optional()?)
    }

    fn find_matching(
        &self,
        key: &MatchKey,
        exclude: RecordId,
    ) -> Result<Vec<SpecimenRecord>, StoreError> {
        // `IS` keeps NULL equal to NULL and nothing else.
        let sql = format!(
            "{} WHERE r.species_id = ?1
                 AND r.year IS ?2 AND r.month IS ?3 AND r.day IS ?4
                 AND r.state_id IS ?5 AND r.county_id IS ?6 AND r.collection_id IS ?7
                 AND r.id != ?8
             ORDER BY r.id",
            RECORD_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![
                    key.species,
                    key.year,
                    key.month,
                    key.day,
                    key.state,
                    key.county,
                    key.collection,
                    exclude,
                ],
                record_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn image_for_record(&self, record: RecordId) -> Result<Option<ImageId>, StoreError> {
        Ok(referencing_image(&self.conn, record, None)?)
    }

    fn delete_record(&mut self, id: RecordId) -> Result<(), StoreError> {
        if let Some(image) = referencing_image(&self.conn, id, None)? {
            return Err(StoreError::RecordInUse { record: id, image });
        }
        let changes = self
            .conn
            .execute("DELETE FROM specimen_records WHERE id = ?1", [id])?;
        if changes == 0 {
            return Err(StoreError::RecordNotFound(id));
        }
        debug!(record = id, "deleted specimen record");
        Ok(())
    }

    fn reassign_image(
        &mut self,
        image: ImageId,
        record: RecordId,
        mode: SaveMode,
    ) -> Result<Reassignment, StoreError> {
        let tx = self.conn.transaction()?;

        let previous: RecordId = tx
            .query_row(
                "SELECT record_id FROM species_images WHERE id = ?1 AND record_id IS NOT NULL",
                [image],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::ImageNotFound(image))?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM specimen_records WHERE id = ?1",
                [record],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::RecordNotFound(record));
        }

        tx.execute(
            "UPDATE species_images SET record_id = ?1 WHERE id = ?2",
            params![record, image],
        )?;

        let mut previous_deleted = false;
        if mode == SaveMode::DiscardOld && previous != record {
            if referencing_image(&tx, previous, Some(image))?.is_none() {
                let changes = tx.execute("DELETE FROM specimen_records WHERE id = ?1", [previous])?;
                previous_deleted = changes > 0;
            }
        }

        tx.commit()?;
        debug!(image, record, previous, previous_deleted, "image record reassigned");
        Ok(Reassignment {
            previous,
            previous_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "INSERT INTO species (id, genus, species) VALUES
                    (1, 'Hemileuca', 'eglanterina'),
                    (2, 'Acronicta', 'americana'),
                    (3, 'Zale', 'lunata');
                 INSERT INTO states (id, code) VALUES (1, 'OR'), (2, 'WA');
                 INSERT INTO counties (id, name, state_id) VALUES (1, 'Lane', 1), (2, 'King', 2);
                 INSERT INTO collections (id, name) VALUES (1, 'UBC');
                 INSERT INTO collectors (id, name) VALUES (1, 'J. Smith');
                 INSERT INTO specimen_records
                    (id, species_id, record_type, latitude, longitude, state_id, county_id,
                     locality, elevation, year, month, day, collector_id, collection_id)
                 VALUES
                    (10, 1, 'Specimen', 44.05, -123.09, 1, 1, 'Spencer Butte', '2000', 2001, 6, 4, 1, 1),
                    (11, 1, 'Specimen', 44.00, -123.00, 1, 1, 'Eugene', NULL, 2001, 6, 4, NULL, 1),
                    (12, 1, 'Specimen', NULL, NULL, 1, 1, NULL, NULL, 2001, 6, 5, NULL, 1),
                    (13, 1, 'Specimen', NULL, NULL, NULL, 1, NULL, NULL, 2001, 6, 4, NULL, 1),
                    (14, 2, 'Specimen', NULL, NULL, NULL, NULL, NULL, NULL, 1999, NULL, NULL, NULL, NULL),
                    (15, 2, 'Specimen', NULL, NULL, NULL, NULL, NULL, NULL, 1999, NULL, NULL, NULL, NULL),
                    (16, 1, 'Specimen', NULL, NULL, 1, 1, NULL, NULL, 2001, 6, 4, NULL, 1);
                 INSERT INTO species_images (id, species_id, record_id) VALUES
                    (100, 1, 10),
                    (101, 2, 14),
                    (102, 3, NULL),
                    (103, 1, 16);",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_migrate_sets_schema_version() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        // Re-running is a no-op
        store.migrate().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute("PRAGMA user_version = 99", [])
            .unwrap();
        assert!(matches!(
            store.migrate(),
            Err(StoreError::UnsupportedSchemaVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_record_joins_lookup_names() {
        let store = seeded();
        let record = store.record(10).unwrap().unwrap();
        assert_eq!(record.species.genus, "Hemileuca");
        assert_eq!(record.state, Some(NamedRef::new(1, "OR")));
        assert_eq!(record.county, Some(NamedRef::new(1, "Lane")));
        assert_eq!(record.collector, Some(NamedRef::new(1, "J. Smith")));
        assert_eq!(record.collection, Some(NamedRef::new(1, "UBC")));
        assert_eq!(record.date, PartialDate::new(2001, 6, 4));
        assert!(store.record(999).unwrap().is_none());
    }

    #[test]
    fn test_find_matching_exact_key_and_self_exclusion() {
        let store = seeded();
        let label = store.record(10).unwrap().unwrap();
        let ids: Vec<RecordId> = store
            .find_matching(&label.match_key(), label.id)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        // 12 differs by day, 13 has no state
        assert_eq!(ids, vec![11, 16]);
    }

    #[test]
    fn test_find_matching_null_equals_null() {
        let store = seeded();
        let label = store.record(14).unwrap().unwrap();
        let ids: Vec<RecordId> = store
            .find_matching(&label.match_key(), label.id)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![15]);
    }

    #[test]
    fn test_species_with_images_sorted_and_skips_unlabelled() {
        let store = seeded();
        let names: Vec<String> = store
            .species_with_images()
            .unwrap()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["Acronicta americana", "Hemileuca eglanterina"]);
    }

    #[test]
    fn test_find_species_exact() {
        let store = seeded();
        assert_eq!(store.find_species("Zale", "lunata").unwrap().unwrap().id, 3);
        assert!(store.find_species("zale", "lunata").unwrap().is_none());
    }

    #[test]
    fn test_image_for_record() {
        let store = seeded();
        assert_eq!(store.image_for_record(10).unwrap(), Some(100));
        assert_eq!(store.image_for_record(16).unwrap(), Some(103));
        assert_eq!(store.image_for_record(11).unwrap(), None);
    }

    #[test]
    fn test_delete_refused_while_labelled() {
        let mut store = seeded();
        let err = store.delete_record(10).unwrap_err();
        assert!(matches!(
            err,
            StoreError::RecordInUse {
                record: 10,
                image: 100
            }
        ));
        assert!(store.record(10).unwrap().is_some());

        store.delete_record(11).unwrap();
        assert!(store.record(11).unwrap().is_none());
        assert!(matches!(
            store.delete_record(11),
            Err(StoreError::RecordNotFound(11))
        ));
    }

    #[test]
    fn test_reassign_retain_old_keeps_previous() {
        let mut store = seeded();
        let result = store.reassign_image(100, 11, SaveMode::RetainOld).unwrap();
        assert_eq!(
            result,
            Reassignment {
                previous: 10,
                previous_deleted: false
            }
        );
        assert_eq!(store.image(100).unwrap().unwrap().record_id, 11);
        assert!(store.record(10).unwrap().is_some());
    }

    #[test]
    fn test_reassign_discard_old_deletes_unshared_previous() {
        let mut store = seeded();
        let result = store.reassign_image(100, 11, SaveMode::DiscardOld).unwrap();
        assert!(result.previous_deleted);
        assert!(store.record(10).unwrap().is_none());
    }

    #[test]
    fn test_reassign_discard_old_keeps_shared_previous() {
        let mut store = seeded();
        store
            .connection()
            .execute("UPDATE species_images SET record_id = 10 WHERE id = 103", [])
            .unwrap();
        let result = store.reassign_image(100, 11, SaveMode::DiscardOld).unwrap();
        assert!(!result.previous_deleted);
        assert!(store.record(10).unwrap().is_some());
    }

    #[test]
    fn test_reassign_to_missing_record_changes_nothing() {
        let mut store = seeded();
        assert!(matches!(
            store.reassign_image(100, 999, SaveMode::DiscardOld),
            Err(StoreError::RecordNotFound(999))
        ));
        assert_eq!(store.image(100).unwrap().unwrap().record_id, 10);
        assert!(matches!(
            store.reassign_image(555, 11, SaveMode::RetainOld),
            Err(StoreError::ImageNotFound(555))
        ));
    }

    #[test]
    fn test_open_file_persists_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("specimens.sqlite3");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .connection()
                .execute_batch(
                    "INSERT INTO species (id, genus, species) VALUES (1, 'Zale', 'lunata');
                     INSERT INTO specimen_records (id, species_id) VALUES (1, 1), (2, 1);
                     INSERT INTO species_images (id, species_id, record_id) VALUES (1, 1, 1);",
                )
                .unwrap();
        }
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.reassign_image(1, 2, SaveMode::DiscardOld).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.image(1).unwrap().unwrap().record_id, 2);
        assert!(store.record(1).unwrap().is_none());
    }
}
