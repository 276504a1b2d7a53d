//! Persisted per-city and per-zip summaries stored in `DuckDB`.
//!
//! One row per geography key. Rows are written once per batch run and
//! read-only afterwards. City lookups match on a prefix of the composite
//! `"City,ST"` key so a bare city name finds its row.

use std::path::Path;

use dining_atlas_summary_models::{
    CitySummary, FacetSummary, GeoSummary, NOT_APPLICABLE, TOP_CATEGORY_COUNT, ZIP_SENTINEL,
    ZipSummary,
};
use duckdb::{Connection, Row};

use crate::DbError;

/// City-level table name.
pub const CITY_TABLE: &str = "business_data_per_city";

/// Zip-level table name.
pub const ZIP_TABLE: &str = "business_data_per_zip_code";

const CITY_COLUMNS: &str = "city_name, average_rating, average_review_count,
    average_business_price_range, top_category_1, top_category_2, top_category_3,
    top_business_ambience_type, top_business_parking_type, top_music_type,
    top_dietary_restriction";

const ZIP_COLUMNS: &str = "zip_code, city_name, average_rating, average_review_count,
    average_business_price_range, top_category_1, top_category_2, top_category_3,
    top_business_ambience_type, top_business_parking_type, top_music_type,
    top_dietary_restriction";

/// Storage contract for finalized summaries.
pub trait SummaryStore {
    /// Writes a city row, replacing any existing row for the same key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn put_city(&self, summary: &CitySummary) -> Result<(), DbError>;

    /// Writes a zip row, replacing any existing row for the same key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn put_zip(&self, summary: &ZipSummary) -> Result<(), DbError>;

    /// Writes a summary of either granularity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    fn put(&self, summary: &GeoSummary) -> Result<(), DbError> {
        match summary {
            GeoSummary::City(city) => self.put_city(city),
            GeoSummary::Zip(zip) => self.put_zip(zip),
        }
    }

    /// City rows whose key starts with `city_prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn get_by_city(&self, city_prefix: &str) -> Result<Vec<CitySummary>, DbError>;

    /// The zip row for exactly `zip_code`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn get_by_zip(&self, zip_code: &str) -> Result<Option<ZipSummary>, DbError>;

    /// Zip rows whose zip code starts with `zip_prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn get_zips_matching_prefix(&self, zip_prefix: &str) -> Result<Vec<ZipSummary>, DbError>;

    /// Zip rows whose owning city starts with `city_prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    fn get_zips_in_city(&self, city_prefix: &str) -> Result<Vec<ZipSummary>, DbError>;

    /// Removes every stored row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails.
    fn clear(&self) -> Result<(), DbError>;
}

/// [`SummaryStore`] backed by a `DuckDB` connection.
pub struct DuckDbSummaryStore {
    conn: Connection,
}

impl DuckDbSummaryStore {
    /// Opens (or creates) the summary store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens the summary store at the default path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_default() -> Result<Self, DbError> {
        Self::open(&crate::paths::summary_db_path())
    }

    /// Opens a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Replaces the whole store contents in one transaction.
    ///
    /// Returns `(city_rows, zip_rows)` written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any write fails; the store is left unchanged.
    pub fn replace_all(
        &self,
        cities: &[CitySummary],
        zips: &[ZipSummary],
    ) -> Result<(usize, usize), DbError> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        let result = (|| {
            self.clear()?;
            for city in cities {
                self.put_city(city)?;
            }
            for zip in zips {
                self.put_zip(zip)?;
            }
            Ok::<_, DbError>(())
        })();

        match result {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                log::info!(
                    "Wrote {} city rows and {} zip rows",
                    cities.len(),
                    zips.len()
                );
                Ok((cities.len(), zips.len()))
            }
            Err(e) => {
                self.conn.execute_batch("ROLLBACK")?;
                Err(e)
            }
        }
    }

    /// Row counts as `(city_rows, zip_rows)`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn counts(&self) -> Result<(u64, u64), DbError> {
        let count = |table: &str| -> Result<u64, DbError> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?;
            u64::try_from(n).map_err(|e| DbError::Conversion {
                message: format!("negative row count in {table}: {e}"),
            })
        };
        Ok((count(CITY_TABLE)?, count(ZIP_TABLE)?))
    }

    fn query_cities(&self, filter: &str, value: &str) -> Result<Vec<CitySummary>, DbError> {
        let sql = format!("SELECT {CITY_COLUMNS} FROM {CITY_TABLE} WHERE {filter} ORDER BY city_name");
        let mut stmt = self.conn.prepare(&sql)?;
        stmt.raw_bind_parameter(1, value)?;
        stmt.raw_execute()?;

        let mut results = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            results.push(city_from_row(row)?);
        }
        Ok(results)
    }

    fn query_zips(&self, filter: &str, value: &str) -> Result<Vec<ZipSummary>, DbError> {
        let sql = format!("SELECT {ZIP_COLUMNS} FROM {ZIP_TABLE} WHERE {filter} ORDER BY zip_code");
        let mut stmt = self.conn.prepare(&sql)?;
        stmt.raw_bind_parameter(1, value)?;
        stmt.raw_execute()?;

        let mut results = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            results.push(zip_from_row(row)?);
        }
        Ok(results)
    }
}

impl SummaryStore for DuckDbSummaryStore {
    fn put_city(&self, summary: &CitySummary) -> Result<(), DbError> {
        let f = &summary.facets;
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {CITY_TABLE} ({CITY_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            duckdb::params![
                summary.city,
                summary.average_rating,
                summary.average_review_count,
                summary.average_price,
                f.category_slot(0),
                f.category_slot(1),
                f.category_slot(2),
                f.top_ambience,
                f.top_parking,
                f.top_music,
                f.top_dietary_restriction,
            ],
        )?;
        Ok(())
    }

    fn put_zip(&self, summary: &ZipSummary) -> Result<(), DbError> {
        let f = &summary.facets;
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {ZIP_TABLE} ({ZIP_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            duckdb::params![
                summary.zip_code,
                summary.city,
                summary.average_rating,
                summary.average_review_count,
                summary.average_price,
                f.category_slot(0),
                f.category_slot(1),
                f.category_slot(2),
                f.top_ambience,
                f.top_parking,
                f.top_music,
                f.top_dietary_restriction,
            ],
        )?;
        Ok(())
    }

    fn get_by_city(&self, city_prefix: &str) -> Result<Vec<CitySummary>, DbError> {
        self.query_cities("starts_with(city_name, ?)", city_prefix)
    }

    fn get_by_zip(&self, zip_code: &str) -> Result<Option<ZipSummary>, DbError> {
        Ok(self.query_zips("zip_code = ?", zip_code)?.into_iter().next())
    }

    fn get_zips_matching_prefix(&self, zip_prefix: &str) -> Result<Vec<ZipSummary>, DbError> {
        self.query_zips("starts_with(zip_code, ?)", zip_prefix)
    }

    fn get_zips_in_city(&self, city_prefix: &str) -> Result<Vec<ZipSummary>, DbError> {
        self.query_zips("starts_with(city_name, ?)", city_prefix)
    }

    fn clear(&self) -> Result<(), DbError> {
        self.conn
            .execute_batch(&format!("DELETE FROM {CITY_TABLE}; DELETE FROM {ZIP_TABLE};"))?;
        Ok(())
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {CITY_TABLE} (
            city_name TEXT PRIMARY KEY,
            average_rating DOUBLE NOT NULL,
            average_review_count DOUBLE NOT NULL,
            average_business_price_range DOUBLE,
            top_category_1 TEXT DEFAULT 'N/A',
            top_category_2 TEXT DEFAULT 'N/A',
            top_category_3 TEXT DEFAULT 'N/A',
            top_business_ambience_type TEXT DEFAULT 'N/A',
            top_business_parking_type TEXT DEFAULT 'N/A',
            top_music_type TEXT DEFAULT 'N/A',
            top_dietary_restriction TEXT DEFAULT 'N/A'
        );

        CREATE TABLE IF NOT EXISTS {ZIP_TABLE} (
            zip_code TEXT PRIMARY KEY,
            city_name TEXT NOT NULL,
            average_rating DOUBLE NOT NULL,
            average_review_count DOUBLE,
            average_business_price_range DOUBLE,
            top_category_1 TEXT DEFAULT 'N/A',
            top_category_2 TEXT DEFAULT 'N/A',
            top_category_3 TEXT DEFAULT 'N/A',
            top_business_ambience_type TEXT DEFAULT 'N/A',
            top_business_parking_type TEXT DEFAULT 'N/A',
            top_music_type TEXT DEFAULT 'N/A',
            top_dietary_restriction TEXT DEFAULT 'N/A'
        );"
    ))?;
    Ok(())
}

/// Reads the seven facet columns starting at `offset`.
fn facets_from_row(row: &Row<'_>, offset: usize) -> Result<FacetSummary, DbError> {
    let text = |i: usize| -> Result<String, DbError> {
        let value: Option<String> = row.get(offset + i)?;
        Ok(value.unwrap_or_else(|| NOT_APPLICABLE.to_string()))
    };

    let mut top_categories = Vec::with_capacity(TOP_CATEGORY_COUNT);
    for i in 0..TOP_CATEGORY_COUNT {
        let category = text(i)?;
        if category != NOT_APPLICABLE {
            top_categories.push(category);
        }
    }

    Ok(FacetSummary {
        top_categories,
        top_ambience: text(3)?,
        top_parking: text(4)?,
        top_music: text(5)?,
        top_dietary_restriction: text(6)?,
    })
}

fn city_from_row(row: &Row<'_>) -> Result<CitySummary, DbError> {
    Ok(CitySummary {
        city: row.get(0)?,
        average_rating: row.get(1)?,
        average_review_count: row.get(2)?,
        average_price: row.get(3)?,
        facets: facets_from_row(row, 4)?,
    })
}

fn zip_from_row(row: &Row<'_>) -> Result<ZipSummary, DbError> {
    let average_review_count: Option<f64> = row.get(3)?;
    let average_price: Option<f64> = row.get(4)?;
    Ok(ZipSummary {
        zip_code: row.get(0)?,
        city: row.get(1)?,
        average_rating: row.get(2)?,
        average_review_count: average_review_count.unwrap_or(ZIP_SENTINEL),
        average_price: average_price.unwrap_or(ZIP_SENTINEL),
        facets: facets_from_row(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(key: &str, rating: f64) -> CitySummary {
        CitySummary {
            city: key.to_string(),
            average_rating: rating,
            average_review_count: 15.0,
            average_price: Some(2.5),
            facets: FacetSummary {
                top_categories: vec!["Thai".to_string(), "Bars".to_string()],
                top_ambience: "casual".to_string(),
                ..FacetSummary::default()
            },
        }
    }

    fn zip(code: &str, owner: &str) -> ZipSummary {
        ZipSummary {
            zip_code: code.to_string(),
            city: owner.to_string(),
            average_rating: 4.0,
            average_review_count: -1.0,
            average_price: -1.0,
            facets: FacetSummary {
                top_categories: vec!["Pizza".to_string()],
                top_parking: "street".to_string(),
                ..FacetSummary::default()
            },
        }
    }

    fn store() -> DuckDbSummaryStore {
        DuckDbSummaryStore::open_in_memory().unwrap()
    }

    #[test]
    fn city_round_trip() {
        let store = store();
        let summary = city("Seattle,WA", 3.0);
        store.put_city(&summary).unwrap();
        assert_eq!(store.get_by_city("Seattle,WA").unwrap(), vec![summary]);
    }

    #[test]
    fn city_without_price_round_trips_null() {
        let store = store();
        let mut summary = city("Seattle,WA", 3.0);
        summary.average_price = None;
        store.put(&GeoSummary::City(summary.clone())).unwrap();
        assert_eq!(store.get_by_city("Seattle").unwrap(), vec![summary]);
    }

    #[test]
    fn zip_round_trip() {
        let store = store();
        let summary = zip("98101", "Seattle,WA");
        store.put(&GeoSummary::Zip(summary.clone())).unwrap();
        assert_eq!(store.get_by_zip("98101").unwrap(), Some(summary));
        assert_eq!(store.get_by_zip("98102").unwrap(), None);
    }

    #[test]
    fn city_prefix_matches_composite_key() {
        let store = store();
        store.put_city(&city("Seattle,WA", 3.0)).unwrap();
        store.put_city(&city("Portland,OR", 4.0)).unwrap();
        let found = store.get_by_city("Seat").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].city, "Seattle,WA");
        assert!(store.get_by_city("Tacoma").unwrap().is_empty());
    }

    #[test]
    fn zip_prefix_match() {
        let store = store();
        for (code, owner) in [
            ("98101", "Seattle,WA"),
            ("98109", "Seattle,WA"),
            ("97201", "Portland,OR"),
        ] {
            store.put_zip(&zip(code, owner)).unwrap();
        }

        let codes: Vec<String> = store
            .get_zips_matching_prefix("981")
            .unwrap()
            .into_iter()
            .map(|z| z.zip_code)
            .collect();
        assert_eq!(codes, vec!["98101", "98109"]);

        assert_eq!(store.get_zips_in_city("Portland").unwrap().len(), 1);
    }

    #[test]
    fn put_overwrites_existing_key() {
        let store = store();
        store.put_city(&city("Seattle,WA", 3.0)).unwrap();
        store.put_city(&city("Seattle,WA", 4.5)).unwrap();
        let rows = store.get_by_city("Seattle,WA").unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].average_rating - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn replace_all_discards_previous_run() {
        let store = store();
        store.put_city(&city("Tacoma,WA", 3.0)).unwrap();
        let written = store
            .replace_all(&[city("Seattle,WA", 3.0)], &[zip("98101", "Seattle,WA")])
            .unwrap();
        assert_eq!(written, (1, 1));
        assert_eq!(store.counts().unwrap(), (1, 1));
        assert!(store.get_by_city("Tacoma").unwrap().is_empty());
    }
}
