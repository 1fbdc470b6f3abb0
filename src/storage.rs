//! SQLite storage layer.
//!
//! # Tables
//!
//! - `weather`: one row per day of archived weather
//! - `crashes`: one row per fatal-crash case
//! - `case_specifics`: crash date detail, at most one row per case
//! - `ozone_measurements`: one row per sensor-day
//!
//! Every write replaces the whole table. Each replace runs in its own
//! transaction; nothing spans tables, so a failure partway through
//! [`Storage::load_all`] leaves earlier tables already replaced.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::info;

use crate::error::Result;
use crate::model::{CaseDetail, CrashSummary, OzoneMeasurement, WeatherRecord};

pub const WEATHER_TABLE: &str = "weather";
pub const CRASHES_TABLE: &str = "crashes";
pub const CASE_DETAILS_TABLE: &str = "case_specifics";
pub const OZONE_TABLE: &str = "ozone_measurements";

const WEATHER_COLUMNS: &str = r#"
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    date TEXT NOT NULL,
    temp_max_f REAL,
    temp_min_f REAL,
    precip_sum REAL,
    rain_sum REAL,
    snowfall_sum REAL
"#;

const CRASHES_COLUMNS: &str = r#"
    state_case INTEGER NOT NULL,
    year INTEGER NOT NULL,
    city TEXT NOT NULL,
    county TEXT NOT NULL,
    state TEXT NOT NULL,
    fatals INTEGER NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    vehicles INTEGER NOT NULL,
    road_occurred TEXT
"#;

const CASE_DETAILS_COLUMNS: &str = r#"
    state_case INTEGER NOT NULL UNIQUE,
    year INTEGER,
    month TEXT,
    day TEXT
"#;

const OZONE_COLUMNS: &str = r#"
    datetime TEXT NOT NULL,
    mean_value REAL,
    minimum_value REAL,
    maximum_value REAL,
    parameter TEXT NOT NULL,
    units TEXT NOT NULL
"#;

const TABLES: [(&str, &str); 4] = [
    (WEATHER_TABLE, WEATHER_COLUMNS),
    (CRASHES_TABLE, CRASHES_COLUMNS),
    (CASE_DETAILS_TABLE, CASE_DETAILS_COLUMNS),
    (OZONE_TABLE, OZONE_COLUMNS),
];

/// Row counts written by [`Storage::load_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadCounts {
    pub weather: usize,
    pub crashes: usize,
    pub case_details: usize,
    pub ozone: usize,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:crashinfo.db?mode=rwc" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create any of the four tables that do not exist yet.
    ///
    /// Safe to run against a store that already holds data.
    pub async fn initialize_schema(&self) -> Result<()> {
        for (table, columns) in TABLES {
            sqlx::query(&format!("CREATE TABLE IF NOT EXISTS {table} ({columns})"))
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Whether a table with this name exists in the store.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM sqlite_master
            WHERE type = 'table' AND name = ?
            "#,
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;

        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    /// Replace all four tables, in order: weather, crashes, case_specifics, ozone.
    pub async fn load_all(
        &self,
        weather: &[WeatherRecord],
        crashes: &[CrashSummary],
        case_details: &[CaseDetail],
        ozone: &[OzoneMeasurement],
    ) -> Result<LoadCounts> {
        self.replace_weather(weather).await?;
        info!(table = WEATHER_TABLE, rows = weather.len(), "Weather data loaded");

        self.replace_crashes(crashes).await?;
        info!(table = CRASHES_TABLE, rows = crashes.len(), "Crash data loaded");

        self.replace_case_details(case_details).await?;
        info!(
            table = CASE_DETAILS_TABLE,
            rows = case_details.len(),
            "Case specific data loaded"
        );

        self.replace_ozone(ozone).await?;
        info!(table = OZONE_TABLE, rows = ozone.len(), "Ozone data loaded");

        Ok(LoadCounts {
            weather: weather.len(),
            crashes: crashes.len(),
            case_details: case_details.len(),
            ozone: ozone.len(),
        })
    }

    pub async fn replace_weather(&self, records: &[WeatherRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        recreate_table(&mut tx, WEATHER_TABLE, WEATHER_COLUMNS).await?;

        for r in records {
            sqlx::query(
                r#"
                INSERT INTO weather
                    (latitude, longitude, date, temp_max_f, temp_min_f, precip_sum, rain_sum, snowfall_sum)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(r.latitude)
            .bind(r.longitude)
            .bind(&r.date)
            .bind(r.temp_max_f)
            .bind(r.temp_min_f)
            .bind(r.precip_sum)
            .bind(r.rain_sum)
            .bind(r.snowfall_sum)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_crashes(&self, records: &[CrashSummary]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        recreate_table(&mut tx, CRASHES_TABLE, CRASHES_COLUMNS).await?;

        for r in records {
            sqlx::query(
                r#"
                INSERT INTO crashes
                    (state_case, year, city, county, state, fatals, latitude, longitude, vehicles, road_occurred)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(r.state_case)
            .bind(r.year)
            .bind(&r.city)
            .bind(&r.county)
            .bind(&r.state)
            .bind(r.fatals)
            .bind(r.latitude)
            .bind(r.longitude)
            .bind(r.vehicles)
            .bind(&r.road_occurred)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replace `case_specifics` with an already-merged set.
    ///
    /// Callers pass the known records plus the new ones, so replacing the
    /// table keeps every case checked so far.
    pub async fn replace_case_details(&self, records: &[CaseDetail]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        recreate_table(&mut tx, CASE_DETAILS_TABLE, CASE_DETAILS_COLUMNS).await?;

        for r in records {
            sqlx::query(
                r#"
                INSERT INTO case_specifics (state_case, year, month, day)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(r.state_case)
            .bind(r.year)
            .bind(&r.month)
            .bind(&r.day)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_ozone(&self, records: &[OzoneMeasurement]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        recreate_table(&mut tx, OZONE_TABLE, OZONE_COLUMNS).await?;

        for r in records {
            sqlx::query(
                r#"
                INSERT INTO ozone_measurements
                    (datetime, mean_value, minimum_value, maximum_value, parameter, units)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&r.datetime)
            .bind(r.mean_value)
            .bind(r.minimum_value)
            .bind(r.maximum_value)
            .bind(&r.parameter)
            .bind(&r.units)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn read_weather(&self) -> Result<Vec<WeatherRecord>> {
        let rows = self.read_table(WEATHER_TABLE).await?;

        Ok(rows
            .iter()
            .map(|r| WeatherRecord {
                latitude: r.get("latitude"),
                longitude: r.get("longitude"),
                date: r.get("date"),
                temp_max_f: r.get("temp_max_f"),
                temp_min_f: r.get("temp_min_f"),
                precip_sum: r.get("precip_sum"),
                rain_sum: r.get("rain_sum"),
                snowfall_sum: r.get("snowfall_sum"),
            })
            .collect())
    }

    pub async fn read_crashes(&self) -> Result<Vec<CrashSummary>> {
        let rows = self.read_table(CRASHES_TABLE).await?;

        Ok(rows
            .iter()
            .map(|r| CrashSummary {
                state_case: r.get("state_case"),
                year: r.get("year"),
                city: r.get("city"),
                county: r.get("county"),
                state: r.get("state"),
                fatals: r.get("fatals"),
                latitude: r.get("latitude"),
                longitude: r.get("longitude"),
                vehicles: r.get("vehicles"),
                road_occurred: r.get("road_occurred"),
            })
            .collect())
    }

    /// Read `case_specifics`, or nothing if the table has never been created.
    pub async fn read_case_details(&self) -> Result<Vec<CaseDetail>> {
        let rows = self.read_table(CASE_DETAILS_TABLE).await?;

        Ok(rows
            .iter()
            .map(|r| CaseDetail {
                state_case: r.get("state_case"),
                year: r.get("year"),
                month: r.get("month"),
                day: r.get("day"),
            })
            .collect())
    }

    pub async fn read_ozone(&self) -> Result<Vec<OzoneMeasurement>> {
        let rows = self.read_table(OZONE_TABLE).await?;

        Ok(rows
            .iter()
            .map(|r| OzoneMeasurement {
                datetime: r.get("datetime"),
                mean_value: r.get("mean_value"),
                minimum_value: r.get("minimum_value"),
                maximum_value: r.get("maximum_value"),
                parameter: r.get("parameter"),
                units: r.get("units"),
            })
            .collect())
    }

    /// All rows of `table` in insertion order; empty if the table is absent.
    async fn read_table(&self, table: &str) -> Result<Vec<SqliteRow>> {
        if !self.table_exists(table).await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!("SELECT * FROM {table} ORDER BY rowid"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

/// Drop `table` and create it empty.
async fn recreate_table(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    columns: &str,
) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
        .execute(&mut **tx)
        .await?;
    sqlx::query(&format!("CREATE TABLE {table} ({columns})"))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_storage() -> Storage {
        Storage::new("sqlite::memory:").await.unwrap()
    }

    fn weather(date: &str, max: Option<f64>) -> WeatherRecord {
        WeatherRecord {
            latitude: 33.8034,
            longitude: -84.3963,
            date: date.to_string(),
            temp_max_f: max,
            temp_min_f: Some(40.5),
            precip_sum: Some(0.0),
            rain_sum: None,
            snowfall_sum: Some(0.0),
        }
    }

    fn crash(state_case: i64) -> CrashSummary {
        CrashSummary {
            state_case,
            year: 2022,
            city: "ATLANTA".to_string(),
            county: "FULTON (121)".to_string(),
            state: "Georgia".to_string(),
            fatals: 1,
            latitude: 33.7489,
            longitude: -84.388,
            vehicles: 2,
            road_occurred: Some("I-85".to_string()),
        }
    }

    #[tokio::test]
    async fn test_schema_creates_all_tables() {
        let storage = setup_test_storage().await;

        for (table, _) in TABLES {
            assert!(storage.table_exists(table).await.unwrap(), "{table} missing");
        }
        assert!(!storage.table_exists("gtech_ozone").await.unwrap());
    }

    #[tokio::test]
    async fn test_weather_round_trip() {
        let storage = setup_test_storage().await;
        let records = vec![weather("2023-01-01", Some(61.2)), weather("2023-01-02", None)];

        storage.replace_weather(&records).await.unwrap();

        assert_eq!(storage.read_weather().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_replace_discards_previous_rows() {
        let storage = setup_test_storage().await;

        storage
            .replace_crashes(&[crash(130001), crash(130002)])
            .await
            .unwrap();
        storage.replace_crashes(&[crash(130003)]).await.unwrap();

        let stored = storage.read_crashes().await.unwrap();
        assert_eq!(stored, vec![crash(130003)]);
    }

    #[tokio::test]
    async fn test_case_details_round_trip_with_nulls() {
        let storage = setup_test_storage().await;
        let records = vec![
            CaseDetail {
                state_case: 130001,
                year: Some(2022),
                month: Some("03".to_string()),
                day: Some("07".to_string()),
            },
            CaseDetail::pending(130002),
        ];

        storage.replace_case_details(&records).await.unwrap();

        assert_eq!(storage.read_case_details().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_case_details_reject_duplicate_case() {
        let storage = setup_test_storage().await;

        let result = storage
            .replace_case_details(&[CaseDetail::pending(130001), CaseDetail::pending(130001)])
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_table_reads_empty() {
        let storage = setup_test_storage().await;
        sqlx::query("DROP TABLE case_specifics")
            .execute(&storage.pool)
            .await
            .unwrap();

        assert!(storage.read_case_details().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_all_round_trip() {
        let storage = setup_test_storage().await;
        let weather_rows = vec![weather("2023-01-01", Some(61.2))];
        let crash_rows = vec![crash(130001)];
        let details = vec![CaseDetail::pending(130001)];
        let ozone = vec![OzoneMeasurement {
            datetime: "2023-06-01".to_string(),
            mean_value: Some(0.031),
            minimum_value: Some(0.012),
            maximum_value: None,
            parameter: "o3".to_string(),
            units: "ppm".to_string(),
        }];

        let counts = storage
            .load_all(&weather_rows, &crash_rows, &details, &ozone)
            .await
            .unwrap();

        assert_eq!(
            counts,
            LoadCounts {
                weather: 1,
                crashes: 1,
                case_details: 1,
                ozone: 1,
            }
        );
        assert_eq!(storage.read_weather().await.unwrap(), weather_rows);
        assert_eq!(storage.read_crashes().await.unwrap(), crash_rows);
        assert_eq!(storage.read_case_details().await.unwrap(), details);
        assert_eq!(storage.read_ozone().await.unwrap(), ozone);
    }
}
