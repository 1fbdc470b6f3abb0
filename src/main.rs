//! crash-weather-etl - run the ETL pipeline once.
//!
//! Configuration comes from environment variables (see
//! [`crash_weather_etl::config::PipelineConfig::from_lookup`]). Only
//! `OPENAQ_API_KEY` is required.

use chrono::Local;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crash_weather_etl::config::PipelineConfig;
use crash_weather_etl::pipeline::Pipeline;
use crash_weather_etl::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("crash_weather_etl=info".parse()?))
        .init();

    let config = PipelineConfig::from_env()?;

    info!(
        db_url = %config.database_url,
        state = config.state_code,
        county = config.county_code,
        sensor = config.sensor_id,
        "Starting ETL run"
    );

    let storage = Storage::new(&config.database_url).await?;
    info!("Database initialized");

    let pipeline = Pipeline::new(config, storage);
    let summary = pipeline.run(Local::now().date_naive()).await?;

    info!(
        weather = summary.loaded.weather,
        crashes = summary.loaded.crashes,
        case_details = summary.loaded.case_details,
        ozone = summary.loaded.ozone,
        cases_fetched = summary.cases_fetched,
        cases_failed = summary.cases_failed,
        "ETL run finished"
    );

    Ok(())
}
