use anyhow::Result;
use chrono::Local;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bondsheet::api::{MorningstarSource, WebDriverSession};
use bondsheet::catalog::{classify, Classified};
use bondsheet::collector::Collector;
use bondsheet::models::Config;
use bondsheet::normalize::normalize_all;
use bondsheet::reconcile::reconcile;
use bondsheet::report::CsvWorkbook;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("❌ {:#}", e);
        eprintln!("Exiting without producing a report.");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    info!("Getting spreadsheet path...");
    let config = Config::load()?;

    info!("Preparing workbook...");
    let workbook = CsvWorkbook::open(&config.sheet_path)?;

    info!("Getting list of bonds...");
    let rows = workbook.rows();
    let Classified {
        mut indexes,
        mut bonds,
    } = classify(&rows);

    if indexes.is_empty() && bonds.is_empty() {
        anyhow::bail!("no bond rows found in {}", config.sheet_path.display());
    }
    if indexes.is_empty() {
        warn!("sheet has no index funds; bonds with missing data cannot be reconciled");
    }
    info!("Found {} index funds and {} bonds", indexes.len(), bonds.len());

    let session = WebDriverSession::connect(&config).await?;
    let collector = Collector::new(MorningstarSource::new(session), &config);

    info!("Getting index fund values...");
    let mut acquisition = collector.acquire_all(&mut indexes).await;
    if acquisition.is_ok() {
        info!("Getting bond values...");
        acquisition = collector.acquire_all(&mut bonds).await;
    }

    // The browser session is released on every path, including the fatal
    // one.
    if let Err(e) = collector.source().shutdown().await {
        warn!("could not close browser session: {}", e);
    }
    acquisition?;

    info!("Filling in empty bond values with index data...");
    reconcile(&mut bonds, &indexes)?;

    info!("Converting readings to numbers...");
    normalize_all(&mut indexes)?;
    normalize_all(&mut bonds)?;

    info!("Saving {} report...", Local::now().format("%b %Y"));
    workbook.write_report(indexes.iter().chain(bonds.iter()))?;

    info!("Done!");
    Ok(())
}
