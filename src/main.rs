use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use gbw_etl::config::Config;
use gbw_etl::extract::Extractor;
use gbw_etl::load::WarehouseLoader;
use gbw_etl::logging;
use gbw_etl::transform::{transform, TransformOptions};

#[derive(Parser)]
#[command(name = "gbw_etl")]
#[command(about = "Ground-booking warehouse ETL")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract -> transform -> load pipeline
    Run {
        /// Apply IQR outlier filtering to bookings before building dimensions
        #[arg(long)]
        remove_outliers: bool,
        /// Stop after the transform stage and only report table shapes
        #[arg(long)]
        skip_load: bool,
    },
    /// Fetch the raw feeds and report their shapes without transforming
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config.toml")?;

    match cli.command {
        Commands::Run {
            remove_outliers,
            skip_load,
        } => {
            println!("🔄 Running warehouse ETL...");
            let extractor =
                Extractor::new(config.sources).context("Failed to construct extractor")?;
            let (bookings, grounds, users) = extractor
                .extract_data()
                .await
                .context("Extraction failed")?;

            let options = TransformOptions { remove_outliers };
            let tables = transform(&bookings, &grounds, &users, &options)
                .context("Transform failed")?;

            println!("\n📊 Transform results:");
            println!("   dim_users: {} rows", tables.dim_users.len());
            println!("   dim_grounds: {} rows", tables.dim_grounds.len());
            println!("   dim_date: {} rows", tables.dim_date.len());
            println!("   fact_bookings: {} rows", tables.fact_bookings.len());

            if skip_load {
                info!("Skipping warehouse load (--skip-load)");
                println!("\n⏭️  Warehouse load skipped.");
            } else {
                let mut loader = WarehouseLoader::open(&config.warehouse)
                    .context("Failed to open warehouse database")?;
                loader
                    .load_warehouse(&tables)
                    .context("Warehouse load failed")?;
                println!("\n✅ All tables loaded successfully.");
            }
        }
        Commands::Check => {
            println!("🔎 Checking raw feeds...");
            let extractor =
                Extractor::new(config.sources).context("Failed to construct extractor")?;
            let (bookings, grounds, users) = extractor
                .extract_data()
                .await
                .context("Extraction failed")?;

            println!("\n📊 Raw feed shapes:");
            println!(
                "   bookings: {} rows x {} columns",
                bookings.row_count(),
                bookings.column_count()
            );
            println!(
                "   grounds: {} rows x {} columns",
                grounds.row_count(),
                grounds.column_count()
            );
            println!(
                "   users: {} rows x {} columns",
                users.row_count(),
                users.column_count()
            );
        }
    }

    Ok(())
}
