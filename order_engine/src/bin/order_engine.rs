use std::fs::File;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use order_engine::dealer;
use order_engine::db::{connection::connect_sqlite, migrate};
use order_engine::emitter::TemplateType;
use order_engine::ops;
use order_engine::queue::{QueueJob, QueueOptions, QueueProcessor};
use order_engine::resolver::OrderMode;
use order_engine::session;

#[derive(Parser)]
#[command(version, about = "Graphics Order Engine CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Database maintenance.
    Db(DbCmd),
    /// Dealership catalog maintenance.
    Catalog(CatalogCmd),
    /// Run a scraping session for the given dealerships.
    Scrape {
        /// Dealership names; defaults to every active dealership.
        #[arg(long = "dealership", value_name = "NAME")]
        dealerships: Vec<String>,
    },
    /// Process order jobs through the resolver and emitter.
    Process {
        #[arg(long)]
        dealership: String,
        /// "cao" or "list".
        #[arg(long, default_value = "cao")]
        mode: String,
        /// Template override: "shortcut", "shortcut_pack", or "flyout".
        #[arg(long)]
        template: Option<String>,
        /// LIST mode: comma-separated VINs.
        #[arg(long, value_delimiter = ',')]
        vins: Vec<String>,
        /// Produce files under dry/ and persist nothing.
        #[arg(long)]
        dry_run: bool,
    },
    /// Bulk-ingest an inventory CSV and activate its manifest.
    ImportCsv {
        #[arg(long, value_name = "FILE")]
        file: String,
        /// Override the location column for the whole file.
        #[arg(long)]
        dealership: Option<String>,
    },
    /// VIN-log import/export.
    VinLog(VinLogCmd),
    /// Export one import's raw rows as CSV.
    ExportImport {
        #[arg(long)]
        import_id: String,
        #[arg(long, value_name = "FILE")]
        out: String,
    },
}

#[derive(Args)]
struct DbCmd {
    #[command(subcommand)]
    sub: DbSub,
}

#[derive(Subcommand)]
enum DbSub {
    /// Apply pending migrations.
    Migrate,
}

#[derive(Args)]
struct CatalogCmd {
    #[command(subcommand)]
    sub: CatalogSub,
}

#[derive(Subcommand)]
enum CatalogSub {
    /// Sync the TOML catalog into the database.
    Sync {
        #[arg(long, value_name = "FILE")]
        file: String,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        prune: bool,
    },
    /// Parse and normalize the catalog without touching the database.
    Check {
        #[arg(long, value_name = "FILE")]
        file: String,
    },
}

#[derive(Args)]
struct VinLogCmd {
    #[command(subcommand)]
    sub: VinLogSub,
}

#[derive(Subcommand)]
enum VinLogSub {
    /// Bulk-append entries from a CSV file.
    Import {
        #[arg(long, value_name = "FILE")]
        file: String,
        #[arg(long)]
        dealership: String,
        #[arg(long)]
        skip_duplicates: bool,
        #[arg(long)]
        update_existing: bool,
    },
    /// Write a dealership's log to a CSV file.
    Export {
        #[arg(long)]
        dealership: String,
        #[arg(long, value_name = "FILE")]
        out: String,
    },
}

fn parse_mode(s: &str) -> Result<OrderMode> {
    match s.to_lowercase().as_str() {
        "cao" => Ok(OrderMode::Cao),
        "list" => Ok(OrderMode::List),
        other => bail!("unknown mode '{other}' (expected cao or list)"),
    }
}

fn parse_template(s: &str) -> Result<TemplateType> {
    match s.to_lowercase().as_str() {
        "shortcut" => Ok(TemplateType::Shortcut),
        "shortcut_pack" => Ok(TemplateType::ShortcutPack),
        "flyout" => Ok(TemplateType::Flyout),
        other => bail!("unknown template '{other}'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

    match cli.cmd {
        Cmd::Db(DbCmd { sub: DbSub::Migrate }) => {
            migrate::run_sqlite(&db_url)?;
            println!("migrations applied");
        }

        Cmd::Catalog(CatalogCmd { sub }) => match sub {
            CatalogSub::Sync { file, dry_run, prune } => {
                let cat = dealer::config::load_catalog_path(&file)?;
                let mut conn = connect_sqlite(&db_url)?;
                let diff = dealer::sync::sync_dealerships(
                    &mut conn,
                    cat,
                    dealer::sync::SyncOptions { dry_run, prune },
                )?;
                if dry_run {
                    println!(
                        "would upsert {} and delete {} dealership(s)",
                        diff.upsert.len(),
                        diff.delete.len()
                    );
                } else {
                    dealer::cache::refresh_dealers(&mut conn)?;
                    println!(
                        "upserted {} and deleted {} dealership(s)",
                        diff.upsert.len(),
                        diff.delete.len()
                    );
                }
            }
            CatalogSub::Check { file } => {
                let cat = dealer::config::load_catalog_path(&file)?;
                println!("catalog ok: {} dealership(s)", cat.dealerships.len());
            }
        },

        Cmd::Scrape { dealerships } => {
            let rows = {
                let mut conn = connect_sqlite(&db_url)?;
                let all = ops::list_dealerships(&mut conn)?;
                if dealerships.is_empty() {
                    all.into_iter().filter(|d| d.is_active).collect::<Vec<_>>()
                } else {
                    let wanted: Vec<_> = all
                        .into_iter()
                        .filter(|d| dealerships.contains(&d.name))
                        .collect();
                    if wanted.len() != dealerships.len() {
                        bail!("one or more dealerships not found in the catalog");
                    }
                    wanted
                }
            };

            let adapters = order_engine::adapters::build_adapters(&rows)?;
            if adapters.is_empty() {
                bail!("no scrapeable dealerships (missing feed_url wiring)");
            }

            let outcome = session::run_scrape_session(
                &db_url,
                adapters,
                session::log_events(),
                CancellationToken::new(),
            )
            .await?;

            println!(
                "session {}: {} vehicles, {} adapter failure(s), manifest {} {}",
                outcome.summary.session_id,
                outcome.summary.vehicles_total,
                outcome.summary.failures.len(),
                outcome.import_id,
                if outcome.activated { "activated" } else { "left pending" },
            );
        }

        Cmd::Process { dealership, mode, template, vins, dry_run } => {
            let job = QueueJob {
                dealership,
                mode: parse_mode(&mode)?,
                template: template.as_deref().map(parse_template).transpose()?,
                vins,
            };
            let mut conn = connect_sqlite(&db_url)?;
            let results = QueueProcessor::new().process(
                &mut conn,
                &[job],
                QueueOptions {
                    skip_vin_logging: dry_run,
                },
            );
            for result in results {
                match (&result.success, &result.csv_path, &result.error) {
                    (true, Some(csv), _) => println!(
                        "{}: {} included, {} skipped -> {}",
                        result.dealership,
                        result.included,
                        result.skipped,
                        csv.display()
                    ),
                    (_, _, Some(error)) => println!("{}: FAILED: {error}", result.dealership),
                    _ => {}
                }
            }
        }

        Cmd::ImportCsv { file, dealership } => {
            let mut conn = connect_sqlite(&db_url)?;
            let reader = File::open(&file).with_context(|| format!("open {file}"))?;
            let outcome = ops::import_csv(
                &mut conn,
                reader,
                dealership.as_deref(),
                Some(&file),
                chrono::Utc::now(),
            )?;
            println!(
                "import {} active with {} vehicle(s)",
                outcome.import_id, outcome.vehicle_count
            );
        }

        Cmd::VinLog(VinLogCmd { sub }) => match sub {
            VinLogSub::Import { file, dealership, skip_duplicates, update_existing } => {
                let mut conn = connect_sqlite(&db_url)?;
                let reader = File::open(&file).with_context(|| format!("open {file}"))?;
                let counts = ops::import_vin_log(
                    &mut conn,
                    reader,
                    &dealership,
                    ops::VinLogImportOptions {
                        skip_duplicates,
                        update_existing,
                    },
                )?;
                println!(
                    "imported {}, skipped {}, updated {}",
                    counts.imported, counts.skipped, counts.updated
                );
            }
            VinLogSub::Export { dealership, out } => {
                let mut conn = connect_sqlite(&db_url)?;
                let bytes = ops::export_vin_log(&mut conn, &dealership)?;
                std::fs::write(&out, bytes).with_context(|| format!("write {out}"))?;
                println!("wrote {out}");
            }
        },

        Cmd::ExportImport { import_id, out } => {
            let mut conn = connect_sqlite(&db_url)?;
            let bytes = ops::export_scraper_import(&mut conn, &import_id)?;
            std::fs::write(&out, bytes).with_context(|| format!("write {out}"))?;
            println!("wrote {out}");
        }
    }

    Ok(())
}
