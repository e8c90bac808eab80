use crate::infra::open_marketplace;
use chrono::Utc;
use clap::Args;
use treehub::config::AppConfig;
use treehub::error::AppError;
use treehub::marketplace::{seed_demo_data, SeedOutcome, DEMO_EMAIL, DEMO_PASSWORD};

#[derive(Args, Debug, Default)]
pub(crate) struct SeedArgs {
    /// SQLite file to seed (defaults to APP_DATABASE_PATH)
    #[arg(long)]
    pub(crate) database: Option<String>,
}

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args.database.unwrap_or_else(|| config.database.path.clone());
    let marketplace = open_marketplace(&config, &path)?;

    match seed_demo_data(&marketplace, Utc::now().date_naive())? {
        SeedOutcome::Seeded(summary) => {
            println!("Seeded TreeHub database at {path}");
            println!(
                "  {} companies, {} jobs, {} equipment listings",
                summary.companies, summary.jobs, summary.equipment
            );
            println!("  Demo account: {DEMO_EMAIL} / {DEMO_PASSWORD}");
        }
        SeedOutcome::AlreadySeeded => {
            println!("{path} already contains the demo data; nothing to do");
        }
    }
    Ok(())
}
