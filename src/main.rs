use clap::{Args, Parser, Subcommand};
use cultural_atlas::{binder, config, data, server};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard
    Serve(DataArgs),
    /// Load and validate both datasets, then exit
    Validate(DataArgs),
}

#[derive(Args)]
struct DataArgs {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
    /// Attendance CSV, overriding the config file
    #[arg(long, value_name = "FILE", env = "CULTURAL_ATLAS_ATTENDANCE")]
    attendance: Option<PathBuf>,
    /// Venue shapefile or GeoJSON, overriding the config file
    #[arg(long, value_name = "FILE", env = "CULTURAL_ATLAS_VENUES")]
    venues: Option<PathBuf>,
}

impl DataArgs {
    fn load_config(&self) -> anyhow::Result<config::AppConfig> {
        info!("Using config {:?}", self.config);
        let app_config = config::AppConfig::load_from_file(&self.config)?;
        Ok(app_config.with_overrides(self.attendance.clone(), self.venues.clone()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(args) => {
            let app_config = args.load_config()?;

            // Missing columns abort here, before any session is served.
            let datasets = data::load_data(&app_config)?;
            let dashboard = binder::Dashboard::new(datasets, &app_config);

            server::start_server(app_config, dashboard).await?;
        }
        Commands::Validate(args) => {
            let app_config = args.load_config()?;
            let datasets = data::load_data(&app_config)?;
            info!(
                attendance_rows = datasets.attendance.len(),
                venues = datasets.venues.len(),
                categories = datasets.categories.len(),
                "Datasets are valid"
            );
        }
    }

    Ok(())
}
