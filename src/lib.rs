pub mod api;
pub mod auth;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod resolve;

use tracing_subscriber::EnvFilter;

use auth::credentials::load_credentials;
use bridge::{Outcome, RefreshOptions};
use cli::output::print_error;
use error::AppError;
use manager::{CloudDeviceManager, ConnectOptions, MerossManager};

/// Log to stderr. `RUST_LOG` wins over the debug flag.
pub fn init_tracing(debug: bool) {
    let default = if debug { "meross_bridge=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub async fn run(cli_args: cli::Cli) -> i32 {
    match execute(&cli_args).await {
        Ok(report) => {
            if let Some(text) = report.output {
                println!("{}", text);
            }
            match report.error {
                Some(err) => {
                    print_error(&err);
                    err.exit_code()
                }
                None => 0,
            }
        }
        Err(err) => {
            print_error(&err);
            err.exit_code()
        }
    }
}

/// What to print, and an error that still lets the output through.
struct Report {
    output: Option<String>,
    error: Option<AppError>,
}

async fn execute(cli_args: &cli::Cli) -> Result<Report, AppError> {
    let config = cli_args.runtime_config();
    let plan = cli_args.plan();
    tracing::debug!(?config, ?plan, "starting");

    cli::show::validate(config.output_mode, &plan.selector)?;
    if plan.action.is_some() {
        resolve::validate_switch_selector(&plan.selector)?;
    }

    let credentials = load_credentials(&cli_args.credential_sources())?;

    let outcome = if plan.needs_cloud() {
        let options = ConnectOptions::from_config(&config, cli_args.mfa_code.clone());
        let mut manager = MerossManager::connect(&credentials, &options).await?;
        let refresh = RefreshOptions::new(config.history);

        let result = bridge::execute(&mut manager, &plan, &refresh).await;
        if let Err(e) = manager.close().await {
            tracing::warn!(error = %e, "could not close the cloud session");
        }
        result?
    } else {
        Outcome::default()
    };

    let rendered = cli::show::render(&outcome.records, &plan.selector, config.output_mode);
    match (rendered, outcome.switch_error) {
        (Ok(output), error) => Ok(Report { output, error }),
        (Err(e), None) => Err(e),
        (Err(render_err), Some(switch_err)) => {
            tracing::debug!(error = %render_err, "nothing to show after failed switch");
            Err(switch_err)
        }
    }
}
