use std::io::{self, Read};
use std::process::ExitCode;

use miniapp_auth::config::{Config, LogFormat};
use miniapp_auth::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    info!(max_age_secs = config.max_age.as_secs(), "verifier configured");

    let report = run(&config, std::env::args().nth(1))?;
    println!("{}", report.body);
    Ok(if report.verified {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

struct Report {
    verified: bool,
    body: String,
}

/// Verifies the launch data given as the first argument, or read from stdin,
/// and renders the outcome as JSON.
fn run(config: &Config, arg: Option<String>) -> Result<Report> {
    let raw = match arg {
        Some(arg) => arg,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let service = config.verification_service();
    let report = match service.verify(&raw) {
        Ok(launch) => Report {
            verified: true,
            body: serde_json::to_string_pretty(&launch)?,
        },
        Err(e) => Report {
            verified: false,
            body: json!({ "error": e.reason(), "message": e.to_string() }).to_string(),
        },
    };
    Ok(report)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
