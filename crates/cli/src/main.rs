//! Command-line client for the NovaCare integration router.
//!
//! Runs the same router operations as the HTTP surface, in-process, against the configured
//! upstreams. Useful for checking a site's wiring without starting the server.

use anyhow::{bail, Context};
use api_shared::{messages, RECORD_ORIGIN_HEADER};
use clap::{Args, Parser, Subcommand};
use novacare_core::constants::{
    DEFAULT_BILLING_BASE_URL, DEFAULT_CENTRAL_BASE_URL, DEFAULT_LOCAL_BASE_URL,
};
use novacare_core::{
    IntegrationRouter, PatientQuery, Payload, RouterConfig, RouterError, UpstreamResponse,
};
use novacare_types::Cin;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "novacare")]
#[command(about = "NovaCare patient integration router CLI")]
struct Cli {
    #[command(flatten)]
    upstreams: Upstreams,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Upstreams {
    /// Central patient registry base URL
    #[arg(long, env = "PATIENT_SERVICE_URL", default_value = DEFAULT_CENTRAL_BASE_URL, global = true)]
    central_url: String,
    /// Local site store base URL
    #[arg(long, env = "LOCAL_SITE_URL", default_value = DEFAULT_LOCAL_BASE_URL, global = true)]
    local_url: String,
    /// Peer (central-tier) router used for check-in misses
    #[arg(long, env = "ESB_CENTRAL_URL", global = true)]
    peer_url: Option<String>,
    /// Billing service base URL
    #[arg(long, env = "BILLING_SERVICE_URL", default_value = DEFAULT_BILLING_BASE_URL, global = true)]
    billing_url: String,
    /// Consultation service base URL (defaults to the local site)
    #[arg(long, env = "CONSULTATION_SERVICE_URL", global = true)]
    consultation_url: Option<String>,
    /// Per-hop timeout in seconds
    #[arg(long, env = "HOP_TIMEOUT_SECS", default_value_t = 10, global = true)]
    hop_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the central registry by CIN, or by first and last name
    Search {
        /// National identity number
        #[arg(long)]
        cin: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Check a patient in at this site, fetching and syncing from the central tier on a miss
    Checkin {
        /// National identity number
        cin: String,
    },
    /// Create a patient in the central registry
    Create {
        /// JSON file holding the patient record
        file: PathBuf,
    },
    /// List a patient's consultations
    Consultations {
        /// Local site patient id
        patient_id: String,
    },
    /// Generate a bill
    Billing {
        /// JSON file holding the billing request
        file: PathBuf,
    },
}

impl Upstreams {
    fn config(&self) -> anyhow::Result<RouterConfig> {
        let mut cfg = RouterConfig::new(&self.central_url, &self.local_url, &self.billing_url)?
            .with_hop_timeout(Duration::from_secs(self.hop_timeout_secs))?;
        if let Some(peer) = &self.peer_url {
            cfg = cfg.with_peer_router(peer)?;
        }
        if let Some(consultation) = &self.consultation_url {
            cfg = cfg.with_consultation_service(consultation)?;
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("novacare=warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("No command given. Use --help for usage.");
        return Ok(());
    };

    let cfg = cli.upstreams.config()?;
    tracing::debug!(
        central = %cfg.central_base_url(),
        local = %cfg.local_base_url(),
        "router configured"
    );
    let router = IntegrationRouter::from_config(&cfg)?;

    match command {
        Commands::Search {
            cin,
            first_name,
            last_name,
        } => {
            let query =
                PatientQuery::from_params(cin.as_deref(), first_name.as_deref(), last_name.as_deref())
                    .map_err(explain)?;
            let record = router.lookup(&query).await.map_err(explain)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Checkin { cin } => {
            let cin = Cin::parse(&cin).context(messages::CIN_REQUIRED)?;
            let outcome = router.checkin(&cin).await.map_err(explain)?;
            eprintln!("{RECORD_ORIGIN_HEADER}: {}", outcome.origin().as_str());
            println!("{}", serde_json::to_string_pretty(outcome.record())?);
        }
        Commands::Create { file } => {
            let response = router.create(Payload::json(read_json(&file)?)).await.map_err(explain)?;
            print_relayed(response)?;
        }
        Commands::Consultations { patient_id } => {
            let response = router.consultations(&patient_id).await.map_err(explain)?;
            print_relayed(response)?;
        }
        Commands::Billing { file } => {
            let response = router
                .billing_generate(Payload::json(read_json(&file)?))
                .await
                .map_err(explain)?;
            print_relayed(response)?;
        }
    }

    Ok(())
}

/// Attaches the caller-facing message to a router error.
fn explain(err: RouterError) -> anyhow::Error {
    let message = err.message();
    anyhow::Error::new(err).context(message)
}

/// Reads a request body from disk, refusing anything that is not JSON.
fn read_json(file: &Path) -> anyhow::Result<String> {
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str::<serde_json::Value>(&body)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    Ok(body)
}

fn print_relayed(response: UpstreamResponse) -> anyhow::Result<()> {
    eprintln!("status: {}", response.status);
    match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", String::from_utf8_lossy(&response.body)),
    }
    if !(200..300).contains(&response.status) {
        bail!("upstream answered {}", response.status);
    }
    Ok(())
}
