//! Integrity CLI
//!
//! Command-line front end for the verification and registration service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use integrity_client::batch::BatchOrchestrator;
use integrity_client::service::{HttpService, IntegrityService, RegistrationRequest};
use integrity_client::{ClientConfig, ItemStatus, LocalFile, Session, VerificationOutcome, VerificationSubmitter};

/// Verify files against the integrity registry, or register new ones
#[derive(Parser)]
#[command(name = "integrity")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Service base URL (overrides INTEGRITY_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Login {
    /// Operator username (falls back to INTEGRITY_USERNAME)
    #[arg(short, long)]
    username: Option<String>,

    /// Operator password (falls back to INTEGRITY_PASSWORD)
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the service is reachable
    Health,

    /// Verify a single file against the registry
    Verify {
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Log in and report the authenticated identity
    Login {
        #[command(flatten)]
        login: Login,
    },

    /// Create an operator account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
    },

    /// Register one or more files as a single batch
    Upload {
        #[command(flatten)]
        login: Login,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show registry totals
    Stats {
        #[command(flatten)]
        login: Login,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "integrity_client=debug,integrity=debug"
    } else {
        "integrity_client=info,integrity=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }

    tracing::debug!(base_url = %config.api.base_url, "Using service");

    let service = Arc::new(HttpService::new(&config.api)?);

    match cli.command {
        Commands::Health => {
            let health = service.health().await?;
            emit(cli.json, &health, || {
                println!("{} ({})", health.status, service.base_url());
            })?;
        }
        Commands::Verify { file } => {
            let file = LocalFile::from_path(&file).await?;
            let submitter = VerificationSubmitter::new(service.clone());
            let outcome = submitter.submit(&file).await?;
            emit(cli.json, &outcome, || print_outcome(file.name(), &outcome))?;
        }
        Commands::Login { login } => {
            let session = open_session(&service, &config, login).await?;
            let identity = session.identity().context("Session closed unexpectedly")?;
            emit(cli.json, &identity, || {
                println!("Logged in as {} <{}> ({})", identity.username, identity.email, identity.id);
            })?;
            session.logout(&*service).await;
        }
        Commands::Register {
            username,
            password,
            email,
            full_name,
        } => {
            let request = RegistrationRequest {
                username,
                password,
                email,
                full_name,
            };
            let id = Session::register(&*service, &request).await?;
            emit(cli.json, &serde_json::json!({ "admin_id": id }), || {
                println!("Registered {} ({})", request.username, id);
            })?;
        }
        Commands::Upload { login, files } => {
            let mut local = Vec::with_capacity(files.len());
            for path in &files {
                local.push(LocalFile::from_path(path).await?);
            }

            let session = open_session(&service, &config, login).await?;
            let orchestrator = BatchOrchestrator::new(service.clone());
            let result = orchestrator.submit_batch(&session, local).await;
            let items = orchestrator.current_batch().await;
            session.logout(&*service).await;
            let report = result?;

            #[derive(Serialize)]
            struct UploadOutput<'a> {
                report: &'a integrity_client::BatchReport,
                items: &'a [integrity_client::SubmittedItem],
            }

            emit(cli.json, &UploadOutput { report: &report, items: &items }, || {
                for item in &items {
                    match item.status {
                        ItemStatus::Success => println!(
                            "OK    {}  record={}  tx={}",
                            item.filename,
                            item.record_id.as_ref().map(|r| r.as_str()).unwrap_or("-"),
                            item.chain_ref.as_deref().unwrap_or("-"),
                        ),
                        _ => println!(
                            "FAIL  {}  {}",
                            item.filename,
                            item.error.as_deref().unwrap_or("unknown error"),
                        ),
                    }
                }
                println!(
                    "{} submitted, {} succeeded, {} failed (cleanup: {})",
                    report.submitted,
                    report.succeeded,
                    report.failed,
                    String::from(report.cleanup_status.clone()),
                );
            })?;
        }
        Commands::Stats { login } => {
            let session = open_session(&service, &config, login).await?;
            let orchestrator = BatchOrchestrator::new(service.clone());
            let result = orchestrator.refresh_stats(&session).await;
            session.logout(&*service).await;
            let stats = result?;

            emit(cli.json, &stats, || {
                if let Some(server) = &stats.server {
                    println!("Registered records: {}", server.total_records);
                    println!("Index entries:      {}", server.csv_entries);
                }
            })?;
        }
    }

    Ok(())
}

async fn open_session(
    service: &HttpService,
    config: &ClientConfig,
    login: Login,
) -> anyhow::Result<Session> {
    let username = login
        .username
        .or_else(|| config.credentials.username.clone())
        .context("No username given (use --username or INTEGRITY_USERNAME)")?;
    let password = login
        .password
        .or_else(|| config.credentials.password.clone())
        .context("No password given (use --password or INTEGRITY_PASSWORD)")?;

    Ok(Session::login(service, &username, &password).await?)
}

fn print_outcome(name: &str, outcome: &VerificationOutcome) {
    match outcome {
        VerificationOutcome::Matched(record) => {
            println!("ORIGINAL  {}", name);
            println!("  registered as: {}", record.matched_file);
            println!("  hash:          {}", record.hash);
            println!("  record:        {}", record.record_id);
            println!("  block:         {}", record.block_number);
            println!("  timestamp:     {}", record.timestamp);
        }
        VerificationOutcome::NotMatched { hash, message } => {
            println!("NO MATCH  {}", name);
            println!("  hash: {}", hash);
            if !message.is_empty() {
                println!("  {}", message);
            }
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce()) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}
