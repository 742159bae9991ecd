// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haavi - Resilient Web Fetch CLI
 * One-off fetches through the reliability pipeline
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use haavi::config::FetchConfig;
use haavi::http_client::{FetchClient, FetchRequest, RequestBody};

/// Haavi - Resilient Web Fetch Toolkit
#[derive(Parser)]
#[command(name = "haavi")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "Fetch URLs through rate limiting, circuit breaking and caching", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL and print the JSON response
    Fetch {
        /// Target URL
        url: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request header, repeatable (NAME: VALUE)
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Form-encoded request body
        #[arg(long, conflicts_with = "json")]
        form: Option<String>,

        /// JSON request body
        #[arg(long)]
        json: Option<String>,

        /// Route through a named persistent session (keeps cookies)
        #[arg(short, long)]
        session: Option<String>,

        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Print current configuration and component state
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = FetchConfig::from_env().context("loading configuration")?;
    let client = FetchClient::new(config)?;

    match cli.command {
        Commands::Fetch {
            url,
            method,
            headers,
            form,
            json,
            session,
            no_cache,
        } => {
            let mut request = FetchRequest::get(&url);
            request.method = method
                .to_uppercase()
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid HTTP method: {}", method))?;

            for header in &headers {
                let Some((name, value)) = header.split_once(':') else {
                    bail!("malformed header (expected NAME: VALUE): {}", header);
                };
                request = request.with_header(name.trim(), value.trim());
            }

            if let Some(form) = form {
                request = request.with_body(RequestBody::Form(form));
            } else if let Some(json) = json {
                let value = serde_json::from_str(&json).context("parsing --json body")?;
                request = request.with_body(RequestBody::Json(value));
            }

            if let Some(session) = &session {
                request = request.with_session(session);
            }
            if no_cache {
                request = request.without_cache();
            }

            let response = client.execute(request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Health => {
            let report = client.health().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    client.shutdown().await;
    Ok(())
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
