//! Command-line interface for the Vitrine alert server.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use vitrine_api::config::{ConfigNotice, ServerConfig};
use vitrine_api::{StartupLogger, TokenValidator};

/// Vitrine - alert fan-out server for the store back office.
#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web server.
    Serve {
        /// Host to bind to (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load the configuration, report problems and print the result.
    CheckConfig,
    /// Issue a WebSocket token signed with the configured secret.
    Token {
        /// User id carried by the token.
        user: String,
        /// Role carried by the token.
        #[arg(short, long)]
        role: Option<String>,
        /// Lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        ttl: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let json_logging = std::env::var("VITRINE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);
    init_logging(json_logging, args.verbose);

    match args.command {
        Command::Serve { host, port } => run_server(host, port, json_logging).await,
        Command::CheckConfig => check_config(),
        Command::Token { user, role, ttl } => issue_token(&user, role.as_deref(), ttl),
    }
}

fn init_logging(json: bool, verbose: bool) {
    let default_level = if verbose { "vitrine=debug" } else { "vitrine=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(default_level).add_directive(tracing::Level::WARN.into())
    });

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }
}

async fn run_server(host: Option<String>, port: Option<u16>, quiet: bool) -> Result<()> {
    let mut loaded = ServerConfig::load().context("Failed to load configuration")?;
    if let Some(host) = host {
        loaded.config.host = host;
    }
    if let Some(port) = port {
        loaded.config.port = port;
    }

    let startup = if quiet {
        StartupLogger::quiet()
    } else {
        StartupLogger::new()
    };
    vitrine_api::run(loaded, startup).await
}

fn check_config() -> Result<()> {
    let loaded = ServerConfig::load().context("Failed to load configuration")?;
    let mut config = loaded.config;
    config.bind_addr().context("Invalid bind address")?;

    match &loaded.source {
        Some(path) => eprintln!("Configuration file: {}", path.display()),
        None => eprintln!("No configuration file, using defaults"),
    }
    for notice in &loaded.notices {
        let ConfigNotice::Deprecated { message, .. } = notice;
        eprintln!("warning: {}", message);
    }
    if config.jwt_secret.is_some() {
        config.jwt_secret = Some("********".to_string());
    } else {
        eprintln!("warning: no JWT secret, WebSocket authentication will fail");
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn issue_token(user: &str, role: Option<&str>, ttl: i64) -> Result<()> {
    let loaded = ServerConfig::load().context("Failed to load configuration")?;
    let validator = TokenValidator::new(loaded.config.jwt_secret);
    if !validator.is_configured() {
        anyhow::bail!("No JWT secret configured, set VITRINE_JWT_SECRET");
    }
    let token = validator.issue(user, role, ttl)?;
    println!("{}", token);
    Ok(())
}
