mod config;
mod error;
mod logging;
mod matching;
mod ports;
mod services;
mod spotify_rs;
mod store;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    logging::init_tracing,
    ports::{auth::Credentials, clock::SystemClock, store::SettingsStore},
    services::{
        matcher::ReleaseMatcher,
        search::{Metadata, SearchOrchestrator},
        token::TokenManager,
    },
    spotify_rs::{auth::SpotifyTokenExchanger, client::SpotifyClient},
    store::JsonFileStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "RELEASE_MATCHER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `release_matcher=debug`
    #[arg(long, default_value = "warn", global = true, env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the catalog album for a release
    Search {
        #[arg(short, long)]
        artist: Option<String>,

        #[arg(short = 'b', long)]
        album: Option<String>,

        #[arg(short, long)]
        year: Option<String>,

        /// Print the match as JSON
        #[arg(long)]
        json: bool,
    },
    #[command(subcommand)]
    Auth(AuthCommands),
    /// Turn player replacement on
    Enable,
    /// Turn player replacement off
    Disable,
    /// Renew the access token if a session is active
    Renew {
        /// Keep running and renew on the configured interval
        #[arg(long)]
        watch: bool,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum AuthCommands {
    /// Save client credentials and obtain a token
    Login {
        #[arg(long, env = "SPOTIFY_CLIENT_ID")]
        client_id: String,

        #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,
    },
    /// Show whether credentials are configured and a token is valid
    Status,
    /// Drop the cached token, keeping credentials
    Logout,
    /// Remove credentials and token
    Revoke,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

fn build_matcher(config: &Config) -> Result<ReleaseMatcher> {
    let file_store = JsonFileStore::new(config.state_file_path()?);
    tracing::debug!("Using state file: {}", file_store.path().display());
    let store: Arc<dyn SettingsStore> = Arc::new(file_store);

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .wrap_err("Failed to build HTTP client")?;

    let exchanger = SpotifyTokenExchanger::new(
        http.clone(),
        config.token_url.clone(),
        config.request_timeout(),
    );
    let tokens = Arc::new(TokenManager::new(
        Box::new(exchanger),
        store.clone(),
        Arc::new(SystemClock),
    ));

    let catalog = SpotifyClient::new(
        http,
        config.search_url.clone(),
        config.market.clone(),
        config.search_limit,
        config.request_timeout(),
    );
    let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens.clone());

    Ok(ReleaseMatcher::new(store, tokens, orchestrator))
}

fn run_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::CreateDefault => {
            let path = Config::create_default()?;
            println!("{}", path.display());
        }
        ConfigCommands::Path => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No default config path found"),
        },
    }
    Ok(())
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Search {
            artist,
            album,
            year,
            json,
        } => {
            let matcher = build_matcher(&config)?;
            let metadata = Metadata::new(artist, album, year);
            let found = matcher.search(&metadata).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else if let Some(album) = found {
                println!("{} - {}", album.artists.join(", "), album.name);
                println!("  type:   {:?}, {} tracks", album.album_type, album.total_tracks);
                println!("  url:    {}", album.external_url);
                println!("  player: {}", album.embed_url());
            } else {
                println!("No match found");
            }
        }
        Commands::Auth(auth_command) => {
            let matcher = build_matcher(&config)?;
            match auth_command {
                AuthCommands::Login {
                    client_id,
                    client_secret,
                } => {
                    matcher
                        .save_credentials(&Credentials::new(client_id, client_secret))
                        .await
                        .wrap_err("Failed to save credentials")?;
                    let outcome = matcher.authenticate().await;
                    match outcome.error {
                        None => println!("Authenticated"),
                        Some(error) => {
                            return Err(color_eyre::eyre::eyre!("Could not authenticate: {}", error));
                        }
                    }
                }
                AuthCommands::Status => {
                    let status = matcher.get_auth_status().await;
                    println!("configured:    {}", status.is_configured);
                    println!("authenticated: {}", status.is_authenticated);
                    println!("enabled:       {}", matcher.is_enabled());
                }
                AuthCommands::Logout => {
                    let outcome = matcher.logout().await;
                    if !outcome.success {
                        return Err(color_eyre::eyre::eyre!("Failed to clear the cached token"));
                    }
                    println!("Logged out");
                }
                AuthCommands::Revoke => {
                    matcher
                        .revoke()
                        .await
                        .wrap_err("Failed to revoke credentials")?;
                    println!("Credentials removed");
                }
            }
        }
        Commands::Enable => {
            build_matcher(&config)?.set_enabled(true)?;
            println!("Enabled");
        }
        Commands::Disable => {
            build_matcher(&config)?.set_enabled(false)?;
            println!("Disabled");
        }
        Commands::Renew { watch } => {
            let matcher = build_matcher(&config)?;
            if watch {
                let handle = matcher
                    .tokens()
                    .clone()
                    .spawn_renewal_task(config.renewal_interval());
                tokio::signal::ctrl_c()
                    .await
                    .wrap_err("Failed to listen for ctrl-c")?;
                handle.abort();
            } else if matcher.tokens().renew_if_active().await? {
                println!("Token renewed");
            } else {
                println!("No active session to renew");
            }
        }
        Commands::Config(config_command) => run_config_command(config_command)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load release-matcher config")?;

    let tracer_provider = init_tracing(config.otlp_endpoint.as_deref(), &args.log_level)?;
    tracing::debug!("Configuration loaded: {:?}", config);

    let result = run(args.command, config).await;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("Failed to flush traces: {}", e);
        }
    }

    result
}
