//! # Audioly CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store metrics
//! - `init` - Initialize a new database
//! - `register` - Create a profile for a user id
//! - `request` - Send a friend request
//! - `accept` - Accept a friend request
//! - `decline` - Decline or cancel a friend request
//! - `users` - List the user directory
//! - `profile` - Show a profile as seen by a viewer

mod commands;

use crate::config::{Backend, Config};
use audioly_core::SocialError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Audioly - social graph and song sharing server
#[derive(Parser, Debug)]
#[command(name = "audioly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides the configuration)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show store metrics
    Status,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Create the profile record for a verified identity
    Register {
        /// User id issued by the identity provider
        id: String,

        /// Display name
        name: String,

        /// Unique username
        username: String,

        /// Start as a private account
        #[arg(long)]
        private: bool,
    },

    /// Send a friend request
    Request {
        /// Requesting user id
        from: String,

        /// Target user id
        to: String,
    },

    /// Accept the friend request `requester` sent to `user`
    Accept {
        user: String,
        requester: String,
    },

    /// Decline an incoming request or cancel an outgoing one
    Decline {
        user: String,
        other: String,
    },

    /// List the user directory
    Users {
        /// Caller user id (anonymous if omitted)
        #[arg(long = "as")]
        caller: Option<String>,

        /// Case-insensitive name or username filter
        #[arg(short = 'Q', long)]
        query: Option<String>,
    },

    /// Show a profile as seen by a viewer
    Profile {
        /// Profile owner
        target: String,

        /// Viewer user id (anonymous if omitted)
        #[arg(long)]
        viewer: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Defaults, then the config file and environment, then global flags.
pub fn resolve_config(cli: &Cli) -> Result<Config, SocialError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SocialError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::info!(database = %config.database.display(), backend = %config.backend, "Configuration resolved");
    }

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Register {
            id,
            name,
            username,
            private,
        }) => cmd_register(&config, json_mode, &id, &name, &username, private),
        Some(Commands::Request { from, to }) => cmd_request(&config, json_mode, &from, &to),
        Some(Commands::Accept { user, requester }) => {
            cmd_accept(&config, json_mode, &user, &requester)
        }
        Some(Commands::Decline { user, other }) => cmd_decline(&config, json_mode, &user, &other),
        Some(Commands::Users { caller, query }) => {
            cmd_users(&config, json_mode, caller.as_deref(), query.as_deref())
        }
        Some(Commands::Profile { target, viewer }) => {
            cmd_profile(&config, json_mode, &target, viewer.as_deref())
        }
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode)
        }
    }
}
