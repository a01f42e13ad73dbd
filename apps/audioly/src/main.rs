//! # Audioly Server
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! audioly --config audioly.toml server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! audioly status
//! audioly register ana "Ana" ana --private
//! audioly request ben ana
//! audioly accept ana ben
//! audioly users --as ben --query an
//! audioly profile ana --viewer ben
//! ```

use audioly::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // AUDIOLY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("AUDIOLY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "audioly=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
   ▄▀█ █ █ █▀▄ █ █▀█ █   █▄█
   █▀█ █▄█ █▄▀ █ █▄█ █▄▄  █

  Audioly v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
