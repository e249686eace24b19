use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "streetpress")]
#[command(version)]
#[command(about = "A server-rendered front-end for WordPress-backed publications.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the site.
    Serve {
        /// The source directory of the site.
        #[arg(default_value_t = String::from("."))]
        source: String,
        /// The listen port.
        #[arg(short, default_value_t = 3000)]
        port: u16,
        /// Open the site in the browser.
        #[arg(short, long)]
        open: bool,
    },
    /// Check the WordPress endpoints the site depends on.
    Check {
        /// The source directory of the site.
        #[arg(default_value_t = String::from("."))]
        source: String,
    },
    /// Render a single route into stdout, such as `/music?page=2`.
    Render {
        route: String,
        /// The source directory of the site.
        #[arg(default_value_t = String::from("."))]
        source: String,
    },
    /// Prints the version.
    Version,
}

/// The log filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "streetpress=info";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Serve { source, port, open } => {
            streetpress::run_serve(&source, port, open).await?;
        }
        Commands::Check { source } => {
            if !streetpress::run_check(&source).await? {
                std::process::exit(1);
            }
        }
        Commands::Render { route, source } => {
            let reply = streetpress::run_render(&route, &source).await?;
            eprintln!("{} {}", reply.status, reply.content_type);
            std::io::stdout().write_all(reply.body.as_bytes())?;
        }
        Commands::Version => {
            let version = option_env!("STREETPRESS_VERSION").unwrap_or("(Unknown Cargo package version)");
            let build_info = option_env!("BUILD_INFO").unwrap_or_default();
            println!("streetpress {version} {build_info}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter() {
        std::env::set_var("RUST_LOG", "streetpress=debug");
        assert_eq!(log_filter().to_string(), "streetpress=debug");

        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter().to_string(), DEFAULT_LOG_FILTER);
    }
}
