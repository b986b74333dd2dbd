//! PhotonDB plugin inspection tool
//!
//! Loads plugin libraries with the same runtime the server uses and reports
//! what they contain.
//!
//! # Examples
//!
//! ```bash
//! # List the plugins and interfaces of a library
//! photon-plugin inspect target/debug/libgeometry.so
//!
//! # Same, as JSON
//! photon-plugin inspect target/debug/libgeometry.so --json
//!
//! # Create an instance and list what it exposes
//! photon-plugin instantiate target/debug/libgeometry.so geometry::Circle
//!
//! # Scan the configured search paths
//! PHOTON_PLUGIN_SEARCH_PATHS=/opt/plugins photon-plugin discover
//!
//! # Canonical form of an interface name
//! photon-plugin normalize "dyn ::geometry::Shape"
//! ```

use clap::{Parser, Subcommand};
use photon_plugin::plugin::{normalize, PluginRegistry};
use photon_plugin::PluginConfig;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// PhotonDB plugin inspection tool
#[derive(Parser, Debug)]
#[command(name = "photon-plugin")]
#[command(version = photon_plugin::VERSION)]
#[command(about = "Inspect PhotonDB plugin libraries", long_about = None)]
#[command(author = "Anton Feldmann <anton.feldmann@gmail.com>")]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "PHOTON_PLUGIN_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "PHOTON_PLUGIN_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the plugins and interfaces of a library
    Inspect {
        /// Path to the plugin library
        library: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create an instance of a plugin and list its interfaces
    Instantiate {
        /// Path to the plugin library
        library: PathBuf,
        /// Plugin name or alias
        plugin: String,
    },

    /// Load every library under the configured search paths
    Discover {
        /// Additional directory to scan
        #[arg(short, long)]
        path: Vec<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical form of interface names
    Normalize {
        /// Raw names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = PluginConfig::load(cli.config.as_deref())?;
    config.apply();

    // Setup logging
    setup_logging(&cli, &config)?;
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Inspect { library, json } => inspect_command(&config, library, json),
        Commands::Instantiate { library, plugin } => instantiate_command(&config, library, &plugin),
        Commands::Discover { path, json } => discover_command(config, path, json),
        Commands::Normalize { names } => {
            for name in names {
                println!("{}", normalize(&name));
            }
            Ok(())
        }
        Commands::Version => {
            println!("photon-plugin {}", photon_plugin::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with rolling files and console output
fn setup_logging(cli: &Cli, config: &PluginConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "photon-plugin.log");

    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.log_level)
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Inspect command - list the contents of one library
fn inspect_command(config: &PluginConfig, library: PathBuf, as_json: bool) -> anyhow::Result<()> {
    let loader = config.loader();
    let names = loader.load_library(&library)?;
    info!(library = %library.display(), plugins = names.len(), "Library inspected");

    print_plugins(loader.registry(), &names, as_json)
}

/// Instantiate command - create one plugin and list its live interfaces
fn instantiate_command(config: &PluginConfig, library: PathBuf, name: &str) -> anyhow::Result<()> {
    let loader = config.loader();
    loader.load_library(&library)?;

    let plugin = loader.registry().try_instantiate(name)?;
    println!("Instance of {} at {:p}", name, plugin.instance_address().unwrap_or(std::ptr::null()));
    for interface in plugin.interface_names() {
        let address = plugin
            .interface_by_name(interface)
            .map(|entry| entry.address())
            .unwrap_or(std::ptr::null());
        println!("  {:p}  {}", address, interface);
    }
    Ok(())
}

/// Discover command - load everything under the search paths
fn discover_command(mut config: PluginConfig, extra: Vec<PathBuf>, as_json: bool) -> anyhow::Result<()> {
    config.search_paths.extend(extra);
    if config.search_paths.is_empty() {
        anyhow::bail!("No search paths configured (use --path or PHOTON_PLUGIN_SEARCH_PATHS)");
    }

    let loader = config.loader();
    let names = loader.discover()?;
    info!(
        libraries = loader.loaded_libraries().len(),
        plugins = names.len(),
        "Discovery finished"
    );

    print_plugins(loader.registry(), &names, as_json)
}

fn print_plugins(registry: &PluginRegistry, names: &BTreeSet<String>, as_json: bool) -> anyhow::Result<()> {
    if !as_json {
        print!("{}", registry.pretty_str());
        return Ok(());
    }

    let plugins: Vec<_> = names
        .iter()
        .filter_map(|name| registry.get(name))
        .map(|info| {
            json!({
                "name": info.name(),
                "aliases": info.aliases(),
                "interfaces": info.interface_names(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json!({ "plugins": plugins }))?);
    Ok(())
}
