//! npctl - Network Plugin Control
//!
//! Adds or removes network interfaces in a network namespace by invoking
//! the plugin declared in a named network configuration.
//!
//! # Usage
//!
//! ```bash
//! # Attach the "lan" network inside a namespace
//! CNI_PATH=/opt/plugins npctl add lan /var/run/netns/container1
//!
//! # Detach it again
//! CNI_PATH=/opt/plugins npctl del lan /var/run/netns/container1
//! ```
//!
//! Network declarations are read from `--config-dir`, the `NETCONFPATH`
//! environment variable, or `/etc/cni/net.d`, in that order of precedence.
//! Plugin binaries are located along the colon-separated `CNI_PATH`.

use clap::{Args as ClapArgs, Parser, Subcommand};
use libnetplug::validation;
use libnetplug::{
    load_network, NetplugError, NetplugResult, NetworkConfig, NetworkDriver, PluginDriver,
    RuntimeConf, DEFAULT_CONF_DIR,
};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

const ENV_CNI_PATH: &str = "CNI_PATH";
const ENV_NETCONF_DIR: &str = "NETCONFPATH";

/// Network Plugin Control
#[derive(Parser, Debug)]
#[command(name = "npctl")]
#[command(author = "netplug contributors")]
#[command(version)]
#[command(about = "Network Plugin Control - add or remove container network interfaces", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Network configuration directory (overrides NETCONFPATH)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach a network interface inside a namespace
    Add(InvokeOpts),
    /// Detach a network interface from a namespace
    Del(InvokeOpts),
}

#[derive(ClapArgs, Debug)]
struct InvokeOpts {
    /// Network configuration name
    network: String,

    /// Path to the target network namespace
    netns: String,

    /// Interface name to create inside the namespace
    #[arg(long, default_value = "eth0")]
    ifname: String,

    /// Container identifier handed to the plugin
    #[arg(long, default_value = "cni")]
    container_id: String,

    /// Extra KEY=VALUE pair forwarded via CNI_ARGS (repeatable)
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(&cli);

    #[cfg(target_os = "linux")]
    {
        let uid = unsafe { libc::getuid() };
        if uid != 0 {
            warn!("Not running as root - plugins that configure namespaces may fail");
        }
    }

    if let Err(e) = run(cli).await {
        eprintln!("{}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> NetplugResult<()> {
    let conf_dir = cli
        .config_dir
        .clone()
        .or_else(|| env::var_os(ENV_NETCONF_DIR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONF_DIR));

    let search_path = plugin_search_path();
    if search_path.is_empty() {
        warn!("{} is not set - no plugin directories to search", ENV_CNI_PATH);
    }

    match cli.command {
        Command::Add(opts) => {
            let (net, rt) = prepare(&conf_dir, &opts).await?;
            let driver = PluginDriver::new(search_path);
            let result = driver.add_network(&net, &rt).await?;
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    warn!("Failed to render result as JSON: {}", e);
                    println!("{:?}", result);
                }
            }
        }
        Command::Del(opts) => {
            let (net, rt) = prepare(&conf_dir, &opts).await?;
            let driver = PluginDriver::new(search_path);
            driver.del_network(&net, &rt).await?;
        }
    }

    Ok(())
}

/// Validate the request and resolve the network declaration.
async fn prepare(conf_dir: &Path, opts: &InvokeOpts) -> NetplugResult<(NetworkConfig, RuntimeConf)> {
    validation::validate_network_name(&opts.network)?;
    validation::validate_interface_name(&opts.ifname)?;
    validation::validate_container_id(&opts.container_id)?;

    let net = load_network(conf_dir, &opts.network).await?;
    let rt = RuntimeConf {
        container_id: opts.container_id.clone(),
        netns: opts.netns.clone(),
        ifname: opts.ifname.clone(),
        args: parse_kv_args(&opts.args)?,
    };
    Ok((net, rt))
}

fn plugin_search_path() -> Vec<PathBuf> {
    env::var(ENV_CNI_PATH)
        .map(|raw| {
            raw.split(':')
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_kv_args(raw: &[String]) -> NetplugResult<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| {
                    NetplugError::InvalidParameter(format!("argument '{}' is not KEY=VALUE", pair))
                })
        })
        .collect()
}

/// Initialize logging based on command-line arguments.
///
/// Logs go to stderr; stdout is reserved for the add result payload.
fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose { "debug" } else { &cli.log_level };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("npctl={},libnetplug={}", log_level, log_level))
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}
