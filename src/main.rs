use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use clap::Parser;
use serde::{Serialize, de::DeserializeOwned};
use wg_peers::{Error, Filter, PeerMap, WgConfig, filter_peers, merge_peers};

#[derive(Debug, clap::Parser)]
#[command(version, about = "Parse, merge and prune WireGuard peer sets")]
pub struct Args {
    /// More log output, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Fail when the parser had to skip anything in the input
    #[arg(long, global = true)]
    strict: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Parse a config into its interface and peers
    ParseConfig {
        /// Config file, stdin when absent or `-`
        file: Option<PathBuf>,
    },

    /// Parse a config, peers only
    ParsePeers { file: Option<PathBuf> },

    /// Merge two JSON peer sets, INCOMING wins on name clashes
    MergePeers { existing: PathBuf, incoming: PathBuf },

    /// Keep only peers named in the inventory
    FilterPeers {
        peers: PathBuf,

        /// Inventory host name, may be repeated
        #[arg(long = "host")]
        hosts: Vec<String>,

        /// JSON array of inventory host names
        #[arg(long)]
        inventory: Option<PathBuf>,
    },

    /// Invoke a filter by its registered name with JSON arguments
    Call { filter: String, args: Vec<String> },

    /// List registered filter names
    List,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_logger(args.verbose);

    match &args.command {
        Command::ParseConfig { file } => {
            let config = load_wg_config(file.as_deref(), args.strict)?;
            print_json(&config, args.pretty)?;
        }

        Command::ParsePeers { file } => {
            let config = load_wg_config(file.as_deref(), args.strict)?;
            print_json(&config.peers, args.pretty)?;
        }

        Command::MergePeers { existing, incoming } => {
            let existing: Option<PeerMap> = read_json(existing)?;
            let incoming: Option<PeerMap> = read_json(incoming)?;
            print_json(
                &merge_peers(existing.as_ref(), incoming.as_ref()),
                args.pretty,
            )?;
        }

        Command::FilterPeers {
            peers,
            hosts,
            inventory,
        } => {
            let peers: Option<PeerMap> = read_json(peers)?;

            let mut allowed = hosts.clone();
            if let Some(path) = inventory {
                let names: Option<Vec<String>> = read_json(path)?;
                allowed.extend(names.unwrap_or_default());
            }

            log::info!("filtering against {} inventory name(s)", allowed.len());
            print_json(
                &filter_peers(peers.as_ref(), Some(allowed.as_slice())),
                args.pretty,
            )?;
        }

        Command::Call { filter, args: raw } => {
            let filter: Filter = filter.parse()?;
            let values = raw
                .iter()
                .map(|arg| serde_json::from_str(arg))
                .collect::<Result<Vec<serde_json::Value>, _>>()?;

            log::info!("calling {filter} with {} argument(s)", values.len());
            print_json(&filter.apply(&values)?, args.pretty)?;
        }

        Command::List => {
            for filter in Filter::ALL {
                println!("{filter}");
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_wg_config(path: Option<&Path>, strict: bool) -> Result<WgConfig, Error> {
    let data = read_input(path)?;
    let (config, diagnostics) = WgConfig::parse_with_diagnostics(&data);

    for diagnostic in &diagnostics {
        if strict {
            log::warn!("{diagnostic}");
        } else {
            log::debug!("{diagnostic}");
        }
    }

    if strict && !diagnostics.is_empty() {
        return Err(Error::Strict(diagnostics.len()));
    }

    log::info!("parsed {} peer(s)", config.peers.len());

    Ok(config)
}

fn read_input(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path),
        _ => {
            let mut data = String::new();
            io::stdin().read_to_string(&mut data)?;
            Ok(data)
        }
    }
}

/// `null` and empty files read as `None`.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
    let data = fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(None);
    }

    Ok(serde_json::from_str(&data)?)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), Error> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    println!("{out}");
    Ok(())
}
