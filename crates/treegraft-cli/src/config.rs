//! Command-line arguments.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use treegraft_core::{CollectConfig, StorageConfig};

/// Default data directory.
pub const DEFAULT_DATA_PATH: &str = "./treegraft_data";

/// Default catalog file.
pub const DEFAULT_CATALOG_PATH: &str = "./catalog.json";

/// Treegraft command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "treegraft")]
#[command(version, about = "Clone, import and export record trees", long_about = None)]
pub struct Args {
    /// Path to the sled data directory.
    #[arg(short, long, global = true, default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Path to the JSON type catalog.
    #[arg(short, long, global = true, default_value = DEFAULT_CATALOG_PATH)]
    pub catalog: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone the tree reachable from a record.
    CloneTree {
        /// Type of the seed record.
        type_name: String,

        /// Identity of the seed record.
        identity: u64,

        /// Types to leave out of the tree (referenced, not copied).
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,

        /// Re-collect after cloning and reject cross-linked clones.
        #[arg(long)]
        safe: bool,

        /// Maximum relation distance from the seed.
        #[arg(long, requires = "safe")]
        max_depth: Option<usize>,

        /// Run everything but do not commit.
        #[arg(long)]
        dry_run: bool,
    },

    /// Import a JSON dataset.
    ImportTree {
        /// Dataset file.
        file: PathBuf,

        /// Reuse existing records, as TYPE:field[,field...].
        #[arg(short = 'r', long = "reuse")]
        reuse: Vec<AutoFind>,

        /// Run everything but do not commit.
        #[arg(long)]
        dry_run: bool,

        /// Do not print the summary.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Export the tree reachable from a record as JSON.
    ExportTree {
        /// Type of the seed record.
        type_name: String,

        /// Identity of the seed record.
        identity: u64,

        /// Types to leave out of the tree.
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,

        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// An auto-find lookup given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoFind {
    /// Type whose records may be reused.
    pub type_name: String,
    /// Lookup fields, in order.
    pub fields: Vec<String>,
}

impl FromStr for AutoFind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_name, fields) = s
            .split_once(':')
            .ok_or_else(|| format!("expected TYPE:field[,field...], got '{s}'"))?;
        let fields: Vec<String> = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();
        if type_name.trim().is_empty() || fields.is_empty() {
            return Err(format!("expected TYPE:field[,field...], got '{s}'"));
        }
        Ok(Self {
            type_name: type_name.trim().to_string(),
            fields,
        })
    }
}

impl Args {
    /// Storage configuration for the data directory.
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig::new(&self.data)
    }
}

/// Collector configuration from the exclude list and optional depth.
pub fn collect_config(exclude: &[String], max_depth: Option<usize>) -> CollectConfig {
    let config = CollectConfig::new().with_excludes(exclude.iter().cloned());
    match max_depth {
        Some(depth) => config.with_max_depth(depth),
        None => config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_tree_args() {
        let args = Args::try_parse_from([
            "treegraft",
            "--data",
            "/tmp/tg",
            "clone-tree",
            "Meeting",
            "1",
            "-e",
            "User",
            "-e",
            "Organisation",
            "--safe",
            "--max-depth",
            "3",
        ])
        .unwrap();

        assert_eq!(args.data, PathBuf::from("/tmp/tg"));
        assert_eq!(args.catalog, PathBuf::from(DEFAULT_CATALOG_PATH));
        match args.command {
            Command::CloneTree {
                type_name,
                identity,
                exclude,
                safe,
                max_depth,
                dry_run,
            } => {
                assert_eq!(type_name, "Meeting");
                assert_eq!(identity, 1);
                assert_eq!(exclude, vec!["User", "Organisation"]);
                assert!(safe);
                assert_eq!(max_depth, Some(3));
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_max_depth_requires_safe() {
        let result =
            Args::try_parse_from(["treegraft", "clone-tree", "Meeting", "1", "--max-depth", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_import_tree_reuse_lookups() {
        let args = Args::try_parse_from([
            "treegraft",
            "import-tree",
            "dump.json",
            "-r",
            "Organisation:name,slug",
            "--dry-run",
        ])
        .unwrap();

        match args.command {
            Command::ImportTree {
                file,
                reuse,
                dry_run,
                quiet,
            } => {
                assert_eq!(file, PathBuf::from("dump.json"));
                assert_eq!(
                    reuse,
                    vec![AutoFind {
                        type_name: "Organisation".into(),
                        fields: vec!["name".into(), "slug".into()],
                    }]
                );
                assert!(dry_run);
                assert!(!quiet);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_reuse_lookup() {
        assert!("Organisation".parse::<AutoFind>().is_err());
        assert!("Organisation:".parse::<AutoFind>().is_err());
        assert!(":name".parse::<AutoFind>().is_err());
    }

    #[test]
    fn test_collect_config() {
        let config = collect_config(&["User".to_string()], Some(2));
        assert!(config.is_excluded("User"));
        assert_eq!(config.max_depth, Some(2));
        assert_eq!(collect_config(&[], None).max_depth, None);
    }
}
