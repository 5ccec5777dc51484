use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use autoreview_rs::{config_from_path, ring, Config, HashRing};

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the owner union for every file under the given paths.
    Owners {
        paths: Vec<PathBuf>,

        #[clap(short = 'f', long = "file")]
        owners_file: Option<PathBuf>,
    },
    /// Show which nodes a change key deterministically selects.
    Pick {
        #[arg(long)]
        key: String,

        #[arg(long, default_value_t = 2)]
        count: usize,

        nodes: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Owners { paths, owners_file } => owners(paths, owners_file),
        Command::Pick { key, count, nodes } => pick(&key, count, nodes),
    }
}

fn owners(paths: Vec<PathBuf>, owners_file: Option<PathBuf>) -> Result<()> {
    let owners_path = owners_file.unwrap_or_else(|| PathBuf::from("./CODEOWNERS"));
    let config = config_from_path(&owners_path)?;

    let root_paths = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    };

    for root_path in root_paths {
        if !root_path.exists() {
            eprintln!("error: path does not exist: {}", root_path.display());
            continue;
        }

        if root_path.is_dir() {
            for entry in walk_files(&root_path) {
                let path = entry.path().strip_prefix(".").unwrap_or(entry.path());
                print_owners(&config, &path.to_string_lossy());
            }
        } else {
            print_owners(&config, &root_path.to_string_lossy());
        }
    }

    Ok(())
}

fn print_owners(config: &Config, path: &str) {
    let mut owners: Vec<String> = config
        .owners_for(path)
        .iter()
        .map(|owner| owner.to_string())
        .collect();

    if owners.is_empty() {
        println!("{:<70}  (unowned)", path);
    } else {
        owners.sort();
        println!("{:<70}  {}", path, owners.join(" "));
    }
}

fn pick(key: &str, count: usize, nodes: Vec<String>) -> Result<()> {
    let ring = HashRing::from_elements(ring::md5_hex, nodes);
    for node in ring.get_nodes(key, count) {
        println!("{node}");
    }
    Ok(())
}

fn walk_files(root: impl AsRef<Path>) -> impl Iterator<Item = walkdir::DirEntry> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter(|entry| !entry.path().starts_with("./.git"))
}
