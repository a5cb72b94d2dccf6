//! AssetForge CLI
//!
//! Commands: filters, paths, build
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on build failure

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use assetforge_core::{
    Asset, BuildKind, BuildManifest, FilterRegistry, LocalFilesystem, PipelineConfig,
};

#[derive(Parser)]
#[command(name = "assetforge-cli")]
#[command(about = "AssetForge CLI - Asset Pipeline Engine")]
struct Cli {
    /// Verbose logging. Repeat for more (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered filters and aliases
    Filters {
        /// Pipeline config file whose aliases are included
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show resolved paths for every configured asset
    Paths {
        /// Pipeline config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Build every non-excluded asset
    Build {
        /// Pipeline config file
        #[arg(short, long)]
        config: PathBuf,

        /// Production build
        #[arg(long)]
        production: bool,

        /// Write built content to <output>/<fingerprinted path>
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Filters { config } => {
            let registry = match config {
                Some(path) => match PipelineConfig::load(&path) {
                    Ok(config) => config.registry(),
                    Err(e) => return fail(&e.to_string(), ExitCode::FAILURE),
                },
                None => FilterRegistry::with_defaults(),
            };
            let output = serde_json::json!({
                "filters": registry.names(),
                "aliases": registry.aliases(),
            });
            print_json(&output);
            ExitCode::SUCCESS
        }

        Commands::Paths { config } => {
            let assets = match load_assets(&config) {
                Ok(assets) => assets,
                Err(code) => return code,
            };

            let paths: Vec<_> = assets
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "relativePath": a.relative_path(),
                        "absolutePath": a.absolute_path(),
                        "usablePath": a.usable_path(),
                        "fingerprintedPath": a.fingerprinted_path(),
                        "group": a.effective_group(),
                        "order": a.order(),
                        "excluded": a.is_excluded(),
                        "raw": a.is_raw(),
                        "remote": a.is_remote(),
                    })
                })
                .collect();
            print_json(&paths);
            ExitCode::SUCCESS
        }

        Commands::Build {
            config,
            production,
            output,
        } => {
            let kind = if production {
                BuildKind::Production
            } else {
                BuildKind::Development
            };
            build(&config, kind, output.as_deref())
        }
    }
}

fn build(config: &Path, kind: BuildKind, output: Option<&Path>) -> ExitCode {
    let config = match PipelineConfig::load(config) {
        Ok(c) => c,
        Err(e) => return fail(&e.to_string(), ExitCode::FAILURE),
    };

    let registry = Arc::new(config.registry());
    let mut assets = match config.assets(Arc::new(LocalFilesystem::new()), registry) {
        Ok(assets) => assets,
        Err(e) => return fail(&e.to_string(), ExitCode::FAILURE),
    };
    // Stable: equal orders keep config order
    assets.sort_by_key(Asset::order);

    let mut manifest = BuildManifest::new(config.environment.clone(), kind);

    for asset in assets.iter_mut().filter(|a| !a.is_excluded()) {
        let content = match asset.build_for(kind) {
            Ok(content) => content,
            Err(e) => return fail(&e.to_string(), ExitCode::from(2)),
        };

        if let Some(dir) = output {
            let target = dir.join(asset.fingerprinted_path());
            let written = target
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::write(&target, &content));
            if let Err(e) = written {
                let message = format!("Failed to write {}: {}", target.display(), e);
                return fail(&message, ExitCode::FAILURE);
            }
            tracing::info!(path = %target.display(), "wrote asset");
        }

        manifest.push(asset);
    }

    if let Err(e) = manifest.seal() {
        return fail(&e.to_string(), ExitCode::FAILURE);
    }

    print_json(&serde_json::json!({
        "success": true,
        "manifest": manifest,
    }));
    ExitCode::SUCCESS
}

fn load_assets(config: &Path) -> Result<Vec<Asset>, ExitCode> {
    PipelineConfig::load(config)
        .and_then(|c| c.assets(Arc::new(LocalFilesystem::new()), Arc::new(c.registry())))
        .map_err(|e| fail(&e.to_string(), ExitCode::FAILURE))
}

fn fail(message: &str, code: ExitCode) -> ExitCode {
    tracing::error!("{message}");
    print_json(&serde_json::json!({
        "success": false,
        "error": message,
    }));
    code
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("failed to serialise output: {e}"),
    }
}
