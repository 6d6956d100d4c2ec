//! brieflow-ai - Creative brief analysis service
//!
//! **Modes:**
//! - `analyze`: run one request from the command line and print the document
//! - `serve`: HTTP intake (`POST /analyze`, `GET /health`)
//!
//! Configuration resolves CLI `--config` → `BRIEFLOW_CONFIG` →
//! `~/.config/brieflow/brieflow-ai.toml` → built-in defaults.

use anyhow::{Context, Result};
use brieflow_common::events::EventBus;
use brieflow_common::time::system_clock;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use brieflow_ai::config::TomlConfig;
use brieflow_ai::pipeline::{AnalysisOptions, AnalysisPipeline, AnalysisRequest};
use brieflow_ai::provider::build_chain;
use brieflow_ai::types::{MediaAsset, MediaKind, OutputType};
use brieflow_ai::AppState;

#[derive(Debug, Parser)]
#[command(name = "brieflow-ai", version, about = "Creative brief analysis pipeline")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one request and print the final document as JSON
    Analyze {
        /// Free-text creative request
        #[arg(long)]
        query: String,

        /// Asset as kind=locator[|description]; repeatable
        #[arg(long = "asset", value_parser = parse_asset_arg)]
        assets: Vec<AssetArg>,

        /// Output medium chosen explicitly (image, video, audio, mixed)
        #[arg(long, value_parser = parse_output_type)]
        output_type: Option<OutputType>,

        /// Request id; identical ids give identical analysis ids
        #[arg(long)]
        request_id: Option<String>,

        /// Write the document here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run the HTTP service
    Serve {
        /// Overrides server.host
        #[arg(long)]
        host: Option<String>,

        /// Overrides server.port
        #[arg(long)]
        port: Option<u16>,
    },
}

/// `--asset` value before ids are assigned
#[derive(Debug, Clone)]
struct AssetArg {
    kind: MediaKind,
    locator: String,
    description: Option<String>,
}

/// Parse `kind=locator[|description]`
///
/// Only the first `=` separates the kind, so query strings survive in the
/// locator. `|` is not a valid unescaped URL character.
fn parse_asset_arg(value: &str) -> Result<AssetArg, String> {
    let (kind, rest) = value
        .split_once('=')
        .ok_or_else(|| "expected kind=locator[|description]".to_string())?;
    let kind = MediaKind::parse(kind)
        .ok_or_else(|| format!("unknown asset kind '{}' (image, video, audio, text)", kind))?;
    let (locator, description) = match rest.split_once('|') {
        Some((locator, description)) => (locator, Some(description)),
        None => (rest, None),
    };
    let locator = Some(locator.trim())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| "expected kind=locator[|description]".to_string())?;
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    Ok(AssetArg {
        kind,
        locator: locator.to_string(),
        description: description.map(String::from),
    })
}

fn parse_output_type(value: &str) -> Result<OutputType, String> {
    OutputType::parse(value).ok_or_else(|| format!("unknown output type '{}'", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TomlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    brieflow_common::logging::init_tracing(&config.logging)?;

    info!("Starting brieflow-ai");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let chain = build_chain(&config.providers).context("Failed to build provider chain")?;
    if chain.is_empty() {
        tracing::warn!("No reasoning providers configured; every analysis will fail");
    }
    let pipeline = AnalysisPipeline::new(chain, config.pipeline.clone(), system_clock());

    match cli.command {
        Command::Analyze {
            query,
            assets,
            output_type,
            request_id,
            output,
        } => {
            let assets = assets
                .into_iter()
                .enumerate()
                .map(|(i, arg)| {
                    let asset = MediaAsset::new(format!("asset-{}", i + 1), arg.kind, arg.locator);
                    match arg.description {
                        Some(d) => asset.with_description(d),
                        None => asset,
                    }
                })
                .collect();

            let mut request = AnalysisRequest::new(query, assets).with_options(AnalysisOptions {
                selected_output_type: output_type,
                ..Default::default()
            });
            if let Some(id) = request_id {
                request = request.with_request_id(id);
            }

            let document = pipeline.run(request).await?;
            let json = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Wrote analysis document");
                }
                None => println!("{}", json),
            }
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let event_bus = EventBus::new(256);
            let state = AppState::new(pipeline, event_bus);
            let app = brieflow_ai::build_router(state);

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_asset_arg() {
        let arg = parse_asset_arg("video=/clips/a.mp4|launch footage").unwrap();
        assert_eq!(arg.kind, MediaKind::Video);
        assert_eq!(arg.locator, "/clips/a.mp4");
        assert_eq!(arg.description.as_deref(), Some("launch footage"));

        let arg = parse_asset_arg("image=/a.png").unwrap();
        assert!(arg.description.is_none());

        assert!(parse_asset_arg("sculpture=/a.obj").is_err());
        assert!(parse_asset_arg("image=").is_err());
        assert!(parse_asset_arg("image").is_err());
    }

    #[test]
    fn test_parse_asset_arg_keeps_query_string() {
        let arg = parse_asset_arg("video=https://cdn.example.com/x.mp4?sig=abc&exp=1").unwrap();
        assert_eq!(arg.locator, "https://cdn.example.com/x.mp4?sig=abc&exp=1");
        assert!(arg.description.is_none());

        let arg = parse_asset_arg("image=https://cdn.example.com/a.png?v=2|hero shot").unwrap();
        assert_eq!(arg.locator, "https://cdn.example.com/a.png?v=2");
        assert_eq!(arg.description.as_deref(), Some("hero shot"));
    }
}
