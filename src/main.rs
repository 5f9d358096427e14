//! tikzsvg - TikZ pictures as self-describing SVG images.

mod artifact;
mod cli;
mod config;
mod logger;
mod pipeline;
mod session;
mod utils;
mod worker;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;
use utils::path::{resolve_output, resolve_path};
use worker::server::TexEngine;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let command = match cli.command {
        // The worker speaks on stdout and needs neither config nor runtime.
        Commands::Worker {
            latex,
            dvisvgm,
            preamble,
        } => {
            let engine = TexEngine {
                latex,
                dvisvgm,
                preamble,
            };
            return worker::server::run(&engine);
        }
        command => command,
    };

    let config = Config::load(&cli.config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(run(command, &config));
    logger::status_detach();
    result
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::New {
            location,
            source,
            compile,
        } => {
            let location = resolve_output(&location, config.root());
            let source = source.map(|source| resolve_path(&source, config.root()));
            cli::image::new_image(config, &location, source.as_deref(), compile).await
        }
        Commands::Compile { file, output } => {
            let file = resolve_path(&file, config.root());
            let output = output.map(|output| resolve_output(&output, config.root()));
            cli::compile::compile_file(config, &file, output.as_deref()).await
        }
        Commands::Edit { asset } => cli::image::edit_image(config, &asset).await,
        Commands::Extract { file } => cli::extract::extract_source(&resolve_path(&file, config.root())),
        Commands::Worker { .. } => unreachable!("handled before the runtime starts"),
    }
}
