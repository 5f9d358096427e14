//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_NAME;
use crate::worker::server::DEFAULT_PREAMBLE;

/// TikZ pictures as self-describing SVG images
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: tikzsvg.toml)
    #[arg(short = 'C', long, global = true, default_value = DEFAULT_CONFIG_NAME, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print worker lifecycle and timing details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new image and reference it from a document
    #[command(visible_alias = "n")]
    New {
        /// Document file that receives the image reference
        #[arg(value_hint = clap::ValueHint::FilePath)]
        location: PathBuf,

        /// Initial TikZ source (default: empty)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        source: Option<PathBuf>,

        /// Compile the initial source right away
        #[arg(short, long)]
        compile: bool,
    },

    /// Compile a TikZ source (or an existing image) into an SVG
    #[command(visible_alias = "c")]
    Compile {
        /// `.tex` source, or an `.svg` image to recompile from its embedded source
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Output image (default: FILE with `.svg` extension)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Edit a stored image in $EDITOR and recompile it
    #[command(visible_alias = "e")]
    Edit {
        /// Asset identity, e.g. `assets/tikz-image-1a2b3c4d5e6f.svg`
        asset: String,
    },

    /// Print the TikZ source embedded in an image
    #[command(visible_alias = "x")]
    Extract {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Serve compile requests on stdin/stdout
    #[command(hide = true)]
    Worker {
        #[arg(long, default_value = "latex")]
        latex: PathBuf,

        #[arg(long, default_value = "dvisvgm")]
        dvisvgm: PathBuf,

        #[arg(long, default_value = DEFAULT_PREAMBLE)]
        preamble: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_new() {
        let cli = Cli::parse_from(["tikzsvg", "new", "notes.md", "-s", "fig.tex", "--compile"]);
        match cli.command {
            Commands::New {
                location,
                source,
                compile,
            } => {
                assert_eq!(location, PathBuf::from("notes.md"));
                assert_eq!(source, Some(PathBuf::from("fig.tex")));
                assert!(compile);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_NAME));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tikzsvg", "extract", "a.svg", "-v", "-C", "other.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
    }

    #[test]
    fn test_worker_defaults() {
        let cli = Cli::parse_from(["tikzsvg", "worker"]);
        match cli.command {
            Commands::Worker {
                latex, preamble, ..
            } => {
                assert_eq!(latex, PathBuf::from("latex"));
                assert_eq!(preamble, DEFAULT_PREAMBLE);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
