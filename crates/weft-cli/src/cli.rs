//! CLI definitions for weft.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "weft",
    version,
    about = "Parse, unparse, and check text with the weft sample grammar",
    after_help = "Examples:\n  weft parse --expr \"1 + 2 * 3\"\n  weft parse script.wf --format tree\n  weft unparse --expr \"f( a ,b ) ;\"\n  weft check --production Expr --expr \"1 +\""
)]
pub struct Cli {
    /// Enable non-standard productions (templates, fragments).
    #[arg(long, global = true)]
    pub non_standard: bool,
    /// Directory to search for weft.toml (defaults to the current directory).
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse input and print the tree.
    Parse {
        #[command(flatten)]
        input: InputArgs,
        /// Tree rendering.
        #[arg(long, value_enum, default_value_t = Format::Sexpr)]
        format: Format,
        /// Show source ranges in tree output.
        #[arg(long)]
        positions: bool,
    },
    /// Parse input, then print it back with minimal spacing.
    Unparse {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Report whether input parses; exits non-zero if it does not.
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Debug, clap::Args)]
pub struct InputArgs {
    /// Source file to read.
    #[arg(conflicts_with = "expr", required_unless_present = "expr")]
    pub file: Option<PathBuf>,
    /// Inline source text.
    #[arg(long, short)]
    pub expr: Option<String>,
    /// Production to parse as (defaults to the configured entry, then Script).
    #[arg(long, short)]
    pub production: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One-line s-expression.
    Sexpr,
    /// Indented tree.
    Tree,
}
