//! Command execution.

use anyhow::{anyhow, Context, Result};
use weft_syntax::sample::{self, SampleGrammar};
use weft_syntax::{ascii_tree, sexpr, Engine, ProductionId};

use crate::cli::{Command, Format, InputArgs};
use crate::config::Settings;

const DEFAULT_ENTRY: &str = "Script";

/// Text to print and whether the command succeeded.
#[derive(Debug)]
pub struct Outcome {
    pub output: String,
    pub success: bool,
}

impl Outcome {
    fn ok(output: String) -> Self {
        Self { output, success: true }
    }

    fn failed(output: String) -> Self {
        Self { output, success: false }
    }
}

pub fn run(command: &Command, settings: &Settings) -> Result<Outcome> {
    let sample = sample::arithmetic().context("building the sample grammar")?;
    let engine = Engine::with_options(&sample.grammar, settings.options.clone());
    match command {
        Command::Parse { input, format, positions } => {
            let (production, source) = resolve(&sample, settings, input)?;
            let parse = engine.parse(production, &source)?;
            let Some(tree) = parse.tree() else {
                return Ok(Outcome::failed(report(parse.error())));
            };
            let rendered = match format {
                Format::Sexpr => format!("{}\n", sexpr(&sample.grammar, tree)),
                Format::Tree => ascii_tree(&sample.grammar, tree, *positions),
            };
            Ok(Outcome::ok(rendered))
        }
        Command::Unparse { input } => {
            let (production, source) = resolve(&sample, settings, input)?;
            let parse = engine.parse(production, &source)?;
            let Some(tree) = parse.tree() else {
                return Ok(Outcome::failed(report(parse.error())));
            };
            let unparsed = engine.unparse(tree)?;
            Ok(Outcome::ok(format!("{}\n", unparsed.text())))
        }
        Command::Check { input } => {
            let (production, source) = resolve(&sample, settings, input)?;
            let parse = engine.parse(production, &source)?;
            if parse.ok() {
                let stats = parse.stats();
                Ok(Outcome::ok(format!(
                    "ok ({} left-recursive frame(s), {} growth step(s))\n",
                    stats.lr_frames, stats.lr_growths
                )))
            } else {
                Ok(Outcome::failed(report(parse.error())))
            }
        }
    }
}

fn report(error: Option<&weft_syntax::ParseError>) -> String {
    match error {
        Some(error) => format!("error: {error}\n"),
        None => "error: input does not parse\n".to_string(),
    }
}

fn resolve(sample: &SampleGrammar, settings: &Settings, input: &InputArgs) -> Result<(ProductionId, String)> {
    let name = input
        .production
        .as_deref()
        .or(settings.entry.as_deref())
        .unwrap_or(DEFAULT_ENTRY);
    let production = sample
        .grammar
        .production_named(name)
        .ok_or_else(|| anyhow!("unknown production `{name}`"))?;
    let source = match (&input.expr, &input.file) {
        (Some(expr), _) => expr.clone(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => return Err(anyhow!("no input given")),
    };
    Ok((production, source))
}
