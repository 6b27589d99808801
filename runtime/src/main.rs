//! shell-expr CLI
//!
//! Evaluates one expression and prints the result, e.g.
//! `shell-expr --inherit-env 'build-$(uname -m)'`.

use anyhow::{Context, Result};
use clap::Parser;
use shell_expr::{evaluate_with, parse_environment, Config};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "shell-expr")]
#[command(about = "Evaluate a shell expression using only parameter expansion and command substitution")]
struct Args {
    /// Expression to evaluate, e.g. "prefix-$VAR"
    #[arg(value_name = "EXPRESSION")]
    expression: String,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start from the current process environment
    #[arg(long)]
    inherit_env: bool,

    /// Set a variable verbatim (repeatable)
    #[arg(short = 'e', long = "env", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    vars: Vec<(String, String)>,

    /// Assignment list evaluated before the expression, e.g. "A=1 B=$A-2"
    #[arg(long, value_name = "LIST")]
    environment: Option<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run(Args::parse()) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<String> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    config.inherit_env |= args.inherit_env;

    let executor = config.executor();
    let mut environment = config
        .build_environment(&executor)
        .context("building environment from config")?;
    environment.extend(args.vars);

    if let Some(list) = &args.environment {
        environment = parse_environment(list)?
            .as_environment(&environment, &executor)
            .context("evaluating --environment")?;
    }

    evaluate_with(&args.expression, &environment, &executor)
        .with_context(|| format!("evaluating {:?}", args.expression))
}
