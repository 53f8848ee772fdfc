//! `ralf` command-line entry point.

use std::path::PathBuf;

use anyhow::anyhow;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use console::style;

use ralf::core::types::ToolVariant;
use ralf::error::RunError;
use ralf::exit_codes;
use ralf::io::config::{CliOverrides, ResolvedConfig, load_config};
use ralf::io::init::{InitOptions, RunPaths, init_run_dir};
use ralf::io::process::CaptureSettings;
use ralf::io::prompt::TemplateEngine;
use ralf::io::run_pointer::FilePointerStore;
use ralf::io::tool::AgentTool;
use ralf::logging;
use ralf::looping::LoopConfig;
use ralf::run::execute_run;
use ralf::ui::Reporter;

#[derive(Parser, Debug)]
#[command(
    name = "ralf",
    version,
    about = "Rerun a coding agent against prd.json until it reports completion",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent loop (default).
    Run(RunArgs),
    /// Scaffold prd.json, guidance files and ralf.toml in the run directory.
    Init(InitArgs),
    /// Print the guidance text piped to a tool.
    Prompt {
        /// Tool variant: amp or claude.
        tool: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Agent CLI to drive: amp or claude.
    #[arg(long)]
    tool: Option<String>,

    /// Run directory holding prd.json and the guidance files.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Iteration budget. Non-positive or non-numeric values are ignored.
    #[arg(value_name = "MAX_ITERATIONS", allow_negative_numbers = true)]
    max_iterations: Vec<String>,
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Overwrite existing files.
    #[arg(short, long)]
    force: bool,

    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Project name for a new prd.json.
    #[arg(long)]
    project: Option<String>,

    /// Branch name for a new prd.json.
    #[arg(long)]
    branch: Option<String>,
}

fn main() {
    logging::init();

    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!(
                "{} {err}",
                style(format!("error[{}]:", err.label()))
                    .for_stderr()
                    .red()
                    .bold()
            );
            exit_codes::FATAL
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32, RunError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                let _ = err.print();
                return Ok(exit_codes::OK);
            }
            _ => return Err(RunError::Configuration(anyhow!(clap_message(&err)))),
        },
    };

    match cli.command {
        None => cmd_run(&cli.run),
        Some(Command::Run(args)) => cmd_run(&args),
        Some(Command::Init(args)) => cmd_init(&args),
        Some(Command::Prompt { tool }) => cmd_prompt(&tool),
    }
}

fn cmd_run(args: &RunArgs) -> Result<i32, RunError> {
    let file = load_config(&RunPaths::new(&args.dir).config_path)
        .map_err(RunError::Configuration)?;
    let overrides = CliOverrides {
        tool: args.tool.as_deref(),
        max_iterations: &args.max_iterations,
    };
    let resolved = ResolvedConfig::resolve(args.dir.clone(), &file, &overrides)
        .map_err(RunError::Configuration)?;
    let paths = RunPaths::new(&resolved.run_dir);

    let tool = AgentTool::new(
        resolved.tool,
        CaptureSettings {
            output_limit_bytes: resolved.output_limit_bytes,
            timeout: resolved.agent_timeout,
        },
    );
    let pointer = FilePointerStore::new(&paths.pointer_path);
    let mut reporter = Reporter::stdout();

    let outcome = execute_run(
        &paths,
        &tool,
        &pointer,
        &LoopConfig::new(resolved.max_iterations),
        |event| reporter.handle(event),
    )?;
    Ok(outcome.stop.exit_code())
}

fn cmd_init(args: &InitArgs) -> Result<i32, RunError> {
    let defaults = InitOptions::default();
    let options = InitOptions {
        force: args.force,
        project: args.project.clone().unwrap_or(defaults.project),
        branch: args.branch.clone().unwrap_or(defaults.branch),
    };
    let report = init_run_dir(&args.dir, &options).map_err(RunError::Configuration)?;

    for path in &report.written {
        println!("{} {}", style("created").green(), path.display());
    }
    for path in &report.skipped {
        println!(
            "{} {} (use --force to overwrite)",
            style("exists").dim(),
            path.display()
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_prompt(tool: &str) -> Result<i32, RunError> {
    let variant = tool
        .parse::<ToolVariant>()
        .map_err(|err| RunError::Configuration(err.into()))?;
    let text = TemplateEngine::new()
        .and_then(|engine| engine.render_guidance(variant))
        .map_err(RunError::Configuration)?;
    print!("{text}");
    Ok(exit_codes::OK)
}

/// First line of a clap error without its `error: ` prefix.
fn clap_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse")
    }

    #[test]
    fn bare_invocation_runs_with_defaults() {
        let cli = parse(&["ralf"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.run.tool, None);
        assert!(cli.run.max_iterations.is_empty());
        assert_eq!(cli.run.dir, PathBuf::from("."));
    }

    #[test]
    fn positional_budget_and_tool_forms() {
        let cli = parse(&["ralf", "--tool", "amp", "5"]);
        assert_eq!(cli.run.tool.as_deref(), Some("amp"));
        assert_eq!(cli.run.max_iterations, vec!["5"]);

        let cli = parse(&["ralf", "--tool=claude", "-3", "abc"]);
        assert_eq!(cli.run.tool.as_deref(), Some("claude"));
        assert_eq!(cli.run.max_iterations, vec!["-3", "abc"]);
    }

    #[test]
    fn tool_flag_is_recognized_after_the_budget() {
        let cli = parse(&["ralf", "5", "--tool", "amp"]);
        assert_eq!(cli.run.tool.as_deref(), Some("amp"));
        assert_eq!(cli.run.max_iterations, vec!["5"]);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = Cli::try_parse_from(["ralf", "--foo", "3"]).expect_err("unknown flag");
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(clap_message(&err).contains("--foo"));
    }

    #[test]
    fn explicit_run_subcommand() {
        let cli = parse(&["ralf", "run", "--dir", "work", "7"]);
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.dir, PathBuf::from("work"));
                assert_eq!(args.max_iterations, vec!["7"]);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn parse_init_force() {
        let cli = parse(&["ralf", "init", "--force", "--branch", "ralph/x"]);
        match cli.command {
            Some(Command::Init(args)) => {
                assert!(args.force);
                assert_eq!(args.branch.as_deref(), Some("ralph/x"));
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[test]
    fn parse_prompt() {
        let cli = parse(&["ralf", "prompt", "amp"]);
        assert!(matches!(cli.command, Some(Command::Prompt { tool }) if tool == "amp"));
    }

    #[test]
    fn missing_tool_value_is_an_error() {
        let err = Cli::try_parse_from(["ralf", "--tool"]).expect_err("missing value");
        let message = clap_message(&err);
        assert!(message.contains("--tool"));
        assert!(!message.starts_with("error:"));
    }

    #[test]
    fn version_flag_is_not_a_parse_failure() {
        let err = Cli::try_parse_from(["ralf", "--version"]).expect_err("version");
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }
}
