mod commands;
mod config;
mod watcher;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    normalize, remove, render, set, watch, NormalizeArgs, RemoveArgs, RenderArgs, SetArgs,
    WatchArgs,
};
use tracing_subscriber::EnvFilter;

/// Formsmith - design-time tooling for web-forms pages
#[derive(Parser, Debug)]
#[command(name = "formsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log designer activity (overridden by FORMSMITH_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a page to design-time HTML
    Render(RenderArgs),

    /// Give every server control an id
    Normalize(NormalizeArgs),

    /// Set, reset or bind a control property
    Set(SetArgs),

    /// Remove controls from a page
    Remove(RemoveArgs),

    /// Re-render a page whenever it changes
    Watch(WatchArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FORMSMITH_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(e) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    // the designer host runs on this thread, which owns the text of every page
    let result = match cli.command {
        Command::Render(args) => render(args, &cwd),
        Command::Normalize(args) => normalize(args, &cwd),
        Command::Set(args) => set(args, &cwd),
        Command::Remove(args) => remove(args, &cwd),
        Command::Watch(args) => watch(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
