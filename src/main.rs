use clap::{ArgAction, Parser, Subcommand};
use idphoto::commands::{self, VerifyOptions};
use idphoto::core::error::{VerifyError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Score identity photos against a configurable set of checkers
#[derive(Parser)]
#[command(name = "idphoto")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Verify one or more images
  Verify {
    /// Image files to verify
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Config file (default: search idphoto.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override verification.passing_threshold
    #[arg(long)]
    threshold: Option<u32>,
    /// Override verification.timeout_ms
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Override verification.workers
    #[arg(long)]
    workers: Option<usize>,
    /// Output reports in JSON format
    #[arg(long)]
    json: bool,
  },

  /// List configured checkers
  Checkers {
    /// Config file (default: search idphoto.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Write a default idphoto.toml in the current directory
  Init {
    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  // stdout carries reports; logs go to stderr
  let _ = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr)
    .try_init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Verify {
      images,
      config,
      threshold,
      timeout_ms,
      workers,
      json,
    } => commands::run_verify(
      images,
      VerifyOptions {
        config,
        threshold,
        timeout_ms,
        workers,
        json,
      },
    ),
    Commands::Checkers { config, json } => commands::run_checkers(config, json).map(|()| 0),
    Commands::Init { force } => commands::run_init(force).map(|()| 0),
  };

  match result {
    Ok(code) => std::process::exit(code),
    Err(err) => handle_error(err),
  }
}

fn handle_error(err: VerifyError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
