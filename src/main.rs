//! ccline - Multi-line statusline for Claude Code

use anyhow::Context;
use ccline::{
    cli::{Cli, Command, LineSelection, RenderArgs},
    config::{EnvSnapshot, StatuslineConfig, default_claude_dir},
    error_log::{ERROR_LOG_FILE, append_error},
    install,
    statusline,
};
use ccline_terminal::{Palette, Tone};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout belongs to Claude Code; diagnostics go to stderr and only on request
    let filter = EnvFilter::try_from_env("CCLINE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("ccline=warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    match cli.command {
        Some(Command::Install {
            settings,
            show,
            dry_run,
        }) => run_install(&cli.render, settings, show, dry_run),
        None => run_statusline(&cli.render).await,
    }
}

fn claude_dir(args: &RenderArgs) -> anyhow::Result<PathBuf> {
    match &args.claude_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(default_claude_dir()?),
    }
}

fn run_install(
    args: &RenderArgs,
    settings: Option<PathBuf>,
    show: Option<LineSelection>,
    dry_run: bool,
) -> ExitCode {
    let palette = Palette::new(!args.no_color && is_terminal::is_terminal(std::io::stdout()));
    colored::control::set_override(palette.enabled());

    let result = (|| -> anyhow::Result<install::InstallReport> {
        let settings_path = match settings {
            Some(path) => path,
            None => install::default_settings_path(&claude_dir(args)?)?,
        };
        let executable = std::env::current_exe().context("could not locate the ccline binary")?;
        let command = install::statusline_command(&executable, show.as_ref());
        Ok(install::install(&settings_path, &command, dry_run)?)
    })();

    match result {
        Ok(report) if !report.written => {
            println!(
                "{} {}",
                palette.paint("Dry run:", Tone::BrightYellow),
                report.settings_path.display()
            );
            match serde_json::to_string_pretty(&report.settings) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("Failed to print settings: {}", e),
            }
            ExitCode::SUCCESS
        }
        Ok(report) => {
            if let Some(backup) = &report.backup_path {
                println!("Backed up existing settings to {}", backup.display());
            }
            let verb = if report.replaced_existing {
                "Updated"
            } else {
                "Added"
            };
            println!(
                "{} statusLine in {}",
                palette.paint(verb, Tone::BrightGreen),
                report.settings_path.display()
            );
            println!("Restart Claude Code to see the new statusline.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e:#}", palette.paint("Install failed:", Tone::BrightRed));
            ExitCode::FAILURE
        }
    }
}

async fn run_statusline(args: &RenderArgs) -> ExitCode {
    let payload = match statusline::read_input().await {
        Ok(Some(payload)) => payload,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let env = EnvSnapshot::from_env();
    let rendered = async {
        let config = StatuslineConfig::resolve(args, &env).context("invalid statusline configuration")?;
        colored::control::set_override(config.color);
        statusline::generate(&config, &payload, Utc::now()).await
    }
    .await;

    match rendered {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        Err(error) => {
            let palette = Palette::new(!args.no_color && !env.color_disabled());
            colored::control::set_override(palette.enabled());
            for line in statusline::fallback_lines(&palette) {
                println!("{line}");
            }
            match claude_dir(args) {
                Ok(dir) => {
                    if let Err(e) = append_error(&dir.join(ERROR_LOG_FILE), &error, &payload) {
                        debug!("Failed to write error log: {}", e);
                    }
                }
                Err(e) => debug!("No place for the error log: {}", e),
            }
        }
    }
    // Claude Code hides the statusline on a non-zero exit
    ExitCode::SUCCESS
}
