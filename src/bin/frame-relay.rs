use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "frame-relay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded event script and print the acknowledgments the relay sends.
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Input event script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Write the full report (messages, stats, final state) as JSON to this path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Override the root holder colour (`#rrggbb` or `#rrggbbaa`).
    #[arg(long)]
    background: Option<String>,

    /// Log protocol decisions to stderr.
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Replay(args) => cmd_replay(args),
    }
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let mut script = frame_relay::ReplayScript::load(&args.in_path)
        .with_context(|| format!("load script '{}'", args.in_path.display()))?;
    if let Some(hex) = &args.background {
        script.opts.background = frame_relay::Rgba8Premul::from_hex(hex)?;
    }

    let report = frame_relay::replay(&script)?;

    for msg in &report.messages {
        println!("{}", serde_json::to_string(msg)?);
    }
    for err in &report.errors {
        eprintln!("event {}: {}", err.index, err.message);
    }

    if let Some(out) = &args.out {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        let f = std::fs::File::create(out)
            .with_context(|| format!("create report '{}'", out.display()))?;
        serde_json::to_writer_pretty(f, &report).with_context(|| "write report JSON")?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}
