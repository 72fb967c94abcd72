//! patternflow command line
//!
//! Plays and inspects pattern walkthroughs in the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ratatui::style::Color;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::flow_style::{flow_style, MessageKind};
use crate::layout::{compute_layout, LayoutCache};
use crate::patterns::{self, PatternScenario};
use crate::scheduler::TokioScheduler;
use crate::sequencer::PlaybackMode;
use crate::session::{FlowFrame, VisualizationSession};
use crate::telemetry::{init_tracing, init_tracing_verbose};

#[derive(Parser)]
#[command(name = "patternflow")]
#[command(about = "Step through animated walkthroughs of AI agent design patterns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Quiet mode (no prompts or banners)
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log sequencer activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available patterns
    List,

    /// Show the style used for each message type
    Styles {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the computed node positions of a pattern
    Layout {
        /// Pattern id (see `list`)
        pattern: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a pattern walkthrough
    Play {
        /// Pattern id (see `list`)
        pattern: String,

        /// Playback mode: auto or step (Enter advances)
        #[arg(short, long, value_enum)]
        mode: Option<PlaybackMode>,

        /// Speed multiplier (2.0 = twice as fast)
        #[arg(short, long)]
        speed: Option<f64>,

        /// Delay between steps at speed 1.0, in milliseconds
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,

        /// Print one JSON object per frame
        #[arg(long)]
        json: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        init_tracing_verbose();
    } else {
        init_tracing();
    }
    let mut config = Config::load(cli.config.as_deref())?;

    if cli.no_color || !config.ui.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::List => {
            for scenario in patterns::catalog() {
                println!(
                    "{:<14} {}",
                    scenario.id.bold(),
                    format!("{} - {}", scenario.title, scenario.summary).dimmed()
                );
            }
        }
        Commands::Styles { json } => print_styles(json)?,
        Commands::Layout { pattern, json } => {
            let scenario = patterns::find(&pattern)?;
            let layout = compute_layout(&scenario.nodes(), &scenario.edges(), &config.layout.options);
            if json || config.ui.json {
                println!("{}", serde_json::to_string_pretty(&layout)?);
            } else {
                for pos in &layout.positions {
                    let label = scenario.node_label(&pos.id).unwrap_or_default();
                    println!(
                        "rank {} #{}  {:<10} {:<18} ({:>7.1}, {:>7.1})",
                        pos.rank, pos.order, pos.id, label, pos.x, pos.y
                    );
                }
            }
        }
        Commands::Play {
            pattern,
            mode,
            speed,
            delay_ms,
            json,
        } => {
            if let Some(mode) = mode {
                config.playback.mode = mode;
            }
            if let Some(speed) = speed {
                config.playback.speed_factor = speed;
            }
            if let Some(delay) = delay_ms {
                config.playback.base_delay_ms = delay;
            }
            config.ui.json |= json;

            let scenario = patterns::find(&pattern)?;
            scenario.validate()?;
            play(scenario, &config, cli.quiet).await?;
        }
    }

    Ok(())
}

async fn play(scenario: &PatternScenario, config: &Config, quiet: bool) -> Result<()> {
    let cache = Arc::new(LayoutCache::with_settings(
        config.layout.cache_ttl(),
        config.layout.cache_capacity,
    ));
    let show_prompt = !quiet;
    let mut session = VisualizationSession::new(TokioScheduler::new(), &config.playback, cache)
        .with_wait_listener(move |waiting| {
            if waiting && show_prompt {
                eprintln!("{}", "  [Enter] next step".dimmed());
            }
        });

    let (tx, mut rx) = mpsc::unbounded_channel::<FlowFrame>();
    session.on_frame(move |frame| {
        let _ = tx.send(frame.clone());
    });
    session.simulate_pattern_flow(scenario, &config.layout.options);

    if !quiet && !config.ui.json {
        println!(
            "{} {} ({} mode, x{})",
            "▶".bold(),
            scenario.title.bold(),
            config.playback.mode,
            config.playback.speed_factor
        );
    }

    session.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                print_frame(&frame, config.ui.json)?;
                if matches!(frame, FlowFrame::Completed { .. }) {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open && session.is_waiting() => {
                match line.context("Failed to read from stdin")? {
                    Some(_) => session.advance(),
                    None => {
                        // Nobody left to press Enter; finish unattended.
                        stdin_open = false;
                        session.set_mode(PlaybackMode::Auto);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.stop();
                break;
            }
        }
    }

    Ok(())
}

fn print_frame(frame: &FlowFrame, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(frame)?);
        return Ok(());
    }

    match frame {
        FlowFrame::Message {
            step,
            total,
            from,
            to,
            kind,
            label,
            ..
        } => {
            let tag = paint(kind.tag(), flow_style(*kind).color);
            println!("[{}/{}] {:<10} → {:<10} {:<12} {}", step + 1, total, from, to, tag, label);
        }
        FlowFrame::Completed { pattern, steps } => {
            println!("{} {} ({} steps)", "✓".green().bold(), pattern.bold(), steps);
        }
    }
    Ok(())
}

fn print_styles(json: bool) -> Result<()> {
    if json {
        let table: Vec<_> = MessageKind::ALL
            .iter()
            .map(|k| serde_json::json!({ "kind": k, "style": flow_style(*k) }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for kind in MessageKind::ALL {
        let style = flow_style(kind);
        println!(
            "{:<12} {} {:>5}ms  width {}  {}",
            paint(kind.tag(), style.color),
            style.hex(),
            style.pulse.as_millis(),
            style.stroke_width,
            style.label.unwrap_or("-")
        );
    }
    Ok(())
}

fn paint(text: &str, color: Color) -> colored::ColoredString {
    match color {
        Color::Rgb(r, g, b) => text.truecolor(r, g, b),
        _ => text.normal(),
    }
}
