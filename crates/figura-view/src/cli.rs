use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "figura-view")]
#[command(about = "Figura avatar viewer, windowed or headless")]
pub struct CliArgs {
    /// JSON viewer config; FIGURA_* variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand)]
pub enum Mode {
    Headless {
        #[command(subcommand)]
        command: HeadlessCommand,
    },
}

#[derive(Subcommand)]
pub enum HeadlessCommand {
    /// Loads a model, plays an animation and reports what the viewer did.
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Model path or URL; `procedural://mannequin?height=1.8` builds one in memory.
    #[arg(long, default_value = "procedural://mannequin")]
    pub model: String,
    #[arg(long, default_value = "procedural://reference-wave")]
    pub animation: Option<String>,
    #[arg(long)]
    pub environment: Option<String>,
    #[arg(long, default_value_t = 120)]
    pub frames: usize,
    /// Seconds per frame.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    pub dt: f32,
    #[arg(long, default_value_t = 960)]
    pub width: u32,
    #[arg(long, default_value_t = 640)]
    pub height: u32,
    #[arg(long)]
    pub wireframe: bool,
    #[arg(long)]
    pub skeleton: bool,
    #[arg(long)]
    pub ruler: bool,
    /// Project on the CPU and report shape counts instead of counting draws.
    #[arg(long)]
    pub software: bool,
}
