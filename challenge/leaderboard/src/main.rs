//! MRI 增强挑战赛评分程序.
//!
//! 1. `leaderboard score`: 评估全部参赛者, 输出排行榜;
//! 2. `leaderboard generate`: 生成用于演练的随机数据集.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

mod error;
mod generate;
mod result;
mod runner;

#[derive(Parser)]
#[command(name = "leaderboard")]
#[command(about = "Score low-field MRI enhancement submissions against 3T references")]
#[command(version)]
struct Cli {
    /// Log level.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every participant and print the leaderboard.
    Score(ScoreArgs),

    /// Generate a random dataset for dry runs.
    Generate(GenerateArgs),
}

/// 评估约定预设.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Preset {
    /// Flat layout, whole-volume metrics, raw PSNR, ranked by SSIM.
    Flat,
    /// POCEMR layout, masked metrics, PSNR / 32, ranked by final score.
    Masked,
}

/// 非有限值处理策略.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum NonFiniteArg {
    /// Drop non-finite values from the mean.
    Exclude,
    /// Cap infinite PSNR at 80 dB and infinite NMSE at 1.0.
    Cap,
}

#[derive(Debug, Clone, Args)]
pub struct ScoreArgs {
    /// JSON config file. Flags below override its fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Preset used when no config file is given.
    #[arg(long, value_enum, default_value_t = Preset::Flat)]
    pub preset: Preset,

    /// Submission root (default: $MR_SUBMISSION_DIR or ~/dataset/submissions).
    #[arg(long)]
    pub submissions: Option<PathBuf>,

    /// Reference root (default: $MR_REFERENCE_DIR or ~/dataset/reference).
    #[arg(long)]
    pub references: Option<PathBuf>,

    /// Mask root for masked evaluation (default: $MR_MASK_DIR or ~/dataset/masks).
    #[arg(long)]
    pub masks: Option<PathBuf>,

    /// Volume file extension, e.g. `.nii.gz` or `.npy`.
    #[arg(long)]
    pub extension: Option<String>,

    /// Non-finite metric policy (default: cap).
    #[arg(long, value_enum)]
    pub non_finite: Option<NonFiniteArg>,

    /// Directory receiving `leaderboard.csv`.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Also write the leaderboard as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Worker threads (0 = all cores). Also bounds how many participants are scored at once.
    #[arg(long)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Output root. `submissions/`, `reference/` and `masks/` are created below it.
    #[arg(long)]
    pub out: PathBuf,

    /// Layout to generate.
    #[arg(long, value_enum, default_value_t = Preset::Flat)]
    pub preset: Preset,

    /// Number of participants.
    #[arg(long, default_value = "3")]
    pub teams: usize,

    /// Number of subjects (taken from the preset's subject list).
    #[arg(long, default_value = "3")]
    pub subjects: usize,

    /// Volume edge length in voxels.
    #[arg(long, default_value = "32")]
    pub size: usize,

    /// Write `.npy` instead of `.nii.gz`.
    #[arg(long)]
    pub npy: bool,

    /// RNG seed.
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(cli.log_level.into())
        .init()
    {
        eprintln!("cannot install logger: {e}");
    }

    let ans = match &cli.command {
        Commands::Score(args) => runner::run(args).and_then(|table| result::report(&table, args)),
        Commands::Generate(args) => generate::generate(args),
    };

    match ans {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
