//! 程序运行函数.

use mr_berry::prelude::*;
use utils::loader;

use crate::error::AppError;
use crate::{NonFiniteArg, Preset, ScoreArgs};

impl Preset {
    /// 对应的评估配置 (目录为空).
    pub fn config(self) -> EvalConfig {
        match self {
            Self::Flat => EvalConfig::flat(),
            Self::Masked => EvalConfig::masked(),
        }
    }
}

impl From<NonFiniteArg> for NonFinitePolicy {
    fn from(a: NonFiniteArg) -> Self {
        match a {
            NonFiniteArg::Exclude => Self::Exclude,
            NonFiniteArg::Cap => Self::Cap,
        }
    }
}

/// 由命令行参数构建配置.
///
/// 优先级: 命令行参数 > 配置文件 > 环境变量 / 用户主目录.
pub fn build_config(args: &ScoreArgs) -> Result<EvalConfig, AppError> {
    let mut c = match &args.config {
        Some(path) => EvalConfig::from_json_file(path)?,
        None => args.preset.config(),
    };

    if let Some(d) = &args.submissions {
        c.submission_dir = d.clone();
    } else if c.submission_dir.as_os_str().is_empty() {
        c.submission_dir =
            loader::submission_dir_from_env_or_home().ok_or(AppError::MissingDir {
                what: "submission",
                env: loader::SUBMISSION_DIR_ENV,
            })?;
    }

    if let Some(d) = &args.references {
        c.reference_dir = d.clone();
    } else if c.reference_dir.as_os_str().is_empty() {
        c.reference_dir =
            loader::reference_dir_from_env_or_home().ok_or(AppError::MissingDir {
                what: "reference",
                env: loader::REFERENCE_DIR_ENV,
            })?;
    }

    if let Some(d) = &args.masks {
        c.mask_dir = Some(d.clone());
    } else if c.mask_dir.is_none() && c.region == Region::Masked {
        c.mask_dir = Some(
            loader::mask_dir_from_env_or_home().ok_or(AppError::MissingDir {
                what: "mask",
                env: loader::MASK_DIR_ENV,
            })?,
        );
    }

    if let Some(ext) = &args.extension {
        c.extension = ext.clone();
    }
    if let Some(p) = args.non_finite {
        c.non_finite = p.into();
    }

    c.validate()?;
    Ok(c)
}

/// 实际运行.
pub fn run(args: &ScoreArgs) -> Result<LeaderboardTable, AppError> {
    let config = build_config(args)?;

    let jobs = utils::jobs_or_cpus(args.jobs);
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()?;

    log::info!(
        "Scoring `{}` against `{}` ({:?}, {:?}, {jobs} thread(s))...",
        config.submission_dir.display(),
        config.reference_dir.display(),
        config.region,
        config.scoring,
    );
    let diag = LogDiagnostics;
    Ok(Evaluator::new(config, &diag).run())
}
