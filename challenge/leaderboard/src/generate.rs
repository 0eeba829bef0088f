//! 生成用于演练的随机数据集.
//!
//! 真值为带随机对比度的球形体模; 第 `i` 个参赛者的提交为真值加上幅度递增的均匀噪声,
//! 因此排行榜名次应与参赛者编号一致. 每个受试者另有一个球形掩膜.

use std::fs;
use std::path::Path;

use mr_berry::consts::modality;
use mr_berry::prelude::*;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::AppError;
use crate::GenerateArgs;

/// 第 `team` 个参赛者 (从 0 开始) 的噪声幅度.
#[inline]
fn noise_amplitude(team: usize) -> f32 {
    0.05 * (team + 1) as f32
}

/// 以体中心为球心、`radius` 为半径的球内体素为 1.
fn sphere(size: usize, radius: f32) -> Array3<f32> {
    let c = (size as f32 - 1.0) / 2.0;
    Array3::from_shape_fn((size, size, size), |(k, i, j)| {
        let d2 = (k as f32 - c).powi(2) + (i as f32 - c).powi(2) + (j as f32 - c).powi(2);
        if d2 <= radius * radius {
            1.0
        } else {
            0.0
        }
    })
}

/// 随机对比度的体模: 背景, 球壳与内核三档强度, 外加少量纹理.
fn phantom(size: usize, rng: &mut StdRng) -> Array3<f32> {
    let outer = sphere(size, size as f32 * 0.4);
    let inner = sphere(size, size as f32 * 0.2);
    let (shell, core): (f32, f32) = (rng.gen_range(0.3..0.6), rng.gen_range(0.6..1.0));
    let mut ans = &outer * shell + &inner * (core - shell);
    ans.mapv_inplace(|v| v + rng.gen_range(0.0..0.05));
    ans
}

fn add_noise(volume: &Array3<f32>, amp: f32, rng: &mut StdRng) -> Array3<f32> {
    volume.mapv(|v| v + rng.gen_range(-amp..=amp))
}

/// 写出体数据. 扩展名决定格式; nifti 按 `[W, H, z]` 顺序写出.
fn write_volume(path: &Path, data: &Array3<f32>) -> Result<(), AppError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(AppError::io(dir))?;
    }
    match VolumeFormat::from_path(path) {
        Some(VolumeFormat::Npy) => {
            ndarray_npy::write_npy(path, data).map_err(|source| AppError::Npy {
                path: path.to_owned(),
                source,
            })
        }
        _ => {
            let data = data.view().permuted_axes([2, 1, 0]);
            nifti::writer::WriterOptions::new(path)
                .write_nifti(&data.as_standard_layout())
                .map_err(|source| AppError::Nifti {
                    path: path.to_owned(),
                    source,
                })
        }
    }
}

/// 生成数据集.
pub fn generate(args: &GenerateArgs) -> Result<(), AppError> {
    let mut config = args.preset.config();
    if args.size < mr_berry::consts::ssim::WIN_SIZE {
        return Err(AppError::Config(ConfigError::Invalid(format!(
            "volume size {} is smaller than the ssim window",
            args.size
        ))));
    }
    config.extension = if args.npy { ".npy" } else { ".nii.gz" }.to_owned();
    config.subjects.truncate(args.subjects);

    let root = args.out.as_path();
    let (sub_root, ref_root, mask_root) = (
        root.join("submissions"),
        root.join("reference"),
        root.join("masks"),
    );
    let layout = &config.layout;
    let ext = config.extension.as_str();
    let mask_modality = config.mask_modality.as_str();
    let mut rng = StdRng::seed_from_u64(args.seed);

    log::info!(
        "Generating {} subject(s) x {} team(s) under `{}`...",
        config.subjects.len(),
        args.teams,
        root.display()
    );
    for &subject in &config.subjects {
        let mask = sphere(args.size, args.size as f32 * 0.35);
        write_volume(&layout.mask_path(&mask_root, subject, mask_modality, ext), &mask)?;

        for m in modality::ALL {
            let reference = phantom(args.size, &mut rng);
            write_volume(&layout.reference_path(&ref_root, subject, m, ext), &reference)?;

            for team in 0..args.teams {
                let dir = sub_root.join(format!("team_{:02}", team + 1));
                let pred = add_noise(&reference, noise_amplitude(team), &mut rng);
                write_volume(&layout.submission_path(&dir, subject, m, ext), &pred)?;
            }
        }
    }

    config.submission_dir = sub_root;
    config.reference_dir = ref_root;
    config.mask_dir = Some(mask_root);
    let path = root.join("config.json");
    config.to_json_file(&path)?;
    log::info!("Done. Score it with `leaderboard score --config {}`", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Preset;

    #[test]
    fn test_sphere() {
        let s = sphere(9, 2.0);
        assert_eq!(s[(4, 4, 4)], 1.0);
        assert_eq!(s[(0, 0, 0)], 0.0);
        assert_eq!(s[(4, 4, 6)], 1.0);
        assert_eq!(s[(4, 4, 7)], 0.0);
    }

    #[test]
    fn test_generated_dataset_ranks_by_noise() {
        let out = std::env::temp_dir().join(format!("leaderboard_gen_{}", std::process::id()));
        let _ = fs::remove_dir_all(&out);
        let args = GenerateArgs {
            out: out.clone(),
            preset: Preset::Masked,
            teams: 3,
            subjects: 2,
            size: 12,
            npy: true,
            seed: 7,
        };
        generate(&args).unwrap();

        let config = EvalConfig::from_json_file(out.join("config.json")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.subjects, [9, 34]);
        assert!(out
            .join("submissions/team_02/POCEMR034/Enhanced/POCEMR034_FLAIR.npy")
            .is_file());

        let diag = MemoryDiagnostics::new();
        let table = Evaluator::new(config, &diag).run();
        let ids: Vec<&str> = table.records().iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["team_01", "team_02", "team_03"]);
        assert!(table.records().iter().all(|r| r.sample_count() == 6));

        fs::remove_dir_all(&out).unwrap();
    }

    #[test]
    fn test_nifti_round_trip() {
        let dir = std::env::temp_dir().join(format!("leaderboard_nii_{}", std::process::id()));
        let path = dir.join("vol.nii.gz");
        let data = Array3::from_shape_fn((3, 4, 5), |(k, i, j)| (k * 100 + i * 10 + j) as f32);
        write_volume(&path, &data).unwrap();
        let back = MrVolume::open(&path).unwrap();
        assert_eq!(back.shape(), (3, 4, 5));
        assert_eq!(back.data(), data.view());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_too_small() {
        let args = GenerateArgs {
            out: std::env::temp_dir().join("leaderboard_never_written"),
            preset: Preset::Flat,
            teams: 1,
            subjects: 1,
            size: 4,
            npy: true,
            seed: 0,
        };
        assert!(matches!(generate(&args), Err(AppError::Config(_))));
    }
}
