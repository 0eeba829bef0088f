//! 提交目录、真值目录与掩膜目录中的文件命名方式.

use std::path::{Path, PathBuf};

use crate::consts::{FLAT_TESTING_SET_LEN, POCEMR_TESTING_SUBJECTS};

/// 文件布局.
///
/// 下文中 `{ext}` 为配置中的扩展名 (默认 `.nii.gz`), `{mod}` 为模态名.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Layout {
    /// 平铺布局:
    ///
    /// 1. 提交: `<participant>/subject_{id}_enhanced_{mod}{ext}`;
    /// 2. 真值: `<reference>/subject_{id}_reference_{mod}{ext}`;
    /// 3. 掩膜: `<masks>/subject_{id}_mask_{mod}{ext}`.
    #[default]
    Flat,

    /// 按受试者分目录的布局. 以 `prefix = "POCEMR"`, `width = 3` 为例:
    ///
    /// 1. 提交: `<participant>/POCEMR009/{enhanced_dir}/POCEMR009_{mod}{ext}`;
    /// 2. 真值: `<reference>/POCEMR009/{reference_dir}/POCEMR009_{mod}{ext}`;
    /// 3. 掩膜: `<masks>/POCEMR009/POCEMR009_{mod}{ext}`.
    Nested {
        /// 受试者名前缀.
        prefix: String,

        /// 受试者编号的零填充宽度.
        width: usize,

        /// 提交目录中每个受试者下的子目录名.
        enhanced_dir: String,

        /// 真值目录中每个受试者下的子目录名.
        reference_dir: String,
    },
}

impl Layout {
    /// POCEMR 测试集布局.
    pub fn pocemr() -> Self {
        Self::Nested {
            prefix: "POCEMR".to_owned(),
            width: 3,
            enhanced_dir: "Enhanced".to_owned(),
            reference_dir: "3T".to_owned(),
        }
    }

    /// 受试者名. 如 `subject_3`, `POCEMR009`.
    pub fn subject_name(&self, subject: u32) -> String {
        match self {
            Self::Flat => format!("subject_{subject}"),
            Self::Nested { prefix, width, .. } => format!("{prefix}{subject:0width$}"),
        }
    }

    /// 该布局对应测试集的默认受试者编号.
    pub fn default_subjects(&self) -> Vec<u32> {
        match self {
            Self::Flat => (1..=FLAT_TESTING_SET_LEN).collect(),
            Self::Nested { .. } => POCEMR_TESTING_SUBJECTS.to_vec(),
        }
    }

    /// 参赛者提交文件路径.
    pub fn submission_path(
        &self,
        participant_dir: &Path,
        subject: u32,
        modality: &str,
        ext: &str,
    ) -> PathBuf {
        let name = self.subject_name(subject);
        match self {
            Self::Flat => participant_dir.join(format!("{name}_enhanced_{modality}{ext}")),
            Self::Nested { enhanced_dir, .. } => participant_dir
                .join(&name)
                .join(enhanced_dir)
                .join(format!("{name}_{modality}{ext}")),
        }
    }

    /// 真值文件路径.
    pub fn reference_path(
        &self,
        reference_root: &Path,
        subject: u32,
        modality: &str,
        ext: &str,
    ) -> PathBuf {
        let name = self.subject_name(subject);
        match self {
            Self::Flat => reference_root.join(format!("{name}_reference_{modality}{ext}")),
            Self::Nested { reference_dir, .. } => reference_root
                .join(&name)
                .join(reference_dir)
                .join(format!("{name}_{modality}{ext}")),
        }
    }

    /// 掩膜文件路径. `modality` 为生成掩膜所用的模态.
    pub fn mask_path(&self, mask_root: &Path, subject: u32, modality: &str, ext: &str) -> PathBuf {
        let name = self.subject_name(subject);
        match self {
            Self::Flat => mask_root.join(format!("{name}_mask_{modality}{ext}")),
            Self::Nested { .. } => mask_root.join(&name).join(format!("{name}_{modality}{ext}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_paths() {
        let l = Layout::Flat;
        assert_eq!(
            l.submission_path(Path::new("/sub/team1"), 3, "T2", ".nii.gz"),
            Path::new("/sub/team1/subject_3_enhanced_T2.nii.gz")
        );
        assert_eq!(
            l.reference_path(Path::new("/ref"), 15, "FLAIR", ".nii.gz"),
            Path::new("/ref/subject_15_reference_FLAIR.nii.gz")
        );
        assert_eq!(
            l.mask_path(Path::new("/m"), 1, "T1", ".npy"),
            Path::new("/m/subject_1_mask_T1.npy")
        );
        assert_eq!(l.default_subjects(), (1..=15).collect::<Vec<_>>());
    }

    #[test]
    fn test_nested_paths() {
        let l = Layout::pocemr();
        assert_eq!(l.subject_name(9), "POCEMR009");
        assert_eq!(l.subject_name(103), "POCEMR103");
        assert_eq!(
            l.submission_path(Path::new("/sub/team1"), 9, "T1", ".nii.gz"),
            Path::new("/sub/team1/POCEMR009/Enhanced/POCEMR009_T1.nii.gz")
        );
        assert_eq!(
            l.reference_path(Path::new("/ref"), 34, "FLAIR", ".nii.gz"),
            Path::new("/ref/POCEMR034/3T/POCEMR034_FLAIR.nii.gz")
        );
        assert_eq!(
            l.mask_path(Path::new("/masks"), 76, "T1", ".nii.gz"),
            Path::new("/masks/POCEMR076/POCEMR076_T1.nii.gz")
        );
        assert_eq!(l.default_subjects()[0], 9);
        assert_eq!(l.default_subjects().len(), 15);
    }
}
