//! 通用常量.

/// 归一化之后的强度跨度. SSIM 与 PSNR 均按此值计算.
pub const DATA_RANGE: f64 = 1.0;

/// 计分变体 B 中用于缩放 PSNR 的上限 (dB).
pub const MAX_PSNR: f64 = 32.0;

/// 逐体素 PSNR 分母上的平滑项, 防止误差为 0 时除零.
pub const PSNR_EPSILON: f64 = 1e-8;

/// `NonFinitePolicy::Cap` 下无穷大 PSNR 的替代值 (dB).
///
/// 等于误差为 0 的体素在逐体素 PSNR 中的取值: `10 * log10(1 / 1e-8)`.
pub const PSNR_CAP: f64 = 80.0;

/// 掩膜版 NMSE 的上限. 同时也是 `NonFinitePolicy::Cap` 下无穷大 NMSE 的替代值.
pub const NMSE_CEILING: f64 = 1.0;

/// 掩膜阈值. 体素值严格大于该值时视为前景.
pub const MASK_THRESHOLD: f32 = 0.5;

/// SSIM 相关参数.
pub mod ssim {
    /// 默认窗口边长 (体素).
    pub const WIN_SIZE: usize = 7;

    /// 亮度项稳定常数系数.
    pub const K1: f64 = 0.01;

    /// 对比度/结构项稳定常数系数.
    pub const K2: f64 = 0.03;
}

/// 挑战赛使用的模态名.
pub mod modality {
    /// T1 加权.
    pub const T1: &str = "T1";

    /// T2 加权.
    pub const T2: &str = "T2";

    /// FLAIR.
    pub const FLAIR: &str = "FLAIR";

    /// 全部模态, 按评估顺序排列.
    pub const ALL: [&str; 3] = [T1, T2, FLAIR];
}

/// 平铺布局下的测试集大小. 受试者编号为 `1..=FLAT_TESTING_SET_LEN`.
pub const FLAT_TESTING_SET_LEN: u32 = 15;

/// POCEMR 测试集的受试者编号, 按评估顺序排列.
pub const POCEMR_TESTING_SUBJECTS: [u32; 15] =
    [9, 34, 76, 36, 55, 50, 103, 52, 90, 63, 91, 42, 96, 48, 85];
