#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 为低场强 (64mT) MRI 增强挑战赛提供参赛结果的评分流程:
//! 加载增强体数据与 3T 真值, 归一化, (可选) 掩膜, 计算 SSIM/PSNR/MAE/NMSE,
//! 汇总加权得分, 最后生成排行榜.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 单个样本 (参赛者 × 受试者 × 模态) 的任何失败都只会被记录并跳过,
//!   不会中断整批评估. 详见 [`pipeline`].
//! 2. 所有诊断信息都通过注入的 [`diag::Diagnostics`] 输出, 库本身不配置全局日志.
//!
//! # 开发计划
//!
//! ### nifti / npy 体数据加载 ✅
//!
//! 按扩展名分派格式. nifti 数据统一以 `[z, H, W]` 方式访问.
//!
//! 实现位于 `mr-berry/src/data`.
//!
//! ### min-max 归一化 ✅
//!
//! 常量体数据不会产生 NaN, 而是置零并给出警告.
//!
//! 实现位于 `mr-berry/src/normalize.rs`.
//!
//! ### 四种指标及其掩膜版本 ✅
//!
//! 1. SSIM: 7x7x7 均值窗口, 反射边界, 样本协方差. ✅
//! 2. PSNR: 整体 / 逐体素 (带 `1e-8` 平滑项). ✅
//! 3. MAE. ✅
//! 4. NMSE: 掩膜版本按掩膜区域能量归一, 并截断到 1. ✅
//!
//! 掩膜指标总是先在 **未掩膜** 的体数据上计算稠密图, 再只在掩膜内求均值.
//! 先把输入乘以掩膜会破坏 SSIM 窗口在掩膜边界处的统计量.
//!
//! 实现位于 `mr-berry/src/metrics`.
//!
//! ### 加权汇总与排行榜 ✅
//!
//! 两种计分约定 (原始 dB 的 PSNR / 除以 `MAX_PSNR` 的 PSNR) 由配置显式选择,
//! 不会混用.
//!
//! 实现位于 `mr-berry/src/{aggregate, leaderboard}.rs`.
//!
//! ### 数据集布局与评估配置 ✅
//!
//! 1. 平铺布局 `subject_{id}_enhanced_{mod}` 与 POCEMR 分目录布局. ✅
//! 2. 两套预设 `EvalConfig::{flat, masked}`, 可从 JSON 读取 (`serde` feature). ✅
//!
//! 实现位于 `mr-berry/src/{dataset, config.rs}`.
//!
//! ### 并行评估 ✅
//!
//! 开启 `rayon` feature 后按参赛者并行, 输出顺序与串行完全一致.
//!
//! 实现位于 `mr-berry/src/pipeline.rs`.

/// 三维索引, 同时也用作三维形状 `(z, H, W)`.
pub type Idx3d = (usize, usize, usize);

/// 体数据与掩膜.
mod data;

pub use data::{loader::VolumeLoader, MrVolume, RoiMask, VolumeFormat};

pub mod aggregate;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod diag;
pub mod error;
pub mod leaderboard;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod prelude;
