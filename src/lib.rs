// 该文件是 Tushi （图识） 项目的一部分。
// src/lib.rs - 库主文件
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! 目标检测后处理流水线：
//! 预处理 → 推理（外部引擎） → 解码 → 非极大值抑制 → 标注 → 输出命名。
//!
//! 推理引擎不在本库范围内，由实现 [`detector::Detector`] 的外部后端提供；
//! 本库负责把原始输出张量变成一组不冗余的带标签边界框，
//! 并安全地产出命名后的结果图像。

pub mod annotate;
pub mod config;
pub mod decode;
pub mod detector;
pub mod labels;
pub mod nms;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod tensor;

pub use config::DetectConfig;
pub use decode::{BBox, Candidate};
pub use pipeline::{DetectError, DetectPipeline};
