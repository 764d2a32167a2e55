// 该文件是 Tushi （图识） 项目的一部分。
// src/config.rs - 阈值与输出配置
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

use std::path::PathBuf;

use thiserror::Error;

/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
/// 默认 NMS IOU 阈值
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;
/// 默认模型输入边长（正方形张量）
pub const DEFAULT_INPUT_SIZE: u32 = 416;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("置信度阈值超出范围 (0,1): {0}")]
  ConfidenceThresholdOutOfRange(f32),
  #[error("NMS 阈值超出范围 (0,1): {0}")]
  NmsThresholdOutOfRange(f32),
  #[error("模型输入边长必须大于 0")]
  InvalidInputSize,
}

/// 检测流水线配置。
///
/// 构造后不可变；阈值必须落在开区间 (0,1) 内，
/// 非法取值是启动期的致命错误，不会进入按请求处理的路径。
#[derive(Debug, Clone)]
pub struct DetectConfig {
  /// 置信度阈值
  pub confidence_threshold: f32,
  /// NMS IOU 阈值
  pub nms_threshold: f32,
  /// 模型输入边长（张量为 input_size × input_size × 3）
  pub input_size: u32,
  /// 结果图像输出目录
  pub output_dir: PathBuf,
}

impl DetectConfig {
  pub fn new(
    confidence_threshold: f32,
    nms_threshold: f32,
    input_size: u32,
    output_dir: PathBuf,
  ) -> Result<Self, ConfigError> {
    if !(confidence_threshold > 0.0 && confidence_threshold < 1.0) {
      return Err(ConfigError::ConfidenceThresholdOutOfRange(
        confidence_threshold,
      ));
    }
    if !(nms_threshold > 0.0 && nms_threshold < 1.0) {
      return Err(ConfigError::NmsThresholdOutOfRange(nms_threshold));
    }
    if input_size == 0 {
      return Err(ConfigError::InvalidInputSize);
    }

    Ok(Self {
      confidence_threshold,
      nms_threshold,
      input_size,
      output_dir,
    })
  }

  /// 使用默认阈值与默认输入边长
  pub fn with_defaults(output_dir: PathBuf) -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
      input_size: DEFAULT_INPUT_SIZE,
      output_dir,
    }
  }
}
