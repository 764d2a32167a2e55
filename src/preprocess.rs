// 该文件是 Tushi （图识） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::tensor::{InputTensor, SourceShape};

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("无效图像: {0}x{1}")]
  InvalidImage(u32, u32),
}

/// 图像预处理器：把 RGB 图像缩放到模型输入尺寸，
/// 并归一化为 [0,1] 的浮点张量（NHWC，RGB 顺序）。
///
/// 双线性插值缩放；同时记录原图尺寸，供解码阶段把
/// 归一化坐标映射回原图像素坐标。
pub struct Preprocessor {
  target_size: u32,
}

impl Preprocessor {
  pub fn new(target_size: u32) -> Self {
    Self { target_size }
  }

  pub fn run(&self, image: &RgbImage) -> Result<(InputTensor, SourceShape), PreprocessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(PreprocessError::InvalidImage(width, height));
    }

    let source = SourceShape { width, height };

    debug!(
      "预处理: {}x{} -> {}x{}",
      width, height, self.target_size, self.target_size
    );

    let resized = image::imageops::resize(
      image,
      self.target_size,
      self.target_size,
      image::imageops::FilterType::Triangle,
    );

    let data: Vec<f32> = resized
      .into_raw()
      .into_iter()
      .map(|v| v as f32 / 255.0)
      .collect();

    let tensor = InputTensor::new(data, self.target_size, self.target_size);
    Ok((tensor, source))
  }
}
