// 该文件是 Tushi （图识） 项目的一部分。
// src/tensor.rs - 模型输入张量
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

const RGB_CHANNELS: usize = 3;

/// 模型输入张量：NHWC 布局的 RGB 浮点缓冲，取值已归一化到 [0,1]。
///
/// 通道顺序固定为 RGB（训练与推理两侧必须一致，否则精度下降）。
/// 张量只在一次 预处理 → 推理 调用中存活，推理结束后即丢弃。
#[derive(Debug, Clone)]
pub struct InputTensor {
  data: Box<[f32]>,
  width: u32,
  height: u32,
}

impl InputTensor {
  pub(crate) fn new(data: Vec<f32>, width: u32, height: u32) -> Self {
    debug_assert_eq!(
      data.len(),
      RGB_CHANNELS * width as usize * height as usize,
      "张量长度与形状不匹配"
    );
    Self {
      data: data.into_boxed_slice(),
      width,
      height,
    }
  }

  pub fn data(&self) -> &[f32] {
    &self.data
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

/// 原始图像的尺寸记录。
///
/// 解码时用它把归一化坐标映射回原图的绝对像素坐标，
/// 而不是映射到张量尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceShape {
  pub width: u32,
  pub height: u32,
}
