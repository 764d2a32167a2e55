// 该文件是 Tushi （图识） 项目的一部分。
// src/detector.rs - 推理后端接口与模型资产
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::labels::LabelTable;
use crate::tensor::InputTensor;

/// 每行输出中的边界框字段数（cx, cy, w, h）
pub const BOX_FIELDS: usize = 4;

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型资产不可读: {0}: {1}")]
  ArtifactUnreadable(PathBuf, #[source] std::io::Error),
  #[error("标签文件为空: {0}")]
  EmptyLabelFile(PathBuf),
  #[error("无效的输出层: 行长 {0} 小于最小值 {1}")]
  InvalidRowLength(usize, usize),
}

/// 推理后端的一个输出层：扁平的浮点缓冲加固定行长。
///
/// 每行形如 `[cx, cy, w, h, score_0, …, score_{K-1}]`，
/// 框几何各分量相对张量尺寸归一化到 [0,1]。
#[derive(Debug, Clone)]
pub struct RawLayer {
  data: Box<[f32]>,
  row_len: usize,
}

impl RawLayer {
  /// 行长必须至少容纳框几何加一个类别分数
  pub fn new(data: Vec<f32>, row_len: usize) -> Result<Self, ModelLoadError> {
    if row_len <= BOX_FIELDS {
      return Err(ModelLoadError::InvalidRowLength(row_len, BOX_FIELDS + 1));
    }
    Ok(Self {
      data: data.into_boxed_slice(),
      row_len,
    })
  }

  pub fn row_len(&self) -> usize {
    self.row_len
  }

  /// 按行迭代；末尾不满一行的数据被忽略
  pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
    self.data.chunks_exact(self.row_len)
  }
}

/// 推理后端接口。
///
/// 本库不实现网络前向传播；后端只需保证：
/// - 相同输入与模型状态下输出确定；
/// - 输出行遵循 [`RawLayer`] 的布局约定；
/// - 坐标相对张量尺寸归一化。
///
/// 后端不要求线程安全，流水线会对 `infer` 调用加锁串行化。
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&self, tensor: &InputTensor) -> Result<Vec<RawLayer>, Self::Error>;
}

/// 模型资产：网络拓扑配置、权重与类别名称文件。
///
/// 进程启动时加载一次，之后作为只读状态被所有请求共享；
/// 任何一个文件缺失或不可读都是致命的启动错误。
pub struct ModelArtifacts {
  /// 网络拓扑配置原始字节（交由具体后端解析）
  pub config: Box<[u8]>,
  /// 权重原始字节（交由具体后端解析）
  pub weights: Box<[u8]>,
  /// 类别标签表
  pub labels: LabelTable,
}

impl ModelArtifacts {
  pub fn load(
    config_path: &Path,
    weights_path: &Path,
    names_path: &Path,
  ) -> Result<Self, ModelLoadError> {
    info!("加载模型配置: {}", config_path.display());
    let config = std::fs::read(config_path)
      .map_err(|e| ModelLoadError::ArtifactUnreadable(config_path.to_path_buf(), e))?;

    info!("加载模型权重: {}", weights_path.display());
    let weights = std::fs::read(weights_path)
      .map_err(|e| ModelLoadError::ArtifactUnreadable(weights_path.to_path_buf(), e))?;
    debug!(
      "权重大小: {:.2} MB",
      weights.len() as f64 / (1024.0 * 1024.0)
    );

    let labels = LabelTable::from_path(names_path)?;

    Ok(Self {
      config: config.into_boxed_slice(),
      weights: weights.into_boxed_slice(),
      labels,
    })
  }
}

mod replay;
pub use self::replay::{ReplayDetector, ReplayError};
