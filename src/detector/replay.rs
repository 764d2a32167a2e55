// 该文件是 Tushi （图识） 项目的一部分。
// src/detector/replay.rs - 回放推理后端
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

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::detector::{Detector, ModelLoadError, RawLayer};
use crate::tensor::InputTensor;

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("回放文件不可读: {0}: {1}")]
  FileUnreadable(PathBuf, #[source] std::io::Error),
  #[error("回放文件解析失败: {0}: {1}")]
  ParseError(PathBuf, #[source] serde_json::Error),
  #[error("回放文件无效: {0}")]
  InvalidDump(#[from] ModelLoadError),
}

/// 回放文件的 JSON 结构
#[derive(Deserialize)]
struct ReplayDump {
  row_len: usize,
  layers: Vec<Vec<f32>>,
}

/// 回放后端：从记录好的推理输出重建各输出层。
///
/// 真实引擎一次运行的原始输出被保存成 JSON
/// （`{"row_len": N, "layers": [[…], …]}`），之后可以在没有推理
/// 引擎的环境里反复驱动后处理流水线，便于调试与回归。
pub struct ReplayDetector {
  layers: Vec<RawLayer>,
}

impl ReplayDetector {
  pub fn from_dump(path: &Path) -> Result<Self, ReplayError> {
    let text = std::fs::read_to_string(path)
      .map_err(|e| ReplayError::FileUnreadable(path.to_path_buf(), e))?;
    let dump: ReplayDump = serde_json::from_str(&text)
      .map_err(|e| ReplayError::ParseError(path.to_path_buf(), e))?;

    let mut layers = Vec::with_capacity(dump.layers.len());
    for layer in dump.layers {
      layers.push(RawLayer::new(layer, dump.row_len)?);
    }

    info!("回放文件加载完成: {} 个输出层", layers.len());
    Ok(Self { layers })
  }
}

impl Detector for ReplayDetector {
  type Error = ReplayError;

  /// 每次调用都返回同一组记录的输出层（确定性回放）
  fn infer(&self, _tensor: &InputTensor) -> Result<Vec<RawLayer>, Self::Error> {
    Ok(self.layers.clone())
  }
}
