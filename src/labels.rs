// 该文件是 Tushi （图识） 项目的一部分。
// src/labels.rs - 类别标签表
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

use std::path::Path;

use tracing::info;

use crate::detector::ModelLoadError;

/// 未知类别的展示名称
const UNKNOWN_LABEL: &str = "unknown";

/// 类别标签表：类别索引（0 起）到可读名称的只读映射。
///
/// 来自换行分隔的名称文件，行号即类别索引。
/// 启动时加载一次，之后被所有请求共享。
#[derive(Debug, Clone)]
pub struct LabelTable {
  names: Vec<String>,
}

impl LabelTable {
  /// 从名称文件加载标签表。空表视为模型资产损坏。
  pub fn from_path(path: &Path) -> Result<Self, ModelLoadError> {
    let text = std::fs::read_to_string(path)
      .map_err(|e| ModelLoadError::ArtifactUnreadable(path.to_path_buf(), e))?;
    let table = Self::from_lines(&text);
    if table.is_empty() {
      return Err(ModelLoadError::EmptyLabelFile(path.to_path_buf()));
    }
    info!("标签表加载完成: {} 个类别", table.len());
    Ok(table)
  }

  /// 按行解析名称文本，忽略首尾空白与末尾空行
  pub fn from_lines(text: &str) -> Self {
    let names = text
      .trim()
      .lines()
      .map(|line| line.trim().to_string())
      .collect();
    Self { names }
  }

  /// 类别索引对应的名称；越界索引返回 "unknown"
  pub fn name(&self, class_id: usize) -> &str {
    self
      .names
      .get(class_id)
      .map(String::as_str)
      .unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
