// 该文件是 Tushi （图识） 项目的一部分。
// src/output.rs - 输出命名与原子落盘
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

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};

/// 命名冲突的重试预算。时间戳加随机后缀的冲突概率本就趋近于零，
/// 预算耗尽在实践中不可达。
const NAME_RETRY_BUDGET: u32 = 16;

/// 无法识别扩展名时的落盘格式
const FALLBACK_EXTENSION: &str = "png";

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("输出目录不可用: {0}: {1}")]
  DirectoryUnavailable(PathBuf, #[source] std::io::Error),
  #[error("输出写入错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像编码错误: {0}")]
  Encode(#[from] image::ImageError),
  #[error("输出命名重试 {0} 次后仍然冲突")]
  NameExhausted(u32),
}

/// 输出命名器：为结果图像生成不冲突的文件名并原子落盘。
///
/// 命名采用 时间戳 + 随机后缀 一种策略：
/// `result_{原名}_{YYYYMMDD_HHMMSS}_{8位十六进制}.{扩展名}`。
/// 最终路径用 `create_new` 独占创建来预留，彻底关闭
/// 「先检查后创建」的并发竞态；撞名时换随机后缀重试。
///
/// 图像先编码到同目录的临时文件，再原子重命名覆盖预留位，
/// 因此目录里永远不会出现半写的结果文件。
pub struct OutputNamer {
  directory: PathBuf,
}

impl OutputNamer {
  pub fn new(directory: PathBuf) -> Self {
    Self { directory }
  }

  /// 由源文件名推导落盘名，预留路径后原子写入图像。
  ///
  /// 成功返回最终路径；失败时不留下任何部分写入的文件。
  pub fn save_image(&self, image: &RgbImage, source_name: &Path) -> Result<PathBuf, OutputError> {
    let stem = source_name
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or("image");
    let extension = source_name
      .extension()
      .and_then(|s| s.to_str())
      .map(str::to_lowercase)
      .filter(|ext| ImageFormat::from_extension(ext).is_some())
      .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    // 上面已筛掉未知扩展名
    let format = match ImageFormat::from_extension(&extension) {
      Some(format) => format,
      None => ImageFormat::Png,
    };

    self.save_with_names(image, format, || Self::fresh_name(stem, &extension))
  }

  /// 时间戳加随机后缀的候选名
  fn fresh_name(stem: &str, extension: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let token: u32 = rand::random();
    format!("result_{stem}_{timestamp}_{token:08x}.{extension}")
  }

  /// 落盘主体，候选名由闭包提供（撞名时再次调用取下一个）
  fn save_with_names(
    &self,
    image: &RgbImage,
    format: ImageFormat,
    names: impl FnMut() -> String,
  ) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(&self.directory)
      .map_err(|e| OutputError::DirectoryUnavailable(self.directory.clone(), e))?;

    let (final_path, name) = self.reserve(names)?;

    let tmp_path = self.directory.join(format!(".{name}.tmp"));
    if let Err(e) = image.save_with_format(&tmp_path, format) {
      let _ = std::fs::remove_file(&tmp_path);
      let _ = std::fs::remove_file(&final_path);
      return Err(OutputError::Encode(e));
    }

    if let Err(e) = std::fs::rename(&tmp_path, &final_path) {
      let _ = std::fs::remove_file(&tmp_path);
      let _ = std::fs::remove_file(&final_path);
      return Err(OutputError::Io(e));
    }

    debug!("结果图像已写入: {}", final_path.display());
    Ok(final_path)
  }

  /// 独占创建一个空文件占住最终路径；撞名换下一个候选名重试
  fn reserve(&self, mut names: impl FnMut() -> String) -> Result<(PathBuf, String), OutputError> {
    for _ in 0..NAME_RETRY_BUDGET {
      let name = names();
      let path = self.directory.join(&name);

      match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => return Ok((path, name)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
          warn!("输出命名冲突，重试: {}", name);
          continue;
        }
        Err(e) => return Err(OutputError::Io(e)),
      }
    }

    Err(OutputError::NameExhausted(NAME_RETRY_BUDGET))
  }
}
