// 该文件是 Tushi （图识） 项目的一部分。
// src/pipeline.rs - 检测流水线编排
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
use std::sync::Mutex;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::annotate::Annotator;
use crate::config::DetectConfig;
use crate::decode::{Candidate, decode_layers};
use crate::detector::Detector;
use crate::labels::LabelTable;
use crate::nms::suppress;
use crate::output::{OutputError, OutputNamer};
use crate::preprocess::{PreprocessError, Preprocessor};

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("图像加载错误: {0}")]
  ImageLoad(#[from] image::ImageError),
  #[error("无效图像: {0}")]
  InvalidImage(#[from] PreprocessError),
  #[error("推理错误: {0}")]
  Inference(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("输出错误: {0}")]
  Output(#[from] OutputError),
}

/// 检测流水线：预处理 → 推理 → 解码 → NMS → 标注 → 落盘。
///
/// 进程启动时构造一次（模型资产与标签已就绪），之后以共享引用
/// 服务所有请求。推理后端不假定可重入，`infer` 调用经内部互斥锁
/// 串行化；其余阶段只读共享状态，天然并发安全。
pub struct DetectPipeline<M> {
  detector: Mutex<M>,
  labels: LabelTable,
  preprocessor: Preprocessor,
  annotator: Annotator,
  namer: OutputNamer,
  confidence_threshold: f32,
  nms_threshold: f32,
}

impl<M: Detector> DetectPipeline<M> {
  pub fn new(detector: M, labels: LabelTable, config: DetectConfig) -> Self {
    let annotator = Annotator::new(labels.len());
    Self {
      detector: Mutex::new(detector),
      preprocessor: Preprocessor::new(config.input_size),
      annotator,
      namer: OutputNamer::new(config.output_dir),
      confidence_threshold: config.confidence_threshold,
      nms_threshold: config.nms_threshold,
      labels,
    }
  }

  /// 对一个图像文件执行完整检测，返回结果图像的路径。
  ///
  /// 零检测不是错误：此时写出的是原图的未修改副本。
  /// 任何失败都不会在输出目录留下部分写入的文件。
  pub fn detect(&self, image_path: &Path) -> Result<PathBuf, DetectError> {
    info!("处理检测请求: {}", image_path.display());

    // 不信任扩展名，内容无法解码一律报图像加载错误
    let image = image::open(image_path)?.into_rgb8();

    let detections = self.run_on_image(&image)?;
    info!("检测到 {} 个对象", detections.len());
    for detection in &detections {
      debug!(
        "  - {}: {:.2} at ({:.0}, {:.0}, {:.0}x{:.0})",
        self.labels.name(detection.class_id),
        detection.confidence,
        detection.bbox.x,
        detection.bbox.y,
        detection.bbox.width,
        detection.bbox.height
      );
    }

    let annotated = self.annotator.annotate(&image, &detections, &self.labels);

    let source_name = image_path
      .file_name()
      .map(Path::new)
      .unwrap_or_else(|| Path::new("image.png"));
    let output_path = self.namer.save_image(&annotated, source_name)?;

    info!("输出文件: {}", output_path.display());
    Ok(output_path)
  }

  /// 流水线的纯计算部分：已解码图像 → 幸存的检测集合
  pub fn run_on_image(&self, image: &RgbImage) -> Result<Vec<Candidate>, DetectError> {
    let (tensor, source) = self.preprocessor.run(image)?;

    let layers = {
      let detector = match self.detector.lock() {
        Ok(guard) => guard,
        // 后端在调用间不保有不变量，毒锁直接恢复
        Err(poisoned) => poisoned.into_inner(),
      };
      detector
        .infer(&tensor)
        .map_err(|e| DetectError::Inference(Box::new(e)))?
    };

    let candidates = decode_layers(&layers, source, self.confidence_threshold);
    Ok(suppress(candidates, self.nms_threshold))
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }
}
