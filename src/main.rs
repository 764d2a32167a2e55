// 该文件是 Tushi （图识） 项目的一部分。
// src/main.rs - 命令行入口
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use tushi::config::{
  DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIZE, DEFAULT_NMS_THRESHOLD, DetectConfig,
};
use tushi::detector::{ModelArtifacts, ReplayDetector};
use tushi::pipeline::DetectPipeline;

/// Tushi 检测后处理流水线
///
/// 推理输出来自回放文件（真实引擎一次运行的记录），
/// 模型资产在启动时加载一次并校验。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 网络拓扑配置文件路径
  #[arg(long, value_name = "FILE")]
  pub model_config: PathBuf,

  /// 模型权重文件路径
  #[arg(long, value_name = "FILE")]
  pub model_weights: PathBuf,

  /// 类别名称文件路径（每行一个类别）
  #[arg(long, value_name = "FILE")]
  pub names: PathBuf,

  /// 推理输出回放文件路径（JSON）
  #[arg(long, value_name = "FILE")]
  pub layers: PathBuf,

  /// 输入图像路径
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,

  /// 结果图像输出目录
  #[arg(long, value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_NMS_THRESHOLD, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 模型输入边长
  #[arg(long, default_value_t = DEFAULT_INPUT_SIZE, value_name = "SIZE")]
  pub input_size: u32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型配置: {}", args.model_config.display());
  info!("模型权重: {}", args.model_weights.display());
  info!("标签文件: {}", args.names.display());
  info!("输入图像: {}", args.input.display());
  info!("输出目录: {}", args.output_dir.display());

  // 阈值与模型资产问题都是致命的启动错误
  let config = DetectConfig::new(
    args.confidence,
    args.nms_threshold,
    args.input_size,
    args.output_dir,
  )?;
  let artifacts = ModelArtifacts::load(&args.model_config, &args.model_weights, &args.names)?;
  let detector = ReplayDetector::from_dump(&args.layers)?;

  let pipeline = DetectPipeline::new(detector, artifacts.labels, config);

  let now = std::time::Instant::now();
  let output_path = pipeline.detect(&args.input)?;
  info!("处理完成，耗时: {:.2?}", now.elapsed());
  info!("输出文件: {}", output_path.display());

  Ok(())
}
