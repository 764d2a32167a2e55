// 该文件是 Tushi （图识） 项目的一部分。
// src/decode.rs - 原始输出解码
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

use tracing::debug;

use crate::detector::{BOX_FIELDS, RawLayer};
use crate::tensor::SourceShape;

/// 轴对齐边界框，绝对像素坐标。
///
/// 坐标不保证落在图像范围内：解码只做几何映射，
/// 裁剪推迟到绘制阶段（数据层保留网络的原始预测）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
  /// 左上角 x 坐标
  pub x: f32,
  /// 左上角 y 坐标
  pub y: f32,
  /// 宽度
  pub width: f32,
  /// 高度
  pub height: f32,
}

impl BBox {
  pub fn area(&self) -> f32 {
    self.width * self.height
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }
}

/// 候选检测：边界框、类别与置信度
#[derive(Debug, Clone)]
pub struct Candidate {
  pub bbox: BBox,
  pub class_id: usize,
  pub confidence: f32,
}

/// 把各输出层的原始行解码为候选检测。
///
/// 每行取 `class_id = argmax(scores)`、`confidence = scores[class_id]`，
/// 低于阈值的行直接丢弃；全零分数行同样被丢弃，不是错误。
/// 归一化的 `(cx, cy, w, h)` 乘以原图尺寸（不是张量尺寸）得到绝对
/// 像素坐标，再换算出左上角。输出顺序不承载任何含义。
pub fn decode_layers(
  layers: &[RawLayer],
  source: SourceShape,
  confidence_threshold: f32,
) -> Vec<Candidate> {
  let width = source.width as f32;
  let height = source.height as f32;

  let mut candidates = Vec::new();

  for layer in layers {
    for row in layer.rows() {
      let scores = &row[BOX_FIELDS..];

      let (class_id, confidence) = match argmax(scores) {
        Some(found) => found,
        None => continue,
      };

      if confidence < confidence_threshold {
        continue;
      }

      let cx = row[0] * width;
      let cy = row[1] * height;
      let w = row[2] * width;
      let h = row[3] * height;

      candidates.push(Candidate {
        bbox: BBox {
          x: cx - w / 2.0,
          y: cy - h / 2.0,
          width: w,
          height: h,
        },
        class_id,
        confidence,
      });
    }
  }

  debug!("解码得到 {} 个候选", candidates.len());
  candidates
}

/// 最高分类别；相同分数取索引较小者
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, &score) in scores.iter().enumerate() {
    match best {
      Some((_, max)) if score <= max => {}
      _ => best = Some((idx, score)),
    }
  }
  best
}

#[cfg(test)]
mod tests {
  use super::*;

  fn layer(rows: &[&[f32]]) -> RawLayer {
    let row_len = rows[0].len();
    let data: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    RawLayer::new(data, row_len).unwrap()
  }

  const SOURCE: SourceShape = SourceShape {
    width: 200,
    height: 100,
  };

  #[test]
  fn maps_normalized_center_box_to_pixel_corner() {
    // cx=0.5, cy=0.5, w=0.2, h=0.4，类别 1 分数 0.9
    let layers = [layer(&[&[0.5, 0.5, 0.2, 0.4, 0.1, 0.9]])];
    let candidates = decode_layers(&layers, SOURCE, 0.5);

    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.class_id, 1);
    assert!((c.confidence - 0.9).abs() < 1e-6);
    // 原图 200x100: cx=100, w=40 → x=80; cy=50, h=40 → y=30
    assert!((c.bbox.x - 80.0).abs() < 1e-4);
    assert!((c.bbox.y - 30.0).abs() < 1e-4);
    assert!((c.bbox.width - 40.0).abs() < 1e-4);
    assert!((c.bbox.height - 40.0).abs() < 1e-4);
  }

  #[test]
  fn below_threshold_rows_dropped() {
    let layers = [layer(&[
      &[0.5, 0.5, 0.2, 0.2, 0.3, 0.1],
      &[0.5, 0.5, 0.2, 0.2, 0.6, 0.2],
    ])];
    let candidates = decode_layers(&layers, SOURCE, 0.5);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].class_id, 0);
  }

  #[test]
  fn survivors_meet_threshold_invariant() {
    let layers = [layer(&[
      &[0.2, 0.2, 0.1, 0.1, 0.49, 0.0],
      &[0.4, 0.4, 0.1, 0.1, 0.50, 0.0],
      &[0.6, 0.6, 0.1, 0.1, 0.95, 0.0],
    ])];
    let candidates = decode_layers(&layers, SOURCE, 0.5);
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| c.confidence >= 0.5));
  }

  #[test]
  fn all_zero_scores_dropped_silently() {
    let layers = [layer(&[&[0.5, 0.5, 0.2, 0.2, 0.0, 0.0, 0.0]])];
    assert!(decode_layers(&layers, SOURCE, 0.5).is_empty());
  }

  #[test]
  fn empty_layers_yield_no_candidates() {
    assert!(decode_layers(&[], SOURCE, 0.5).is_empty());
  }

  #[test]
  fn argmax_prefers_first_on_tie() {
    assert_eq!(argmax(&[0.4, 0.9, 0.9]), Some((1, 0.9)));
    assert_eq!(argmax(&[]), None);
  }
}
