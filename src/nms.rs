// 该文件是 Tushi （图识） 项目的一部分。
// src/nms.rs - 非极大值抑制
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

use crate::decode::{BBox, Candidate};

/// 两个轴对齐边界框的交并比。
///
/// 零面积框与任何框的 IoU 记为 0，避免除零。
pub fn iou(a: &BBox, b: &BBox) -> f32 {
  let x1 = a.x.max(b.x);
  let y1 = a.y.max(b.y);
  let x2 = a.right().min(b.right());
  let y2 = a.bottom().min(b.bottom());

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.area() + b.area() - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

/// 贪心非极大值抑制，跨类别联合进行（class-agnostic）。
///
/// 不分类别联合抑制是沿袭原实现的有意简化：很多检测器按类别
/// 分别抑制，这里保持与原行为一致。
///
/// 按置信度降序取最高者保留，抑制所有与之 IoU ≥ `nms_threshold`
/// 的未访问候选，如此往复。稳定排序保证同分候选按先见顺序取胜，
/// 因而相同输入的结果确定。返回的幸存集按置信度降序排列。
pub fn suppress(candidates: Vec<Candidate>, nms_threshold: f32) -> Vec<Candidate> {
  let mut order: Vec<usize> = (0..candidates.len()).collect();
  order.sort_by(|&a, &b| candidates[b].confidence.total_cmp(&candidates[a].confidence));

  let mut suppressed = vec![false; candidates.len()];
  let mut kept = Vec::new();

  for (pos, &idx) in order.iter().enumerate() {
    if suppressed[idx] {
      continue;
    }
    let best = &candidates[idx];

    for &other in &order[pos + 1..] {
      if suppressed[other] {
        continue;
      }
      if iou(&best.bbox, &candidates[other].bbox) >= nms_threshold {
        suppressed[other] = true;
      }
    }

    kept.push(best.clone());
  }

  debug!("NMS: {} 个候选 -> {} 个保留", suppressed.len(), kept.len());
  kept
}

#[cfg(test)]
mod tests {
  use super::*;

  fn candidate(x: f32, y: f32, w: f32, h: f32, confidence: f32, class_id: usize) -> Candidate {
    Candidate {
      bbox: BBox {
        x,
        y,
        width: w,
        height: h,
      },
      class_id,
      confidence,
    }
  }

  #[test]
  fn overlapping_pair_keeps_higher_confidence() {
    // IoU ≈ 0.78，阈值 0.4 → 仅 0.9 幸存
    let input = vec![
      candidate(10.0, 10.0, 50.0, 50.0, 0.9, 0),
      candidate(12.0, 12.0, 50.0, 50.0, 0.8, 0),
    ];
    let kept = suppress(input, 0.4);
    assert_eq!(kept.len(), 1);
    assert!((kept[0].confidence - 0.9).abs() < 1e-6);
  }

  #[test]
  fn disjoint_boxes_both_survive() {
    let input = vec![
      candidate(0.0, 0.0, 10.0, 10.0, 0.6, 0),
      candidate(100.0, 100.0, 10.0, 10.0, 0.9, 1),
    ];
    let kept = suppress(input, 0.01);
    assert_eq!(kept.len(), 2);
  }

  #[test]
  fn suppression_is_class_agnostic() {
    // 类别不同也会相互抑制
    let input = vec![
      candidate(10.0, 10.0, 50.0, 50.0, 0.9, 0),
      candidate(12.0, 12.0, 50.0, 50.0, 0.8, 5),
    ];
    let kept = suppress(input, 0.4);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].class_id, 0);
  }

  #[test]
  fn confidence_tie_prefers_first_seen() {
    let input = vec![
      candidate(10.0, 10.0, 50.0, 50.0, 0.8, 1),
      candidate(12.0, 12.0, 50.0, 50.0, 0.8, 2),
    ];
    let kept = suppress(input, 0.4);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].class_id, 1);
  }

  #[test]
  fn survivors_ordered_by_descending_confidence() {
    let input = vec![
      candidate(0.0, 0.0, 10.0, 10.0, 0.55, 0),
      candidate(200.0, 0.0, 10.0, 10.0, 0.95, 1),
      candidate(0.0, 200.0, 10.0, 10.0, 0.75, 2),
    ];
    let kept = suppress(input, 0.4);
    let confidences: Vec<f32> = kept.iter().map(|c| c.confidence).collect();
    assert_eq!(confidences, vec![0.95, 0.75, 0.55]);
  }

  #[test]
  fn survivor_pairs_respect_iou_bound() {
    let input = vec![
      candidate(0.0, 0.0, 40.0, 40.0, 0.9, 0),
      candidate(10.0, 10.0, 40.0, 40.0, 0.8, 0),
      candidate(30.0, 30.0, 40.0, 40.0, 0.7, 0),
      candidate(90.0, 90.0, 40.0, 40.0, 0.6, 0),
    ];
    let threshold = 0.3;
    let kept = suppress(input, threshold);
    for (i, a) in kept.iter().enumerate() {
      for b in &kept[i + 1..] {
        assert!(iou(&a.bbox, &b.bbox) < threshold);
      }
    }
  }

  #[test]
  fn zero_area_box_has_zero_iou() {
    let degenerate = BBox {
      x: 10.0,
      y: 10.0,
      width: 0.0,
      height: 0.0,
    };
    assert_eq!(iou(&degenerate, &degenerate), 0.0);

    let normal = BBox {
      x: 0.0,
      y: 0.0,
      width: 20.0,
      height: 20.0,
    };
    assert_eq!(iou(&degenerate, &normal), 0.0);
  }

  #[test]
  fn deterministic_across_runs() {
    let input = vec![
      candidate(10.0, 10.0, 50.0, 50.0, 0.9, 0),
      candidate(12.0, 12.0, 50.0, 50.0, 0.8, 1),
      candidate(100.0, 100.0, 30.0, 30.0, 0.7, 2),
    ];
    let first = suppress(input.clone(), 0.4);
    let second = suppress(input, 0.4);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
      assert_eq!(a.class_id, b.class_id);
      assert_eq!(a.bbox, b.bbox);
    }
  }

  #[test]
  fn empty_input_yields_empty_output() {
    assert!(suppress(Vec::new(), 0.4).is_empty());
  }
}
