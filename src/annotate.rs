// 该文件是 Tushi （图识） 项目的一部分。
// src/annotate.rs - 检测结果标注
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::decode::Candidate;
use crate::labels::LabelTable;

/// 标签文本距框上沿的高度
const LABEL_TEXT_HEIGHT: i32 = 20;

/// 标注器：把检测结果画到原图的副本上。
///
/// 每个检测画一个 2 像素的空心矩形和 `"{名称} {置信度:.2}"` 文本，
/// 文本位于框上沿上方并钳制到画布内（y 不会为负）。
/// 框与文本的几何在绘制时钳制到图像范围，数据层的坐标保持原样。
/// 输入图像从不被修改。
pub struct Annotator {
  /// 字体
  font: FontArc,
  /// 字体大小
  font_scale: PxScale,
  /// 类别颜色表
  colors: Vec<Rgb<u8>>,
}

impl Annotator {
  /// 按类别数量生成颜色表；字体使用内嵌的 DejaVuSans
  pub fn new(num_classes: usize) -> Self {
    let font_data = include_bytes!("../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载内嵌字体");

    let num = num_classes.max(1);
    let colors: Vec<Rgb<u8>> = (0..num)
      .map(|i| {
        let hue = (i as f32 / num as f32) * 360.0;
        Self::hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font,
      font_scale: PxScale::from(16.0),
      colors,
    }
  }

  /// HSV 转 RGB
  fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
      (c, x, 0.0)
    } else if h < 120.0 {
      (x, c, 0.0)
    } else if h < 180.0 {
      (0.0, c, x)
    } else if h < 240.0 {
      (0.0, x, c)
    } else if h < 300.0 {
      (x, 0.0, c)
    } else {
      (c, 0.0, x)
    };

    Rgb([
      ((r + m) * 255.0) as u8,
      ((g + m) * 255.0) as u8,
      ((b + m) * 255.0) as u8,
    ])
  }

  /// 在原图的副本上绘制检测结果并返回副本。
  ///
  /// 没有检测时返回逐像素一致的副本。
  pub fn annotate(
    &self,
    image: &RgbImage,
    detections: &[Candidate],
    labels: &LabelTable,
  ) -> RgbImage {
    let mut output = image.clone();
    debug!("标注 {} 个检测", detections.len());

    for detection in detections {
      let color = self.colors[detection.class_id % self.colors.len()];
      let bbox = &detection.bbox;

      // 绘制时钳制到画布范围；钳制后为空的检测整体跳过，
      // 完全在画布外的框不画边框也不画标签
      let x0 = bbox.x.max(0.0);
      let y0 = bbox.y.max(0.0);
      let x1 = bbox.right().min(output.width() as f32);
      let y1 = bbox.bottom().min(output.height() as f32);
      if x1 <= x0 || y1 <= y0 {
        continue;
      }

      let x = x0 as i32;
      let y = y0 as i32;
      let width = (x1 - x0) as u32;
      let height = (y1 - y0) as u32;
      if width == 0 || height == 0 {
        continue;
      }

      let rect = Rect::at(x, y).of_size(width, height);
      draw_hollow_rect_mut(&mut output, rect, color);

      // 第二个边框加粗，提升可见度
      if width > 2 && height > 2 {
        let inner =
          Rect::at(x + 1, y + 1).of_size(width.saturating_sub(2), height.saturating_sub(2));
        draw_hollow_rect_mut(&mut output, inner, color);
      }

      let label = format!("{} {:.2}", labels.name(detection.class_id), detection.confidence);
      // 文本位于框上方，钳制到画布内
      let text_y = (y - LABEL_TEXT_HEIGHT).max(0);

      draw_text_mut(
        &mut output,
        color,
        x,
        text_y,
        self.font_scale,
        &self.font,
        &label,
      );
    }

    output
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decode::BBox;

  fn candidate(x: f32, y: f32, w: f32, h: f32) -> Candidate {
    Candidate {
      bbox: BBox {
        x,
        y,
        width: w,
        height: h,
      },
      class_id: 0,
      confidence: 0.9,
    }
  }

  #[test]
  fn zero_detections_yield_identical_copy() {
    let image = RgbImage::from_pixel(32, 32, Rgb([10, 20, 30]));
    let annotator = Annotator::new(3);
    let labels = LabelTable::from_lines("a\nb\nc");

    let output = annotator.annotate(&image, &[], &labels);

    assert_eq!(output.as_raw(), image.as_raw());
  }

  #[test]
  fn input_image_is_never_mutated() {
    let image = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
    let before = image.clone();
    let annotator = Annotator::new(1);
    let labels = LabelTable::from_lines("thing");

    let _ = annotator.annotate(&image, &[candidate(10.0, 10.0, 30.0, 30.0)], &labels);

    assert_eq!(image.as_raw(), before.as_raw());
  }

  #[test]
  fn drawing_changes_pixels_on_box_edge() {
    let image = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
    let annotator = Annotator::new(1);
    let labels = LabelTable::from_lines("thing");

    let output = annotator.annotate(&image, &[candidate(10.0, 30.0, 30.0, 20.0)], &labels);

    // 框上沿应被染色
    assert_ne!(output.get_pixel(20, 30), &Rgb([0, 0, 0]));
  }

  #[test]
  fn fully_off_canvas_box_draws_nothing() {
    let image = RgbImage::from_pixel(32, 32, Rgb([5, 5, 5]));
    let annotator = Annotator::new(1);
    let labels = LabelTable::from_lines("thing");

    // 完全越过右、下、左上边界的框都不应留下任何痕迹（包括标签）
    let off_canvas = [
      candidate(40.0, 10.0, 20.0, 20.0),
      candidate(10.0, 40.0, 20.0, 20.0),
      candidate(-30.0, -30.0, 20.0, 20.0),
    ];
    for boxed in &off_canvas {
      let output = annotator.annotate(&image, std::slice::from_ref(boxed), &labels);
      assert_eq!(output.as_raw(), image.as_raw());
    }
  }

  #[test]
  fn out_of_bounds_box_is_clamped_not_panicking() {
    let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let annotator = Annotator::new(1);
    let labels = LabelTable::from_lines("thing");

    // 框越过画布边界，标签 y 也会为负
    let output = annotator.annotate(&image, &[candidate(-10.0, -10.0, 100.0, 100.0)], &labels);
    assert_eq!(output.dimensions(), (32, 32));
  }
}
