// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/visualizer.rs - 检测结果与帧率叠加绘制
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

use crate::detector::Detection;

/// 帧率文本的位置与颜色，与示例视频烧录的样式一致
const FPS_TEXT_POS: (i32, i32) = (10, 30);
const FPS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// 叠加绘制工具
pub struct Visualizer {
  font: FontArc,
  label_scale: PxScale,
  fps_scale: PxScale,
  /// 类别颜色映射（COCO 的 80 类）
  colors: Vec<Rgb<u8>>,
}

impl Default for Visualizer {
  fn default() -> Self {
    Self::new()
  }
}

impl Visualizer {
  pub fn new() -> Self {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载嵌入的字体文件");

    let colors = (0..80)
      .map(|i| hsv_to_rgb((i as f32 / 80.0) * 360.0, 0.8, 0.9))
      .collect();

    Self {
      font,
      label_scale: PxScale::from(16.0),
      fps_scale: PxScale::from(28.0),
      colors,
    }
  }

  /// 返回绘制了检测框与标签的副本，不修改传入的帧
  pub fn render(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut annotated = image.clone();
    self.draw_detections(&mut annotated, detections);
    annotated
  }

  /// 把帧率文本画到待显示的帧上
  pub fn overlay_fps(&self, image: &mut RgbImage, label: &str) {
    draw_text_mut(
      image,
      FPS_COLOR,
      FPS_TEXT_POS.0,
      FPS_TEXT_POS.1,
      self.fps_scale,
      &self.font,
      label,
    );
  }

  fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      let color = self.colors[detection.class_id % self.colors.len()];

      let x = detection.x.max(0.0) as i32;
      let y = detection.y.max(0.0) as i32;
      let width = detection
        .width
        .min(image.width() as f32 - detection.x.max(0.0)) as u32;
      let height = detection
        .height
        .min(image.height() as f32 - detection.y.max(0.0)) as u32;

      if width == 0 || height == 0 {
        continue;
      }

      draw_hollow_rect_mut(image, Rect::at(x, y).of_size(width, height), color);
      // 内圈再描一次，提升可见度
      if width > 2 && height > 2 {
        let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
        draw_hollow_rect_mut(image, inner, color);
      }

      let label = format!("{}: {:.2}", detection.class_name, detection.confidence);
      draw_text_mut(
        image,
        color,
        x,
        (y - 20).max(0),
        self.label_scale,
        &self.font,
        &label,
      );
    }
  }
}

/// HSV 转 RGB，用于按类别生成区分度较高的颜色
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
