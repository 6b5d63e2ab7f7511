// 该文件是 Guanlan （观澜） 项目的一部分。
// src/detector/mod.rs - 目标检测模块
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

mod yolo;

pub use yolo::{COCO_CLASSES, YoloDetector};

use image::RgbImage;

use crate::error::DemoError;

/// 检测结果，坐标为原始帧上的像素值
#[derive(Clone, Debug)]
pub struct Detection {
  /// 边界框左上角 x 坐标
  pub x: f32,
  /// 边界框左上角 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 置信度
  pub confidence: f32,
  /// 类别索引
  pub class_id: usize,
  /// 类别名称
  pub class_name: String,
}

/// 推理能力
///
/// 给一帧与置信度阈值，返回零个或多个检测；返回空集是正常
/// 结果，不是故障。
pub trait Detect {
  fn infer(&mut self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DemoError>;
}
