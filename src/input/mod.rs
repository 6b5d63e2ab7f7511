// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input/mod.rs - 帧来源模块
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

mod video_source;

pub use video_source::VideoStream;

use std::time::Instant;

use image::RgbImage;

use crate::error::DemoError;

/// 帧记录：循环每轮产出一个，处理完即丢弃，不跨轮保留
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 单调递增的帧序号
  pub index: u64,
  /// 解码完成时刻
  pub captured_at: Instant,
}

/// 帧来源
///
/// 串流循环只通过这个接口取帧，便于测试时换成脚本化来源。
pub trait FrameRead {
  /// 读取下一帧；流结束时返回 None
  fn next_frame(&mut self) -> Result<Option<Frame>, DemoError>;

  /// 帧宽度
  fn width(&self) -> u32;

  /// 帧高度
  fn height(&self) -> u32;
}
