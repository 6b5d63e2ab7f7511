// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/display.rs - 实时预览窗口
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

use std::time::Duration;

use image::RgbImage;
use minifb::{Key, Window, WindowOptions};
use tracing::debug;

use super::Present;
use crate::error::DemoError;

/// 每次 present 允许的事件泵等待上限，即一个显示节拍
const DISPLAY_TICK: Duration = Duration::from_millis(1);

/// 基于 minifb 的预览窗口
///
/// 窗口在确认视频流可以打开之后才创建；创建失败（无图形环境）
/// 属于环境错误。表面随 Drop 销毁，销毁恰好一次。
pub struct DisplayWindow {
  window: Window,
  /// 0RGB 打包缓冲，按帧复用
  buffer: Vec<u32>,
  width: usize,
  height: usize,
}

impl DisplayWindow {
  /// 创建标题窗口
  pub fn create(title: &str, width: u32, height: u32) -> Result<Self, DemoError> {
    let mut window = Window::new(
      title,
      width as usize,
      height as usize,
      WindowOptions::default(),
    )
    .map_err(|e| DemoError::Environment(e.to_string()))?;

    window.limit_update_rate(Some(DISPLAY_TICK));

    Ok(Self {
      window,
      buffer: vec![0; (width as usize) * (height as usize)],
      width: width as usize,
      height: height as usize,
    })
  }
}

impl Present for DisplayWindow {
  fn present(&mut self, image: &RgbImage) -> Result<(), DemoError> {
    // RGB24 打包为 minifb 要求的 0RGB u32
    for (dst, pixel) in self.buffer.iter_mut().zip(image.pixels()) {
      *dst = ((pixel[0] as u32) << 16) | ((pixel[1] as u32) << 8) | (pixel[2] as u32);
    }

    self
      .window
      .update_with_buffer(&self.buffer, self.width, self.height)
      .map_err(|e| DemoError::Environment(e.to_string()))
  }

  fn quit_requested(&self) -> bool {
    !self.window.is_open()
      || self.window.is_key_down(Key::Q)
      || self.window.is_key_down(Key::Escape)
  }
}

impl Drop for DisplayWindow {
  fn drop(&mut self) {
    debug!("显示窗口已销毁");
  }
}
