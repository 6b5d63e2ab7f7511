// 该文件是 Guanlan （观澜） 项目的一部分。
// src/output/mod.rs - 显示输出模块
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

mod display;
mod visualizer;

pub use display::DisplayWindow;
pub use visualizer::Visualizer;

use image::RgbImage;

use crate::error::DemoError;

/// 显示端
///
/// present 一帧后以有界等待泵一次事件；随后可查询是否收到
/// 退出请求。串流循环只依赖这个接口。
pub trait Present {
  /// 显示一帧
  fn present(&mut self, image: &RgbImage) -> Result<(), DemoError>;

  /// 上一次 present 之后是否收到退出请求（q、ESC 或窗口被关闭）
  fn quit_requested(&self) -> bool;
}
