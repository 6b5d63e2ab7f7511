// 该文件是 Guanlan （观澜） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

use crate::overlay::{OverlayMode, bundled_video_path};

/// Guanlan 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入视频文件路径（默认使用内置示例视频）
  #[arg(long, default_value_os_t = bundled_video_path(), value_name = "FILE")]
  pub video: PathBuf,

  /// YOLO ONNX 权重路径
  #[arg(long, default_value = "yolo11x.onnx", value_name = "WEIGHTS")]
  pub model: PathBuf,

  /// 推理设备（例如 cuda:0、cpu、auto）
  #[arg(long, default_value = "auto", value_name = "DEVICE")]
  pub device: String,

  /// 检测置信度阈值，取值范围 (0, 1]
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 最大处理帧数（0 表示整段视频）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,

  /// 显示窗口标题
  #[arg(long, default_value = "Guanlan YOLO11", value_name = "TITLE")]
  pub window_title: String,

  /// 是否在画面上绘制新的检测叠加；
  /// auto 在使用内置示例视频时跳过绘制（样例已烧录检测框）
  #[arg(long, value_enum, default_value = "auto", value_name = "MODE")]
  pub overlay_mode: OverlayMode,
}
