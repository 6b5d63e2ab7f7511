// 该文件是 Guanlan （观澜） 项目的一部分。
// src/error.rs - 错误分类定义
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

use thiserror::Error;

/// 流水线错误分类
///
/// 每个变体对应一类启动或运行期失败，并映射到独立的退出码。
/// 用户取消（按键、关窗或中断信号）不是错误，见 `pipeline::Outcome`；
/// 请求的加速器不可用也不是错误，见 `device::resolve`。
#[derive(Error, Debug)]
pub enum DemoError {
  /// 配置错误：置信度越界、输入文件不存在等，在任何资源打开之前出现
  #[error("配置错误: {0}")]
  Config(String),

  /// 视频文件存在但无法作为视频流打开
  #[error("无法打开视频流 {path}: {cause:#}")]
  StreamOpen { path: PathBuf, cause: anyhow::Error },

  /// 无可用的显示环境
  #[error("无法创建显示窗口: {0}；请确认图形环境可用（例如 DISPLAY 变量）")]
  Environment(String),

  /// 必需的运行时能力（推理引擎、视频后端）加载失败
  #[error("运行时依赖加载失败: {0:#}")]
  Dependency(anyhow::Error),

  /// 流式循环内部传播出来的其他故障
  #[error("{0:#}")]
  Other(#[from] anyhow::Error),
}

impl DemoError {
  /// 进程退出码；正常完成与用户取消使用 0
  pub fn exit_code(&self) -> i32 {
    match self {
      DemoError::Config(_) => 2,
      DemoError::StreamOpen { .. } => 3,
      DemoError::Environment(_) => 4,
      DemoError::Dependency(_) => 5,
      DemoError::Other(_) => 1,
    }
  }
}
