// 该文件是 Guanlan （观澜） 项目的一部分。
// src/logging.rs - 日志初始化
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

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// 初始化日志输出
///
/// 日志写到 stderr，诊断信息不与画面输出混在一起。
/// `crash_log_dir` 是显式传入的崩溃日志目录：设置后同一份日志
/// 同时落盘到按时间命名的文件里。目录由调用方（main 读取
/// GUANLAN_LOG_DIR）决定，这里不读取任何环境状态。
pub fn init(crash_log_dir: Option<&Path>) -> Result<()> {
  let writer = match crash_log_dir {
    Some(dir) => {
      fs::create_dir_all(dir).with_context(|| format!("无法创建日志目录: {}", dir.display()))?;
      let path = dir.join(format!("guanlan-{}.log", Utc::now().format("%Y%m%d-%H%M%S")));
      let file = fs::File::create(&path)
        .with_context(|| format!("无法创建日志文件: {}", path.display()))?;
      BoxMakeWriter::new(io::stderr.and(file))
    }
    None => BoxMakeWriter::new(io::stderr),
  };

  tracing_subscriber::fmt()
    .with_writer(writer)
    .with_ansi(crash_log_dir.is_none())
    .init();

  Ok(())
}
