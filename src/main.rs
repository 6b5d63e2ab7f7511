// 该文件是 Guanlan （观澜） 项目的一部分。
// src/main.rs - 实时检测预览主程序
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
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use guanlan::args::Args;
use guanlan::pipeline::{self, Outcome, PipelineConfig};

/// 中断后等待资源释放的上限，超时强制退出
const RELEASE_GRACE: Duration = Duration::from_secs(10);

fn main() {
  // 崩溃日志目录在这里读取一次，作为显式配置传给日志层
  let crash_log_dir = std::env::var_os("GUANLAN_LOG_DIR").map(PathBuf::from);
  if let Err(e) = guanlan::logging::init(crash_log_dir.as_deref()) {
    eprintln!("日志初始化失败: {e:#}");
    process::exit(1);
  }

  let args = Args::parse();
  let config = PipelineConfig {
    video: args.video,
    model: args.model,
    device: args.device,
    confidence: args.confidence,
    max_frames: args.max_frames,
    window_title: args.window_title,
    overlay_mode: args.overlay_mode,
  };

  let interrupt = Arc::new(AtomicBool::new(false));
  {
    let interrupt = Arc::clone(&interrupt);
    if let Err(e) = ctrlc::set_handler(move || {
      if interrupt.swap(true, Ordering::Relaxed) {
        return;
      }
      info!("收到中断信号，准备退出...");
      // 释放卡死时的兜底退出
      thread::spawn(|| {
        thread::sleep(RELEASE_GRACE);
        warn!("资源释放超时，强制退出");
        process::exit(1);
      });
    }) {
      warn!("无法安装中断处理器: {}", e);
    }
  }

  match pipeline::run(&config, &interrupt) {
    Ok(Outcome::Completed) => info!("串流完成"),
    Ok(Outcome::Cancelled) => info!("串流已取消"),
    Err(e) => {
      error!("{e}");
      process::exit(e.exit_code());
    }
  }
}
