// 该文件是 Guanlan （观澜） 项目的一部分。
// src/bin/probe.rs - 运行环境探针入口
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

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use guanlan::probe;

/// 运行环境探针并输出状态记录
///
/// 探测永不失败：能力不可用体现在输出字段里，进程总是以 0 退出。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 要运行的探针名（默认全部：cuda video inference）
  #[arg(value_name = "PROBE")]
  pub probes: Vec<String>,

  /// 以 JSON 行输出（默认人读文本）
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  let crash_log_dir = std::env::var_os("GUANLAN_LOG_DIR").map(PathBuf::from);
  guanlan::logging::init(crash_log_dir.as_deref())?;

  let args = Args::parse();
  let names: Vec<String> = if args.probes.is_empty() {
    probe::PROBE_NAMES.iter().map(|s| s.to_string()).collect()
  } else {
    args.probes
  };

  for name in &names {
    match probe::run_probe(name) {
      Some(status) => {
        if args.json {
          println!("{}", status.to_json());
        } else {
          println!("{}", status.summary());
        }
      }
      None => warn!("未知的探针: {}", name),
    }
  }

  Ok(())
}
