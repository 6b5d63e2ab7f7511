// 该文件是 Guanlan （观澜） 项目的一部分。
// src/probe.rs - 运行环境探针
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

use ffmpeg_next as ffmpeg;
use serde_json::{Value, json};

use crate::device;

/// 已知的探针名
pub const PROBE_NAMES: [&str; 3] = ["cuda", "video", "inference"];

/// 字段取值来源：固定值，或零参的一次性查询
///
/// 查询失败一律归并为 "unknown"，不向外抛错。
pub enum FieldSource {
  Fixed(&'static str),
  Query(fn() -> Option<String>),
}

impl FieldSource {
  pub fn resolve(&self) -> String {
    match self {
      FieldSource::Fixed(value) => (*value).to_string(),
      FieldSource::Query(query) => query().unwrap_or_else(|| "unknown".to_string()),
    }
  }
}

/// 单个探针的状态记录
///
/// 探测永不失败：能力不可用体现在 available 与各字段里，
/// 而不是错误。
pub struct ProbeStatus {
  pub name: &'static str,
  pub available: bool,
  pub version: String,
  pub device_name: String,
  pub capability: String,
  pub memory_mib: Option<u64>,
}

impl ProbeStatus {
  pub fn to_json(&self) -> Value {
    json!({
      "name": self.name,
      "available": self.available,
      "version": self.version,
      "device_name": self.device_name,
      "capability": self.capability,
      "memory_mib": self.memory_mib,
    })
  }

  /// 单行文本形式，便于人工读取
  pub fn summary(&self) -> String {
    let memory = match self.memory_mib {
      Some(mib) => format!("{} MiB", mib),
      None => "unknown".to_string(),
    };
    if self.available {
      format!(
        "{}: OK（版本 {}，设备 {}，能力 {}，显存 {}）",
        self.name, self.version, self.device_name, self.capability, memory
      )
    } else {
      format!("{}: 不可用（版本 {}）", self.name, self.version)
    }
  }
}

/// 按名字运行探针；未知名字返回 None
pub fn run_probe(name: &str) -> Option<ProbeStatus> {
  match name {
    "cuda" => Some(cuda_probe()),
    "video" => Some(video_probe()),
    "inference" => Some(inference_probe()),
    _ => None,
  }
}

/// CUDA 加速器探针
fn cuda_probe() -> ProbeStatus {
  let available = device::accelerator_available();
  ProbeStatus {
    name: "cuda",
    available,
    // ort 不透出驱动版本，保持 unknown 而不是猜测
    version: FieldSource::Query(|| None).resolve(),
    device_name: FieldSource::Fixed(if available { "cuda:0" } else { "none" }).resolve(),
    capability: FieldSource::Fixed("execution-provider").resolve(),
    memory_mib: None,
  }
}

/// 视频解码后端探针
fn video_probe() -> ProbeStatus {
  let available = ffmpeg::init().is_ok();
  ProbeStatus {
    name: "video",
    available,
    version: FieldSource::Query(ffmpeg_version).resolve(),
    device_name: FieldSource::Fixed("software").resolve(),
    capability: FieldSource::Fixed("decode").resolve(),
    memory_mib: None,
  }
}

/// 推理运行时探针
fn inference_probe() -> ProbeStatus {
  let available = ort::session::Session::builder().is_ok();
  ProbeStatus {
    name: "inference",
    available,
    version: FieldSource::Query(|| None).resolve(),
    device_name: FieldSource::Fixed("onnxruntime").resolve(),
    capability: FieldSource::Query(inference_capability).resolve(),
    memory_mib: None,
  }
}

fn ffmpeg_version() -> Option<String> {
  ffmpeg::init().ok()?;
  let version = ffmpeg::util::version();
  Some(format!(
    "{}.{}.{}",
    version >> 16,
    (version >> 8) & 0xff,
    version & 0xff
  ))
}

fn inference_capability() -> Option<String> {
  Some(if device::accelerator_available() {
    "cuda,cpu".to_string()
  } else {
    "cpu".to_string()
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fixed_fields_resolve_to_their_value() {
    assert_eq!(FieldSource::Fixed("decode").resolve(), "decode");
  }

  #[test]
  fn failed_queries_collapse_to_unknown() {
    assert_eq!(FieldSource::Query(|| None).resolve(), "unknown");
    assert_eq!(
      FieldSource::Query(|| Some("7.1.0".to_string())).resolve(),
      "7.1.0"
    );
  }

  #[test]
  fn every_known_probe_produces_a_record() {
    for name in PROBE_NAMES {
      let status = run_probe(name).expect("已知探针必须有记录");
      assert_eq!(status.name, name);
      // 记录永远可以序列化，不可用也不例外
      let value = status.to_json();
      assert!(value.get("available").is_some());
      assert!(value.get("memory_mib").is_some());
    }
  }

  #[test]
  fn unknown_probe_names_yield_none() {
    assert!(run_probe("tensorrt8").is_none());
  }

  #[test]
  fn summary_is_single_line() {
    for name in PROBE_NAMES {
      let status = run_probe(name).unwrap();
      assert!(!status.summary().contains('\n'));
    }
  }
}
