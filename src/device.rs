// 该文件是 Guanlan （观澜） 项目的一部分。
// src/device.rs - 推理设备解析
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

use tracing::{debug, warn};

/// 设备解析结果，串流开始前计算一次，之后不再变化
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSelection {
  /// 用户请求的原始字符串
  pub requested: String,
  /// 实际使用的设备标识
  pub resolved: String,
  /// 是否使用 CUDA 加速器
  pub uses_accelerator: bool,
}

impl DeviceSelection {
  /// CUDA 设备序号（cuda 或 cuda:N）；非 CUDA 设备返回 None
  pub fn cuda_ordinal(&self) -> Option<i32> {
    let lower = self.resolved.to_lowercase();
    let rest = lower.strip_prefix("cuda")?;
    if rest.is_empty() {
      return Some(0);
    }
    rest.strip_prefix(':')?.parse().ok()
  }
}

/// 查询 ort 的 CUDA 执行提供方是否可用
pub fn accelerator_available() -> bool {
  use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

  CUDAExecutionProvider::default().is_available().unwrap_or(false)
}

/// 解析请求的设备字符串
///
/// 空串和 auto 优先选择 CUDA；显式请求 CUDA 而不可用时打印一条
/// 警告并回退到 CPU。加速器不可用从不中止运行，只体现在返回的
/// 标志里。
pub fn resolve(requested: &str, accelerator_available: bool) -> DeviceSelection {
  let normalized = requested.trim().to_lowercase();

  let (resolved, uses_accelerator) = if normalized.is_empty() || normalized == "auto" {
    if accelerator_available {
      ("cuda:0".to_string(), true)
    } else {
      ("cpu".to_string(), false)
    }
  } else if normalized.starts_with("cuda") && !accelerator_available {
    warn!("请求了 CUDA 但当前不可用，回退到 CPU 运行");
    ("cpu".to_string(), false)
  } else {
    (requested.to_string(), normalized.starts_with("cuda"))
  };

  debug!(
    "设备请求 {:?} 解析为 {}（加速器: {}）",
    requested, resolved, uses_accelerator
  );

  DeviceSelection {
    requested: requested.to_string(),
    resolved,
    uses_accelerator,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn auto_without_accelerator_resolves_to_cpu() {
    let selection = resolve("auto", false);
    assert_eq!(selection.resolved, "cpu");
    assert!(!selection.uses_accelerator);
  }

  #[test]
  fn auto_with_accelerator_resolves_to_cuda0() {
    let selection = resolve("auto", true);
    assert_eq!(selection.resolved, "cuda:0");
    assert!(selection.uses_accelerator);
  }

  #[test]
  fn empty_request_behaves_like_auto() {
    let selection = resolve("", true);
    assert_eq!(selection.resolved, "cuda:0");
    assert!(selection.uses_accelerator);

    let selection = resolve("  ", false);
    assert_eq!(selection.resolved, "cpu");
    assert!(!selection.uses_accelerator);
  }

  #[test]
  fn explicit_cuda_unavailable_falls_back_to_cpu() {
    // 回退是可恢复状况，不是错误
    let selection = resolve("cuda:0", false);
    assert_eq!(selection.requested, "cuda:0");
    assert_eq!(selection.resolved, "cpu");
    assert!(!selection.uses_accelerator);
  }

  #[test]
  fn explicit_cuda_available_is_honored_verbatim() {
    let selection = resolve("cuda:1", true);
    assert_eq!(selection.resolved, "cuda:1");
    assert!(selection.uses_accelerator);
    assert_eq!(selection.cuda_ordinal(), Some(1));
  }

  #[test]
  fn other_strings_are_honored_without_accelerator_flag() {
    let selection = resolve("cpu", true);
    assert_eq!(selection.resolved, "cpu");
    assert!(!selection.uses_accelerator);
    assert_eq!(selection.cuda_ordinal(), None);
  }

  #[test]
  fn cuda_ordinal_defaults_to_zero_without_suffix() {
    let selection = resolve("cuda", true);
    assert_eq!(selection.cuda_ordinal(), Some(0));
  }

  #[test]
  fn auto_is_case_insensitive() {
    let selection = resolve("AUTO", false);
    assert_eq!(selection.resolved, "cpu");
    assert!(!selection.uses_accelerator);
  }
}
