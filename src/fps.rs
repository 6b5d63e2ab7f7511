// 该文件是 Guanlan （观澜） 项目的一部分。
// src/fps.rs - 平滑帧率估计
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

use std::time::Instant;

/// EMA 衰减系数：抑制逐帧推理耗时的抖动，同时在几十帧内
/// 跟上持续的帧率变化
const DECAY: f64 = 0.85;

/// 基于相邻帧时间戳的平滑帧率估计器
///
/// 状态归串流循环独占，每成功处理一帧更新一次。
#[derive(Debug, Default)]
pub struct FpsMeter {
  prev: Option<Instant>,
  rate: f64,
}

impl FpsMeter {
  pub fn new() -> Self {
    Self::default()
  }

  /// 用当前时间戳更新估计，返回平滑后的帧率
  ///
  /// 首次调用以及非正的时间差（时钟异常）只推进基准时间戳，
  /// 平滑值保持不变。
  pub fn update(&mut self, now: Instant) -> f64 {
    let Some(prev) = self.prev.replace(now) else {
      return self.rate;
    };
    let elapsed = match now.checked_duration_since(prev) {
      Some(d) if !d.is_zero() => d.as_secs_f64(),
      _ => return self.rate,
    };

    let instant = 1.0 / elapsed;
    self.rate = if self.rate == 0.0 {
      instant
    } else {
      DECAY * self.rate + (1.0 - DECAY) * instant
    };
    self.rate
  }

  /// 叠加到画面上的文本；从未得到有效测量时显示占位符
  pub fn label(&self) -> String {
    if self.rate > 0.0 {
      format!("FPS: {:.1}", self.rate)
    } else {
      "FPS: --".to_string()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn first_update_only_sets_the_baseline() {
    let mut meter = FpsMeter::new();
    assert_eq!(meter.update(Instant::now()), 0.0);
    assert_eq!(meter.label(), "FPS: --");
  }

  #[test]
  fn non_positive_elapsed_leaves_rate_unchanged() {
    let mut meter = FpsMeter::new();
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_millis(100);

    meter.update(t0);
    let rate = meter.update(t1);
    assert!(rate > 0.0);

    // 相同时间戳：时间差为零
    assert_eq!(meter.update(t1), rate);
    // 时间倒退
    assert_eq!(meter.update(t0), rate);
  }

  #[test]
  fn ema_recurrence_matches_fixed_decay() {
    let mut meter = FpsMeter::new();
    let t0 = Instant::now();
    let mut now = t0;
    meter.update(now);

    let elapsed = [0.1f64, 0.2, 0.05];
    let mut expected = 0.0f64;
    for (i, e) in elapsed.iter().enumerate() {
      now += Duration::from_secs_f64(*e);
      let instant = 1.0 / e;
      expected = if i == 0 {
        instant
      } else {
        DECAY * expected + (1.0 - DECAY) * instant
      };
      let got = meter.update(now);
      assert!((got - expected).abs() < 1e-9, "第 {} 步: {} != {}", i, got, expected);
    }
  }

  #[test]
  fn label_uses_one_decimal_place() {
    let mut meter = FpsMeter::new();
    let t0 = Instant::now();
    meter.update(t0);
    meter.update(t0 + Duration::from_millis(100));
    assert_eq!(meter.label(), "FPS: 10.0");
  }
}
