// 该文件是 Guanlan （观澜） 项目的一部分。
// src/pipeline.rs - 串流编排
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
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::detector::{Detect, YoloDetector};
use crate::device;
use crate::error::DemoError;
use crate::fps::FpsMeter;
use crate::input::{FrameRead, VideoStream};
use crate::output::{DisplayWindow, Present, Visualizer};
use crate::overlay::{self, OverlayMode};

/// 一次运行的全部配置；校验通过后不再变化
#[derive(Clone, Debug)]
pub struct PipelineConfig {
  pub video: PathBuf,
  pub model: PathBuf,
  pub device: String,
  pub confidence: f32,
  pub max_frames: u64,
  pub window_title: String,
  pub overlay_mode: OverlayMode,
}

impl PipelineConfig {
  /// 配置校验，在任何资源打开之前执行
  pub fn validate(&self) -> Result<(), DemoError> {
    if !(self.confidence > 0.0 && self.confidence <= 1.0) {
      return Err(DemoError::Config(format!(
        "置信度必须位于 (0, 1] 区间，当前为 {}",
        self.confidence
      )));
    }
    if !self.video.exists() {
      return Err(DemoError::Config(format!(
        "视频文件不存在: {}",
        self.video.display()
      )));
    }
    Ok(())
  }
}

/// 终止状态；Failed 由 Err 分支承载
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
  /// 流结束，或达到帧数上限
  Completed,
  /// 用户按键、关窗或中断信号
  Cancelled,
}

/// 运行完整流水线：校验、设备解析、资源获取、串流循环
///
/// 初始化的任何失败都在进入串流阶段之前返回；进入串流之后，
/// 捕获句柄与显示表面都归本函数的作用域独占，任何一条退出
/// 路径（含故障展开）都会随 Drop 释放两者，各恰好一次。
pub fn run(config: &PipelineConfig, interrupt: &AtomicBool) -> Result<Outcome, DemoError> {
  config.validate()?;

  let selection = device::resolve(&config.device, device::accelerator_available());
  if selection.uses_accelerator {
    info!("使用 {} 进行推理", selection.resolved);
  } else {
    info!("在 CPU 上运行推理；GPU 可用时可指定 --device cuda:0");
  }

  let mut detector = YoloDetector::load(&config.model, &selection)?;

  let draw_overlay = overlay::should_draw(
    config.overlay_mode,
    &config.video,
    &overlay::bundled_video_path(),
  );
  if config.overlay_mode == OverlayMode::Auto && !draw_overlay {
    info!("示例视频已自带检测框，跳过重复绘制；需要时用 --overlay-mode always 强制");
  }

  let mut source = VideoStream::open(&config.video)?;
  info!(
    "开始串流 {}（模型 {}，设备 {}，标称帧率 {:.1}），按 q 或 ESC 退出",
    config.video.display(),
    config.model.display(),
    selection.resolved,
    source.nominal_fps(),
  );

  // 窗口在确认流可以打开之后才创建
  let mut sink = DisplayWindow::create(&config.window_title, source.width(), source.height())?;
  let visualizer = Visualizer::new();

  stream_loop(
    &mut source,
    &mut detector,
    &mut sink,
    &visualizer,
    config,
    draw_overlay,
    interrupt,
  )
}

/// 串流主循环
///
/// 帧源、推理与显示端都走 trait 注入，测试里用脚本化替身
/// 驱动同一条循环。单线程协作式：一轮内依次读帧、推理、
/// 绘制、显示，取消检查在显示之后的固定位置做一次。
fn stream_loop<S, D, P>(
  source: &mut S,
  detector: &mut D,
  sink: &mut P,
  visualizer: &Visualizer,
  config: &PipelineConfig,
  draw_overlay: bool,
  interrupt: &AtomicBool,
) -> Result<Outcome, DemoError>
where
  S: FrameRead,
  D: Detect,
  P: Present,
{
  let mut fps = FpsMeter::new();
  let mut processed = 0u64;

  loop {
    let Some(frame) = source.next_frame()? else {
      info!("视频流结束，共处理 {} 帧", processed);
      return Ok(Outcome::Completed);
    };

    let detections = detector.infer(&frame.image, config.confidence)?;
    debug!(
      "帧 {}: {} 个检测，解码到显示 {:.2?}",
      frame.index,
      detections.len(),
      frame.captured_at.elapsed()
    );

    // 推理无结果时显示原始帧；结果存在但叠加被策略关掉时
    // 同样只显示原始帧（推理仍然跑过）
    let mut shown = if !detections.is_empty() && draw_overlay {
      visualizer.render(&frame.image, &detections)
    } else {
      frame.image
    };

    fps.update(std::time::Instant::now());
    visualizer.overlay_fps(&mut shown, &fps.label());

    sink.present(&shown)?;
    processed += 1;

    // 取消检查点：按键、中断信号，然后是帧数上限
    if sink.quit_requested() {
      info!("收到退出按键，停止串流");
      return Ok(Outcome::Cancelled);
    }
    if interrupt.load(Ordering::Relaxed) {
      info!("收到中断信号，停止串流");
      return Ok(Outcome::Cancelled);
    }
    if config.max_frames > 0 && processed >= config.max_frames {
      info!("达到帧数上限 {}，停止串流", config.max_frames);
      return Ok(Outcome::Completed);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::AtomicUsize;
  use std::time::Instant;

  use anyhow::anyhow;
  use image::RgbImage;

  use crate::detector::Detection;
  use crate::input::Frame;

  fn test_config(max_frames: u64) -> PipelineConfig {
    PipelineConfig {
      video: PathBuf::from("clip.mp4"),
      model: PathBuf::from("model.onnx"),
      device: "cpu".to_string(),
      confidence: 0.5,
      max_frames,
      window_title: "测试".to_string(),
      overlay_mode: OverlayMode::Always,
    }
  }

  /// 固定帧数的脚本化帧源，Drop 时记录释放次数
  struct ScriptedSource {
    remaining: usize,
    index: u64,
    released: Arc<AtomicUsize>,
  }

  impl ScriptedSource {
    fn new(frames: usize, released: Arc<AtomicUsize>) -> Self {
      Self {
        remaining: frames,
        index: 0,
        released,
      }
    }
  }

  impl FrameRead for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, DemoError> {
      if self.remaining == 0 {
        return Ok(None);
      }
      self.remaining -= 1;
      let frame = Frame {
        image: RgbImage::new(64, 64),
        index: self.index,
        captured_at: Instant::now(),
      };
      self.index += 1;
      Ok(Some(frame))
    }

    fn width(&self) -> u32 {
      64
    }

    fn height(&self) -> u32 {
      64
    }
  }

  impl Drop for ScriptedSource {
    fn drop(&mut self) {
      self.released.fetch_add(1, Ordering::SeqCst);
    }
  }

  /// 返回固定结果的推理替身，可在指定帧注入故障
  struct ScriptedDetector {
    calls: usize,
    fail_at: Option<usize>,
    detections_per_frame: usize,
  }

  impl ScriptedDetector {
    fn quiet() -> Self {
      Self {
        calls: 0,
        fail_at: None,
        detections_per_frame: 0,
      }
    }

    fn failing_at(call: usize) -> Self {
      Self {
        calls: 0,
        fail_at: Some(call),
        detections_per_frame: 1,
      }
    }
  }

  impl Detect for ScriptedDetector {
    fn infer(&mut self, _image: &RgbImage, _confidence: f32) -> Result<Vec<Detection>, DemoError> {
      self.calls += 1;
      if self.fail_at == Some(self.calls) {
        return Err(DemoError::Other(anyhow!("注入的推理故障")));
      }
      Ok(
        (0..self.detections_per_frame)
          .map(|i| Detection {
            x: 4.0 + i as f32,
            y: 4.0,
            width: 16.0,
            height: 16.0,
            confidence: 0.9,
            class_id: 0,
            class_name: "person".to_string(),
          })
          .collect(),
      )
    }
  }

  /// 记录显示次数的显示端替身，可在第 N 帧后请求退出
  struct RecordingSink {
    presented: usize,
    quit_after: Option<usize>,
    released: Arc<AtomicUsize>,
  }

  impl RecordingSink {
    fn new(released: Arc<AtomicUsize>) -> Self {
      Self {
        presented: 0,
        quit_after: None,
        released,
      }
    }

    fn quitting_after(presented: usize, released: Arc<AtomicUsize>) -> Self {
      Self {
        presented: 0,
        quit_after: Some(presented),
        released,
      }
    }
  }

  impl Present for RecordingSink {
    fn present(&mut self, _image: &RgbImage) -> Result<(), DemoError> {
      self.presented += 1;
      Ok(())
    }

    fn quit_requested(&self) -> bool {
      self.quit_after.is_some_and(|n| self.presented >= n)
    }
  }

  impl Drop for RecordingSink {
    fn drop(&mut self) {
      self.released.fetch_add(1, Ordering::SeqCst);
    }
  }

  fn run_loop(
    source: &mut ScriptedSource,
    detector: &mut ScriptedDetector,
    sink: &mut RecordingSink,
    config: &PipelineConfig,
    interrupt: &AtomicBool,
  ) -> Result<Outcome, DemoError> {
    let visualizer = Visualizer::new();
    stream_loop(source, detector, sink, &visualizer, config, true, interrupt)
  }

  #[test]
  fn confidence_outside_unit_interval_is_a_config_error() {
    for confidence in [0.0, 1.5, -0.1] {
      let mut config = test_config(0);
      config.confidence = confidence;
      let err = config.validate().unwrap_err();
      assert!(matches!(err, DemoError::Config(_)), "{} 应当被拒绝", confidence);
    }
  }

  #[test]
  fn missing_video_file_is_a_config_error() {
    let mut config = test_config(0);
    config.confidence = 0.5;
    config.video = PathBuf::from("/没有这个文件.mp4");
    assert!(matches!(config.validate().unwrap_err(), DemoError::Config(_)));
  }

  #[test]
  fn valid_config_passes_validation() {
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    std::fs::write(&video, b"stub").unwrap();

    let mut config = test_config(0);
    config.video = video;
    assert!(config.validate().is_ok());
  }

  #[test]
  fn frame_ceiling_stops_after_exactly_that_many_frames() {
    let released = Arc::new(AtomicUsize::new(0));
    let mut source = ScriptedSource::new(5, released.clone());
    let mut detector = ScriptedDetector::quiet();
    let mut sink = RecordingSink::new(released.clone());
    let interrupt = AtomicBool::new(false);

    let outcome = run_loop(&mut source, &mut detector, &mut sink, &test_config(3), &interrupt);
    assert_eq!(outcome.unwrap(), Outcome::Completed);
    assert_eq!(sink.presented, 3);
    assert_eq!(detector.calls, 3);
    assert_eq!(source.remaining, 2);
  }

  #[test]
  fn end_of_stream_completes_after_all_frames() {
    let released = Arc::new(AtomicUsize::new(0));
    let mut source = ScriptedSource::new(2, released.clone());
    let mut detector = ScriptedDetector::quiet();
    let mut sink = RecordingSink::new(released.clone());
    let interrupt = AtomicBool::new(false);

    let outcome = run_loop(&mut source, &mut detector, &mut sink, &test_config(0), &interrupt);
    assert_eq!(outcome.unwrap(), Outcome::Completed);
    assert_eq!(sink.presented, 2);
  }

  #[test]
  fn quit_key_cancels_after_the_displayed_frame() {
    let released = Arc::new(AtomicUsize::new(0));
    let mut source = ScriptedSource::new(5, released.clone());
    let mut detector = ScriptedDetector::quiet();
    let mut sink = RecordingSink::quitting_after(2, released.clone());
    let interrupt = AtomicBool::new(false);

    let outcome = run_loop(&mut source, &mut detector, &mut sink, &test_config(0), &interrupt);
    assert_eq!(outcome.unwrap(), Outcome::Cancelled);
    assert_eq!(sink.presented, 2);
  }

  #[test]
  fn interrupt_cancels_at_the_post_display_checkpoint() {
    let released = Arc::new(AtomicUsize::new(0));
    let mut source = ScriptedSource::new(5, released.clone());
    let mut detector = ScriptedDetector::quiet();
    let mut sink = RecordingSink::new(released.clone());
    let interrupt = AtomicBool::new(true);

    let outcome = run_loop(&mut source, &mut detector, &mut sink, &test_config(0), &interrupt);
    assert_eq!(outcome.unwrap(), Outcome::Cancelled);
    // 中断在显示之后的检查点生效，因此第一帧仍然显示了
    assert_eq!(sink.presented, 1);
  }

  #[test]
  fn resources_release_exactly_once_on_completion() {
    let source_released = Arc::new(AtomicUsize::new(0));
    let sink_released = Arc::new(AtomicUsize::new(0));
    {
      let mut source = ScriptedSource::new(2, source_released.clone());
      let mut detector = ScriptedDetector::quiet();
      let mut sink = RecordingSink::new(sink_released.clone());
      let interrupt = AtomicBool::new(false);
      let _ = run_loop(&mut source, &mut detector, &mut sink, &test_config(0), &interrupt);
    }
    assert_eq!(source_released.load(Ordering::SeqCst), 1);
    assert_eq!(sink_released.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn resources_release_exactly_once_on_mid_loop_fault() {
    let source_released = Arc::new(AtomicUsize::new(0));
    let sink_released = Arc::new(AtomicUsize::new(0));
    let outcome = {
      let mut source = ScriptedSource::new(5, source_released.clone());
      let mut detector = ScriptedDetector::failing_at(2);
      let mut sink = RecordingSink::new(sink_released.clone());
      let interrupt = AtomicBool::new(false);
      run_loop(&mut source, &mut detector, &mut sink, &test_config(0), &interrupt)
    };
    assert!(outcome.is_err());
    assert_eq!(source_released.load(Ordering::SeqCst), 1);
    assert_eq!(sink_released.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn resources_release_exactly_once_on_cancellation() {
    let source_released = Arc::new(AtomicUsize::new(0));
    let sink_released = Arc::new(AtomicUsize::new(0));
    {
      let mut source = ScriptedSource::new(5, source_released.clone());
      let mut detector = ScriptedDetector::quiet();
      let mut sink = RecordingSink::quitting_after(1, sink_released.clone());
      let interrupt = AtomicBool::new(false);
      let _ = run_loop(&mut source, &mut detector, &mut sink, &test_config(0), &interrupt);
    }
    assert_eq!(source_released.load(Ordering::SeqCst), 1);
    assert_eq!(sink_released.load(Ordering::SeqCst), 1);
  }
}
