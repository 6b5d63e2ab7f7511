// 该文件是 Guanlan （观澜） 项目的一部分。
// src/input/video_source.rs - 视频文件帧来源
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

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{Pixel, input};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg_next::util::frame::video::Video;
use image::RgbImage;
use tracing::debug;

use super::{Frame, FrameRead};
use crate::error::DemoError;

/// 基于 FFmpeg 的视频文件帧来源
///
/// 句柄由创建者独占；解码上下文随 Drop 释放，释放恰好一次。
pub struct VideoStream {
  input_context: ffmpeg::format::context::Input,
  stream_index: usize,
  decoder: ffmpeg::decoder::Video,
  scaler: ScalingContext,
  width: u32,
  height: u32,
  fps: f64,
  frame_index: u64,
  /// 输入耗尽后已进入冲刷阶段
  eof_sent: bool,
  finished: bool,
}

impl VideoStream {
  /// 打开视频文件
  ///
  /// FFmpeg 自身初始化失败属于依赖错误；文件打不开、没有视频流
  /// 等情况归类为流打开错误。两者都发生在任何显示资源创建之前。
  pub fn open(path: &Path) -> Result<Self, DemoError> {
    ffmpeg::init()
      .map_err(|e| DemoError::Dependency(anyhow::Error::new(e).context("FFmpeg 初始化失败")))?;

    Self::open_stream(path).map_err(|cause| DemoError::StreamOpen {
      path: path.to_path_buf(),
      cause,
    })
  }

  fn open_stream(path: &Path) -> Result<Self> {
    let input_context =
      input(&path).with_context(|| format!("无法打开视频文件: {}", path.display()))?;

    let stream = input_context
      .streams()
      .best(Type::Video)
      .context("文件中找不到视频流")?;
    let stream_index = stream.index();

    let decoder_context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
      .context("无法创建解码器上下文")?;
    let decoder = decoder_context.decoder().video().context("无法创建视频解码器")?;

    let width = decoder.width();
    let height = decoder.height();

    let rate = stream.avg_frame_rate();
    let fps = if rate.denominator() != 0 {
      rate.numerator() as f64 / rate.denominator() as f64
    } else {
      0.0
    };

    // 统一转成 RGB24，后续绘制与显示都在这个格式上进行
    let scaler = ScalingContext::get(
      decoder.format(),
      width,
      height,
      Pixel::RGB24,
      width,
      height,
      Flags::BILINEAR,
    )
    .context("无法创建像素格式转换器")?;

    Ok(Self {
      input_context,
      stream_index,
      decoder,
      scaler,
      width,
      height,
      fps,
      frame_index: 0,
      eof_sent: false,
      finished: false,
    })
  }

  /// 标称帧率（容器元数据，可能为 0）
  pub fn nominal_fps(&self) -> f64 {
    self.fps
  }

  /// 取出下一帧解码结果；输入与解码器都耗尽时返回 None
  fn decode_next(&mut self) -> Result<Option<Video>> {
    loop {
      let mut decoded = Video::empty();
      if self.decoder.receive_frame(&mut decoded).is_ok() {
        return Ok(Some(decoded));
      }
      if self.eof_sent {
        return Ok(None);
      }

      // 送入下一个属于视频流的数据包；输入耗尽则送 EOF 进入冲刷
      let mut sent = false;
      for (stream, packet) in self.input_context.packets() {
        if stream.index() == self.stream_index {
          self.decoder.send_packet(&packet).context("解码器拒绝数据包")?;
          sent = true;
          break;
        }
      }
      if !sent {
        self.decoder.send_eof().context("无法结束解码")?;
        self.eof_sent = true;
      }
    }
  }

  fn to_rgb(&mut self, decoded: &Video) -> Result<RgbImage> {
    let mut rgb = Video::empty();
    self.scaler.run(decoded, &mut rgb).context("像素格式转换失败")?;

    // 行步长可能大于 width * 3，逐行拷贝有效部分
    let data = rgb.data(0);
    let stride = rgb.stride(0);
    let width = self.width as usize;
    let height = self.height as usize;

    let mut pixels = Vec::with_capacity(width * height * 3);
    for y in 0..height {
      let row = y * stride;
      pixels.extend_from_slice(&data[row..row + width * 3]);
    }

    RgbImage::from_raw(self.width, self.height, pixels).context("无法构造 RGB 图像")
  }
}

impl FrameRead for VideoStream {
  fn next_frame(&mut self) -> Result<Option<Frame>, DemoError> {
    if self.finished {
      return Ok(None);
    }

    match self.decode_next() {
      Ok(Some(decoded)) => {
        let image = self.to_rgb(&decoded)?;
        let frame = Frame {
          image,
          index: self.frame_index,
          captured_at: Instant::now(),
        };
        self.frame_index += 1;
        Ok(Some(frame))
      }
      Ok(None) => {
        self.finished = true;
        Ok(None)
      }
      Err(e) => {
        self.finished = true;
        Err(DemoError::Other(e))
      }
    }
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}

impl Drop for VideoStream {
  fn drop(&mut self) {
    debug!("视频流句柄已释放（共解码 {} 帧）", self.frame_index);
  }
}
