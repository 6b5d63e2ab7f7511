// 该文件是 Guanlan （观澜） 项目的一部分。
// src/detector/yolo.rs - YOLO 目标检测器
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

use anyhow::{Context, Result, ensure};
use image::RgbImage;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tracing::debug;

use super::{Detect, Detection};
use crate::device::DeviceSelection;
use crate::error::DemoError;

/// 模型输入尺寸（YOLOv8 / YOLO11 的标准导出）
const INPUT_WIDTH: u32 = 640;
const INPUT_HEIGHT: u32 = 640;

/// NMS IoU 阈值
const NMS_IOU: f32 = 0.45;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 基于 ort 的 YOLO 检测器
pub struct YoloDetector {
  session: Session,
  input_name: String,
  output_name: String,
}

impl YoloDetector {
  /// 加载 ONNX 权重，并按设备选择注册执行提供方
  ///
  /// 加载失败属于依赖错误：权重缺失、格式不符或推理运行时
  /// 不可用都在这里暴露，发生在视频流打开之前。
  pub fn load(weights: &Path, device: &DeviceSelection) -> Result<Self, DemoError> {
    Self::build(weights, device).map_err(DemoError::Dependency)
  }

  fn build(weights: &Path, device: &DeviceSelection) -> Result<Self> {
    let mut builder = Session::builder()
      .context("无法创建推理会话")?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .context("无法配置图优化级别")?;

    if device.uses_accelerator {
      let ordinal = device.cuda_ordinal().unwrap_or(0);
      builder = builder
        .with_execution_providers([
          CUDAExecutionProvider::default().with_device_id(ordinal).build(),
        ])
        .context("无法注册 CUDA 执行提供方")?;
    }

    let session = builder
      .commit_from_file(weights)
      .with_context(|| format!("无法加载模型: {}", weights.display()))?;

    let input_name = session.inputs.first().context("模型没有输入张量")?.name.clone();
    let output_name = session.outputs.first().context("模型没有输出张量")?.name.clone();
    debug!("模型已加载，输入 {:?}，输出 {:?}", input_name, output_name);

    Ok(Self {
      session,
      input_name,
      output_name,
    })
  }

  /// 缩放到模型输入尺寸并归一化为 NCHW f32
  fn preprocess(image: &RgbImage) -> Vec<f32> {
    let resized = image::imageops::resize(
      image,
      INPUT_WIDTH,
      INPUT_HEIGHT,
      image::imageops::FilterType::Triangle,
    );

    let plane = (INPUT_WIDTH * INPUT_HEIGHT) as usize;
    let mut data = vec![0.0f32; plane * 3];
    for (x, y, pixel) in resized.enumerate_pixels() {
      let idx = (y * INPUT_WIDTH + x) as usize;
      data[idx] = pixel[0] as f32 / 255.0;
      data[idx + plane] = pixel[1] as f32 / 255.0;
      data[idx + 2 * plane] = pixel[2] as f32 / 255.0;
    }
    data
  }

  fn run(&mut self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>> {
    let original = (image.width() as f32, image.height() as f32);

    let data = Self::preprocess(image);
    let shape = [1usize, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize];
    let tensor = Tensor::from_array((shape, data)).context("无法构造输入张量")?;

    let outputs = self
      .session
      .run(ort::inputs![self.input_name.as_str() => tensor])
      .context("推理执行失败")?;

    let value = outputs
      .get(self.output_name.as_str())
      .context("模型没有返回输出张量")?;
    let (dims, data) = value
      .try_extract_tensor::<f32>()
      .context("无法读取输出张量")?;
    let dims: Vec<i64> = dims.iter().copied().collect();

    postprocess(&dims, data, confidence, original)
  }
}

impl Detect for YoloDetector {
  fn infer(&mut self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DemoError> {
    self.run(image, confidence).map_err(DemoError::Other)
  }
}

/// 解析 [1, 4 + 类别数, 锚点数] 布局的输出并缩放回原始帧
///
/// v8/v11 布局没有单独的 objectness，置信度取最高类别分数。
fn postprocess(
  dims: &[i64],
  data: &[f32],
  confidence: f32,
  (original_width, original_height): (f32, f32),
) -> Result<Vec<Detection>> {
  ensure!(
    dims.len() == 3 && dims[1] > 4,
    "意外的模型输出形状: {:?}",
    dims
  );
  let rows = dims[1] as usize;
  let anchors = dims[2] as usize;
  ensure!(data.len() >= rows * anchors, "输出张量长度不足");
  let num_classes = rows - 4;

  let at = |attr: usize, anchor: usize| data[attr * anchors + anchor];

  let scale_x = original_width / INPUT_WIDTH as f32;
  let scale_y = original_height / INPUT_HEIGHT as f32;

  let mut detections = Vec::new();
  for anchor in 0..anchors {
    let mut best_score = 0.0f32;
    let mut best_class = 0usize;
    for class_id in 0..num_classes {
      let score = at(4 + class_id, anchor);
      if score > best_score {
        best_score = score;
        best_class = class_id;
      }
    }
    if best_score < confidence {
      continue;
    }

    // 中心点加宽高转为左上角坐标，再缩放回原始尺寸
    let cx = at(0, anchor);
    let cy = at(1, anchor);
    let w = at(2, anchor);
    let h = at(3, anchor);

    detections.push(Detection {
      x: (cx - w / 2.0) * scale_x,
      y: (cy - h / 2.0) * scale_y,
      width: w * scale_x,
      height: h * scale_y,
      confidence: best_score,
      class_id: best_class,
      class_name: COCO_CLASSES
        .get(best_class)
        .unwrap_or(&"unknown")
        .to_string(),
    });
  }

  Ok(nms(detections, NMS_IOU))
}

/// 同类别间的非极大值抑制
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut kept: Vec<Detection> = Vec::new();
  'candidate: for detection in detections {
    for existing in &kept {
      if existing.class_id == detection.class_id && iou(existing, &detection) >= iou_threshold {
        continue 'candidate;
      }
    }
    kept.push(detection);
  }
  kept
}

fn iou(a: &Detection, b: &Detection) -> f32 {
  let x1 = a.x.max(b.x);
  let y1 = a.y.max(b.y);
  let x2 = (a.x + a.width).min(b.x + b.width);
  let y2 = (a.y + a.height).min(b.y + b.height);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.width * a.height + b.width * b.height - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
