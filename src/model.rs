// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/model.rs - 模型
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

use std::{collections::BTreeMap, time::Duration};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone)]
pub struct DetectItem<T> {
  pub kind: T,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，相对原图归一化
}

#[derive(Debug, Clone)]
pub struct DetectResult<T> {
  pub items: Box<[DetectItem<T>]>,
  /// 原图宽高
  pub shape: (u32, u32),
  /// 推理耗时（含前后处理）
  pub elapsed: Duration,
}

impl<T> DetectResult<T> {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem<T>> {
    self.items.iter()
  }
}

impl<T: WithLabel> DetectResult<T> {
  /// 按类别统计数量，例如 `4 persons, 1 bus`
  pub fn summary(&self) -> String {
    if self.items.is_empty() {
      return "(no detections)".to_string();
    }

    let mut counts: BTreeMap<u32, (String, usize)> = BTreeMap::new();
    for item in self.items.iter() {
      counts
        .entry(item.kind.to_label_id())
        .or_insert_with(|| (item.kind.to_label_str(), 0))
        .1 += 1;
    }

    counts
      .values()
      .map(|(name, n)| {
        if *n > 1 {
          format!("{} {}s", n, name)
        } else {
          format!("{} {}", n, name)
        }
      })
      .collect::<Vec<_>>()
      .join(", ")
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
}

/// 带名称的类别标签，名称来自模型元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabel {
  pub id: u32,
  pub name: String,
}

impl WithLabel for ClassLabel {
  fn to_label_str(&self) -> String {
    self.name.clone()
  }

  fn to_label_id(&self) -> u32 {
    self.id
  }
}

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

mod metadata;
pub use self::metadata::ModelMetadata;

mod target;
pub use self::target::ExecutionTarget;

pub mod postprocess;

mod yolo11;
pub use self::yolo11::{Yolo11, Yolo11Builder, Yolo11Error};

#[cfg(test)]
mod tests {
  use super::*;

  fn item(id: u32, name: &str) -> DetectItem<ClassLabel> {
    DetectItem {
      kind: ClassLabel {
        id,
        name: name.to_string(),
      },
      score: 0.9,
      bbox: [0.0, 0.0, 1.0, 1.0],
    }
  }

  #[test]
  fn summary_counts_per_class_in_id_order() {
    let result = DetectResult {
      items: vec![
        item(5, "bus"),
        item(0, "person"),
        item(0, "person"),
        item(0, "person"),
        item(0, "person"),
      ]
      .into_boxed_slice(),
      shape: (810, 1080),
      elapsed: Duration::from_millis(50),
    };
    assert_eq!(result.summary(), "4 persons, 1 bus");
    assert_eq!(result.len(), 5);
  }

  #[test]
  fn empty_summary() {
    let result: DetectResult<ClassLabel> = DetectResult {
      items: Vec::new().into_boxed_slice(),
      shape: (1, 1),
      elapsed: Duration::ZERO,
    };
    assert!(result.is_empty());
    assert_eq!(result.summary(), "(no detections)");
  }
}
