// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/model/postprocess.rs - YOLO 输出解码与非极大值抑制
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

use ndarray::{ArrayViewD, Axis, Ix3};
use tracing::debug;

/// 模型输入空间中的候选框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

/// 解码 `[1, 4 + nc, N]`（或转置后的 `[1, N, 4 + nc]`）输出
///
/// 每列为 `cx, cy, w, h` 加上各类别分数，YOLO11 检测头的分数已经过 sigmoid。
/// 返回 `None` 表示形状不符合预期。
pub fn decode(output: ArrayViewD<'_, f32>, num_classes: usize, conf: f32) -> Option<Vec<Candidate>> {
  let output = output.into_dimensionality::<Ix3>().ok()?;
  let shape = output.shape();
  if shape[0] != 1 {
    return None;
  }

  let channels = 4 + num_classes;
  let (rows, cols) = (shape[1], shape[2]);
  let view = output.index_axis_move(Axis(0), 0);
  // 统一成 [channels, N]
  let view = if rows == channels {
    view
  } else if cols == channels {
    view.reversed_axes()
  } else {
    return None;
  };

  let num_boxes = view.shape()[1];
  let mut candidates = Vec::new();

  for i in 0..num_boxes {
    let mut best_score = f32::MIN;
    let mut best_class = 0usize;
    for c in 0..num_classes {
      let score = view[[4 + c, i]];
      if score > best_score {
        best_score = score;
        best_class = c;
      }
    }

    if best_score < conf {
      continue;
    }

    let cx = view[[0, i]];
    let cy = view[[1, i]];
    let w = view[[2, i]];
    let h = view[[3, i]];

    candidates.push(Candidate {
      class_id: best_class as u32,
      score: best_score,
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    });
  }

  debug!("置信度过滤后剩余 {} 个候选框", candidates.len());
  Some(candidates)
}

/// 由输出形状推断类别数，按 `[1, 4 + nc, N]` 优先，候选数多于通道数时视为转置
pub fn infer_num_classes(shape: &[usize]) -> Option<usize> {
  let [1, rows, cols] = shape else {
    return None;
  };
  let channels = if rows <= cols { *rows } else { *cols };
  channels.checked_sub(4).filter(|nc| *nc > 0)
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
  let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
  let inter = ix * iy;
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
  let union = area_a + area_b - inter;
  if union <= 0.0 { 0.0 } else { inter / union }
}

/// 按类别进行非极大值抑制，结果按分数降序，最多保留 `max_det` 个
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32, max_det: usize) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    if kept.len() >= max_det {
      break;
    }
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold);
    if !suppressed {
      kept.push(candidate);
    }
  }

  kept
}
