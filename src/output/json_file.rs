// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/output/json_file.rs - 以 JSON 保存检测结果
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  model::{DetectResult, WithLabel},
  output::Render,
  url_to_path,
};

#[derive(Error, Debug)]
pub enum JsonFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDetection {
  pub class: u32,
  pub name: String,
  pub confidence: f32,
  #[serde(rename = "box")]
  pub bbox: JsonBox,
}

/// 单张图像的检测报告，坐标为原图像素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
  pub source: String,
  pub width: u32,
  pub height: u32,
  pub speed_ms: f64,
  pub detections: Vec<JsonDetection>,
}

impl JsonReport {
  pub fn new<T: WithLabel>(source: &str, result: &DetectResult<T>) -> Self {
    let (width, height) = result.shape;
    let (w, h) = (width as f32, height as f32);
    let detections = result
      .iter()
      .map(|item| JsonDetection {
        class: item.kind.to_label_id(),
        name: item.kind.to_label_str(),
        confidence: item.score,
        bbox: JsonBox {
          x1: item.bbox[0] * w,
          y1: item.bbox[1] * h,
          x2: item.bbox[2] * w,
          y2: item.bbox[3] * h,
        },
      })
      .collect();

    JsonReport {
      source: source.to_string(),
      width,
      height,
      speed_ms: result.elapsed.as_secs_f64() * 1000.0,
      detections,
    }
  }
}

pub struct JsonFileOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonFileOutput {
  type Error = JsonFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(JsonFileOutput {
      path: url_to_path(uri),
    })
  }
}

impl<T: WithLabel> Render<RgbFrame, DetectResult<T>> for JsonFileOutput {
  type Error = JsonFileError;

  fn render_result(&self, frame: &RgbFrame, result: &DetectResult<T>) -> Result<(), Self::Error> {
    let report = JsonReport::new(frame.source(), result);

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&self.path, serde_json::to_string_pretty(&report)?)?;
    info!("保存检测结果到文件: {}", self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ClassLabel, DetectItem};
  use image::RgbImage;
  use std::time::Duration;

  #[test]
  fn writes_pixel_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bus.json");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let output = JsonFileOutput::from_url(&url).unwrap();

    let frame = RgbFrame::new(RgbImage::new(200, 100), "bus.jpg");
    let result = DetectResult {
      items: vec![DetectItem {
        kind: ClassLabel {
          id: 5,
          name: "bus".to_string(),
        },
        score: 0.5,
        bbox: [0.25, 0.5, 0.75, 1.0],
      }]
      .into_boxed_slice(),
      shape: (200, 100),
      elapsed: Duration::from_millis(20),
    };
    output.render_result(&frame, &result).unwrap();

    let report: JsonReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report.source, "bus.jpg");
    assert_eq!(report.detections.len(), 1);
    let det = &report.detections[0];
    assert_eq!((det.class, det.name.as_str()), (5, "bus"));
    assert_eq!(
      det.bbox,
      JsonBox {
        x1: 50.0,
        y1: 50.0,
        x2: 150.0,
        y2: 100.0
      }
    );
    assert!((report.speed_ms - 20.0).abs() < 1e-6);
  }
}
