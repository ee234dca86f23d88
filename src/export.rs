// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/export.rs - 模型导出
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

//! 导出包是一个目录，包含经 ONNX Runtime 优化后序列化的 `model.onnx`
//! 和描述目标后端的 `metadata.json`。CoreML 导出包沿用 `<stem>.mlpackage`
//! 命名，其余格式为 `<stem>_<format>_model`，均与源权重位于同一目录。

use std::{
  path::{Path, PathBuf},
  str::FromStr,
};

use ort::session::{Session, builder::GraphOptimizationLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{ExecutionTarget, ModelMetadata, Yolo11, Yolo11Error};

pub const MODEL_FILE: &str = "model.onnx";
pub const MANIFEST_FILE: &str = "metadata.json";

#[derive(Error, Debug)]
pub enum ExportError {
  #[error("不支持的导出格式: {0}（可选: onnx, coreml, cuda, engine）")]
  UnsupportedFormat(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("清单序列化错误: {0}")]
  ManifestError(#[from] serde_json::Error),
  #[error("模型错误: {0}")]
  ModelError(#[from] Yolo11Error),
  #[error("导出后未生成模型文件: {0}")]
  MissingArtifact(PathBuf),
}

/// 导出目标格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
  Onnx,
  CoreMl,
  Cuda,
  TensorRt,
}

impl FromStr for ExportFormat {
  type Err = ExportError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "onnx" | "cpu" => Ok(ExportFormat::Onnx),
      "coreml" | "mlpackage" | "mlmodel" => Ok(ExportFormat::CoreMl),
      "cuda" => Ok(ExportFormat::Cuda),
      "engine" | "tensorrt" | "trt" => Ok(ExportFormat::TensorRt),
      _ => Err(ExportError::UnsupportedFormat(s.to_string())),
    }
  }
}

impl std::fmt::Display for ExportFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      ExportFormat::Onnx => "onnx",
      ExportFormat::CoreMl => "coreml",
      ExportFormat::Cuda => "cuda",
      ExportFormat::TensorRt => "tensorrt",
    };
    f.write_str(name)
  }
}

impl ExportFormat {
  /// 重新加载导出包时使用的执行后端
  pub fn target(&self) -> ExecutionTarget {
    match self {
      ExportFormat::Onnx => ExecutionTarget::Cpu,
      ExportFormat::CoreMl => ExecutionTarget::CoreMl,
      ExportFormat::Cuda => ExecutionTarget::Cuda,
      ExportFormat::TensorRt => ExecutionTarget::TensorRt,
    }
  }

  /// 序列化时的图优化级别
  ///
  /// 扩展优化会引入 CPU 专用算子，只有 CPU 目标可以使用；
  /// 硬件后端只做基础优化，编译留给加载时的执行后端。
  pub fn optimization_level(&self) -> GraphOptimizationLevel {
    match self {
      ExportFormat::Onnx => GraphOptimizationLevel::Level3,
      _ => GraphOptimizationLevel::Level1,
    }
  }

  fn optimization_name(&self) -> &'static str {
    match self {
      ExportFormat::Onnx => "all",
      _ => "basic",
    }
  }
}

/// 导出包的确定路径
pub fn artifact_path(source: &Path, format: ExportFormat) -> PathBuf {
  let stem = source
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "model".to_string());
  let name = match format {
    ExportFormat::CoreMl => format!("{}.mlpackage", stem),
    other => format!("{}_{}_model", stem, other),
  };
  source.with_file_name(name)
}

/// 导出包清单（`metadata.json`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
  pub format: ExportFormat,
  pub target: ExecutionTarget,
  pub source: PathBuf,
  pub names: Vec<String>,
  pub imgsz: [u32; 2],
  pub optimization: String,
  pub date: String,
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl ExportManifest {
  pub fn new(format: ExportFormat, source: &Path, metadata: &ModelMetadata) -> Self {
    ExportManifest {
      format,
      target: format.target(),
      source: source.to_path_buf(),
      names: metadata.names.clone(),
      imgsz: [metadata.imgsz.1, metadata.imgsz.0],
      optimization: format.optimization_name().to_string(),
      date: chrono::Utc::now().to_rfc3339(),
      version: env!("CARGO_PKG_VERSION").to_string(),
      task: metadata.task.clone(),
      description: metadata.description.clone(),
    }
  }

  pub fn read(dir: &Path) -> Result<Self, ExportError> {
    let raw = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
    Ok(serde_json::from_str(&raw)?)
  }

  pub fn write(&self, dir: &Path) -> Result<(), ExportError> {
    let raw = serde_json::to_string_pretty(self)?;
    std::fs::write(dir.join(MANIFEST_FILE), raw)?;
    Ok(())
  }

  /// 还原为模型元数据，`imgsz` 按 (高, 宽) 存储
  pub fn metadata(&self) -> ModelMetadata {
    ModelMetadata {
      names: self.names.clone(),
      imgsz: (self.imgsz[1], self.imgsz[0]),
      task: self.task.clone(),
      description: self.description.clone(),
    }
  }
}

pub trait Export {
  type Error;

  /// 导出为指定格式，返回导出包路径
  fn export(&self, format: ExportFormat) -> Result<PathBuf, Self::Error>;
}

impl Export for Yolo11 {
  type Error = ExportError;

  fn export(&self, format: ExportFormat) -> Result<PathBuf, Self::Error> {
    let source = self.source_path();
    let dir = artifact_path(source, format);
    info!(
      "导出模型 {} -> {} ({})",
      self.model_path().display(),
      dir.display(),
      format
    );

    if !format.target().is_compiled() {
      warn!(
        "当前构建未启用 {} 后端，导出包仍可生成，但加载时将回退到 CPU",
        format.target()
      );
    }

    // 先读入内存，重新导出到同一导出包时不会读写同一文件
    let model_data = std::fs::read(self.model_path())?;
    std::fs::create_dir_all(&dir)?;
    let model_file = dir.join(MODEL_FILE);
    let model_file_str = model_file.to_string_lossy().into_owned();

    let _ = ort::init().commit();

    // 会话提交时 ONNX Runtime 将优化后的图写入 model_file
    let session = Session::builder()
      .map_err(Yolo11Error::ort("创建导出会话"))?
      .with_optimization_level(format.optimization_level())
      .map_err(Yolo11Error::ort("设置优化级别"))?
      .with_optimized_model_path(model_file_str.as_str())
      .map_err(Yolo11Error::ort("设置导出路径"))?
      .commit_from_memory(&model_data)
      .map_err(Yolo11Error::ort("优化模型"))?;
    drop(session);

    if !model_file.is_file() {
      return Err(ExportError::MissingArtifact(model_file));
    }
    debug!(
      "优化后模型大小: {:.2} MB",
      std::fs::metadata(&model_file)?.len() as f64 / (1024.0 * 1024.0)
    );

    ExportManifest::new(format, source, self.metadata()).write(&dir)?;
    info!("导出完成: {}", dir.display());

    Ok(dir)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_format_aliases() {
    assert_eq!("coreml".parse::<ExportFormat>().unwrap(), ExportFormat::CoreMl);
    assert_eq!("CoreML".parse::<ExportFormat>().unwrap(), ExportFormat::CoreMl);
    assert_eq!("engine".parse::<ExportFormat>().unwrap(), ExportFormat::TensorRt);
    assert_eq!("onnx".parse::<ExportFormat>().unwrap(), ExportFormat::Onnx);
    assert!(matches!(
      "tflite".parse::<ExportFormat>(),
      Err(ExportError::UnsupportedFormat(_))
    ));
  }

  #[test]
  fn artifact_path_is_deterministic() {
    let source = Path::new("/models/yolo11m.onnx");
    assert_eq!(
      artifact_path(source, ExportFormat::CoreMl),
      PathBuf::from("/models/yolo11m.mlpackage")
    );
    assert_eq!(
      artifact_path(source, ExportFormat::TensorRt),
      PathBuf::from("/models/yolo11m_tensorrt_model")
    );
    assert_eq!(
      artifact_path(Path::new("yolo11n.onnx"), ExportFormat::Onnx),
      PathBuf::from("yolo11n_onnx_model")
    );
  }

  #[test]
  fn formats_map_to_targets() {
    assert_eq!(ExportFormat::CoreMl.target(), ExecutionTarget::CoreMl);
    assert_eq!(ExportFormat::Onnx.target(), ExecutionTarget::Cpu);
  }

  #[test]
  fn manifest_survives_disk_and_restores_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = ModelMetadata {
      names: vec!["person".to_string(), "bus".to_string()],
      imgsz: (640, 384),
      task: Some("detect".to_string()),
      description: None,
    };
    let manifest = ExportManifest::new(ExportFormat::CoreMl, Path::new("yolo11m.onnx"), &metadata);
    manifest.write(dir.path()).unwrap();

    let read = ExportManifest::read(dir.path()).unwrap();
    assert_eq!(read, manifest);
    assert_eq!(read.target, ExecutionTarget::CoreMl);
    assert_eq!(read.imgsz, [384, 640]);
    assert_eq!(read.metadata(), metadata);

    let raw = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
    assert!(raw.contains("\"format\": \"coreml\""));
  }

  #[test]
  fn missing_manifest_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      ExportManifest::read(dir.path()),
      Err(ExportError::IoError(_))
    ));
  }
}
