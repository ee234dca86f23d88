// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/model/yolo11.rs - YOLO11 检测模型
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

use std::{
  path::{Path, PathBuf},
  time::Instant,
};

use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  export::{ExportManifest, MANIFEST_FILE, MODEL_FILE},
  frame::{RgbFrame, letterbox, to_nchw_f32},
  model::{
    ClassLabel, DetectItem, DetectResult, ExecutionTarget, Model, ModelMetadata,
    metadata::fallback_names, postprocess,
  },
  url_to_path,
};

pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.7;
pub const DEFAULT_MAX_DET: usize = 300;

/// 无法由 ONNX Runtime 直接加载的权重格式
const UNSUPPORTED_WEIGHT_EXTENSIONS: [&str; 3] = ["pt", "pth", "safetensors"];

#[derive(Error, Debug)]
pub enum Yolo11Error {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("不支持的权重格式: {0}，请先导出为 ONNX")]
  UnsupportedWeights(PathBuf),
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("导出包清单错误: {0}")]
  ManifestError(String),
  #[error("ONNX Runtime 错误（{stage}）: {message}")]
  OrtError { stage: String, message: String },
  #[error("模型输出形状不符合预期: {0:?}")]
  UnexpectedOutput(Vec<usize>),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl Yolo11Error {
  pub(crate) fn ort<E: std::fmt::Display>(stage: &'static str) -> impl FnOnce(E) -> Self {
    move |e| {
      error!("{}失败: {}", stage, e);
      Yolo11Error::OrtError {
        stage: stage.to_string(),
        message: e.to_string(),
      }
    }
  }
}

pub struct Yolo11 {
  session: Session,
  metadata: ModelMetadata,
  /// 推理时使用的类别标签；元数据没有类别名称时在首次推理后确定
  labels: Vec<String>,
  target: ExecutionTarget,
  model_path: PathBuf,
  source_path: PathBuf,
  confidence: f32,
  iou: f32,
  max_det: usize,
}

#[derive(Debug, Clone)]
pub struct Yolo11Builder {
  model_path: PathBuf,
  target: Option<ExecutionTarget>,
  confidence: f32,
  iou: f32,
  max_det: usize,
  intra_threads: Option<usize>,
}

impl FromUrlWithScheme for Yolo11Builder {
  const SCHEME: &'static str = "yolo11";
}

impl FromUrl for Yolo11Builder {
  type Error = Yolo11Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME && url.scheme() != "file" {
      return Err(Yolo11Error::ModelPathError(format!(
        "模型路径必须使用 {} 或 file 方案",
        Self::SCHEME
      )));
    }

    Ok(Self::from_path(url_to_path(url)))
  }
}

impl Yolo11Builder {
  pub fn from_path(path: impl Into<PathBuf>) -> Self {
    Yolo11Builder {
      model_path: path.into(),
      target: None,
      confidence: DEFAULT_CONFIDENCE,
      iou: DEFAULT_IOU,
      max_det: DEFAULT_MAX_DET,
      intra_threads: None,
    }
  }

  /// 接受 `yolo11:`/`file:` URL 或普通路径
  pub fn from_source(source: &str) -> Result<Self, Yolo11Error> {
    match Url::parse(source) {
      // 单字母方案是 Windows 盘符
      Ok(url) if url.scheme().len() > 1 => Self::from_url(&url),
      _ => Ok(Self::from_path(source)),
    }
  }

  /// 以相同的阈值与线程配置加载另一个模型（执行后端重新推断）
  pub fn with_model_path(&self, path: impl Into<PathBuf>) -> Self {
    Yolo11Builder {
      model_path: path.into(),
      target: None,
      ..self.clone()
    }
  }

  /// 指定执行后端；不指定时普通模型使用 CPU，导出包使用清单中的后端
  pub fn target(mut self, target: ExecutionTarget) -> Self {
    self.target = Some(target);
    self
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn iou(mut self, iou: f32) -> Self {
    self.iou = iou;
    self
  }

  pub fn max_det(mut self, max_det: usize) -> Self {
    self.max_det = max_det;
    self
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = Some(threads);
    self
  }

  /// 导出包目录，或直接指向其中的清单文件
  fn package_dir(&self) -> Option<&Path> {
    if self.model_path.is_dir() {
      return Some(&self.model_path);
    }
    if self.model_path.file_name().is_some_and(|n| n == MANIFEST_FILE) {
      return self.model_path.parent();
    }
    None
  }

  pub fn build(self) -> Result<Yolo11, Yolo11Error> {
    let (model_file, source_path, target, package_meta) = match self.package_dir() {
      Some(dir) => {
        info!("加载导出包: {}", dir.display());
        let manifest =
          ExportManifest::read(dir).map_err(|e| Yolo11Error::ManifestError(e.to_string()))?;
        debug!("导出包清单: {:?}", manifest);
        let target = self.target.unwrap_or(manifest.target);
        // 导出包与原始权重位于同一目录
        let source_path = match manifest.source.file_name() {
          Some(name) => dir.with_file_name(name),
          None => dir.join(MODEL_FILE),
        };
        (dir.join(MODEL_FILE), source_path, target, Some(manifest.metadata()))
      }
      None => (
        self.model_path.clone(),
        self.model_path.clone(),
        self.target.unwrap_or_default(),
        None,
      ),
    };

    let extension = model_file
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| e.to_ascii_lowercase());
    if extension.is_some_and(|e| UNSUPPORTED_WEIGHT_EXTENSIONS.contains(&e.as_str())) {
      return Err(Yolo11Error::UnsupportedWeights(model_file));
    }
    if !model_file.is_file() {
      error!("模型文件不存在: {}", model_file.display());
      return Err(Yolo11Error::ModelNotFound(model_file));
    }

    info!("加载模型文件: {}", model_file.display());
    let model_data = std::fs::read(&model_file)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let _ = ort::init().commit();

    info!("创建 ONNX Runtime 推理会话（{}）", target);
    let mut builder = Session::builder()
      .map_err(Yolo11Error::ort("创建会话"))?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(Yolo11Error::ort("设置优化级别"))?;
    if let Some(threads) = self.intra_threads {
      builder = builder
        .with_intra_threads(threads)
        .map_err(Yolo11Error::ort("设置线程数"))?;
    }
    let builder = target.register(builder)?;
    let session = builder
      .commit_from_memory(&model_data)
      .map_err(Yolo11Error::ort("加载模型"))?;
    info!("模型加载完成");

    let metadata = match package_meta {
      Some(meta) => meta,
      None => {
        let meta = session
          .metadata()
          .map_err(Yolo11Error::ort("读取模型元数据"))?;
        ModelMetadata::from_lookup(|key| meta.custom(key))
      }
    };

    if !metadata.has_names() {
      warn!("模型未提供类别名称，类别数将由输出形状推断");
    }

    Ok(Yolo11 {
      session,
      labels: metadata.names.clone(),
      metadata,
      target,
      model_path: model_file,
      source_path,
      confidence: self.confidence,
      iou: self.iou,
      max_det: self.max_det,
    })
  }
}

impl Yolo11 {
  pub fn metadata(&self) -> &ModelMetadata {
    &self.metadata
  }

  pub fn target(&self) -> ExecutionTarget {
    self.target
  }

  /// 实际加载的 ONNX 文件
  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  /// 原始权重路径；从导出包加载时取自清单，导出包以此命名
  pub fn source_path(&self) -> &Path {
    &self.source_path
  }

  /// 类别数；元数据未给出且尚未推理时为 `None`
  pub fn num_classes(&self) -> Option<usize> {
    (!self.labels.is_empty()).then_some(self.labels.len())
  }
}

impl Model for Yolo11 {
  type Input = RgbFrame;
  type Output = DetectResult<ClassLabel>;
  type Error = Yolo11Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let start = Instant::now();
    let (input_w, input_h) = self.metadata.imgsz;

    debug!("预处理: {}x{} -> {}x{}", input.width(), input.height(), input_w, input_h);
    let (canvas, lb) = letterbox(input.image(), input_w, input_h);
    let tensor = to_nchw_f32(&canvas).into_dyn();

    debug!("执行模型推理");
    let candidates = {
      let outputs = self
        .session
        .run(ort::inputs![
          TensorRef::from_array_view(tensor.view()).map_err(Yolo11Error::ort("构造输入张量"))?
        ])
        .map_err(Yolo11Error::ort("推理"))?;
      let output = outputs[0]
        .try_extract_array::<f32>()
        .map_err(Yolo11Error::ort("读取输出张量"))?;
      // outputs 仍借用 session，这里只访问其他字段
      let num_classes = match self.labels.len() {
        n if n > 0 => n,
        _ => {
          let n = postprocess::infer_num_classes(output.shape())
            .ok_or_else(|| Yolo11Error::UnexpectedOutput(output.shape().to_vec()))?;
          debug!("由输出形状推断类别数: {}", n);
          self.labels = fallback_names(n);
          n
        }
      };
      postprocess::decode(output.view(), num_classes, self.confidence)
        .ok_or_else(|| Yolo11Error::UnexpectedOutput(output.shape().to_vec()))?
    };

    let kept = postprocess::nms(candidates, self.iou, self.max_det);

    let (orig_w, orig_h) = (input.width() as f32, input.height() as f32);
    let items = kept
      .into_iter()
      .map(|c| {
        let [x1, y1, x2, y2] = lb.unmap(c.bbox);
        DetectItem {
          kind: ClassLabel {
            id: c.class_id,
            name: self
              .labels
              .get(c.class_id as usize)
              .cloned()
              .unwrap_or_else(|| format!("class{}", c.class_id)),
          },
          score: c.score,
          bbox: [x1 / orig_w, y1 / orig_h, x2 / orig_w, y2 / orig_h],
        }
      })
      .collect::<Vec<_>>();

    debug!("检测到 {} 个物体", items.len());

    Ok(DetectResult {
      items: items.into_boxed_slice(),
      shape: (input.width(), input.height()),
      elapsed: start.elapsed(),
    })
  }
}
