// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;
use zhuanyi::export::ExportFormat;

/// Zhuanyi 项目参数配置
///
/// 不带任何参数运行时：加载 yolo11m.onnx，导出为 CoreML 导出包，
/// 重新加载导出包并对示例图片推理一次。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 权重文件路径（或 yolo11:// URL）
  #[arg(long, default_value = "yolo11m.onnx", value_name = "MODEL")]
  pub model: String,

  /// 导出格式: onnx, coreml, cuda, engine
  #[arg(long, default_value = "coreml", value_name = "FORMAT")]
  pub format: ExportFormat,

  /// 输入来源（本地路径、file://、image:// 或 http(s):// URL）
  #[arg(long, default_value = "https://ultralytics.com/images/bus.jpg", value_name = "SOURCE")]
  pub source: String,

  /// 输出路径，支持 image:// 与 json://，不指定则只输出日志
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub conf: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.7", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 每张图最多保留的检测数
  #[arg(long, default_value = "300", value_name = "COUNT")]
  pub max_det: usize,

  /// ONNX Runtime 算子内线程数
  #[arg(long, value_name = "COUNT")]
  pub threads: Option<usize>,

  /// 远程图片缓存目录
  #[arg(long, value_name = "DIR")]
  pub cache_dir: Option<PathBuf>,
}
