// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/bin/predict.rs - 加载模型或导出包并推理一次
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use zhuanyi::{
  FromUrl,
  input::{InputWrapper, parse_source},
  model::{ExecutionTarget, Yolo11Builder},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// 推理参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型或导出包路径
  #[arg(long, default_value = "yolo11m.mlpackage", value_name = "MODEL")]
  pub model: String,
  /// 输入来源
  #[arg(long, default_value = "https://ultralytics.com/images/bus.jpg", value_name = "SOURCE")]
  pub source: String,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,
  /// 强制使用 CPU 执行后端
  #[arg(long)]
  pub cpu: bool,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub conf: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.source);

  let mut builder = Yolo11Builder::from_source(&args.model)?.confidence(args.conf);
  if args.cpu {
    builder = builder.target(ExecutionTarget::Cpu);
  }
  let model = builder.build()?;
  let input = InputWrapper::from_url(&parse_source(&args.source)?)?;
  let output = args
    .output
    .as_ref()
    .map(OutputWrapper::from_url)
    .transpose()?;

  let result = OneShotTask.run_task(input.into_frames(), model, output)?;
  for item in result.iter() {
    info!(
      "  - {}: {:.2}% at ({:.3}, {:.3}, {:.3}, {:.3})",
      item.kind.name,
      item.score * 100.0,
      item.bbox[0],
      item.bbox[1],
      item.bbox[2],
      item.bbox[3]
    );
  }

  Ok(())
}
