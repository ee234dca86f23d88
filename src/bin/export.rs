// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/bin/export.rs - 仅导出模型
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

use zhuanyi::{
  export::{Export, ExportFormat},
  model::Yolo11Builder,
};

/// 导出参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 权重文件路径
  #[arg(long, default_value = "yolo11m.onnx", value_name = "MODEL")]
  pub model: String,
  /// 导出格式: onnx, coreml, cuda, engine
  #[arg(long, default_value = "coreml", value_name = "FORMAT")]
  pub format: ExportFormat,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("导出格式: {}", args.format);

  let model = Yolo11Builder::from_source(&args.model)?.build()?;
  let artifact = model.export(args.format)?;

  println!("{}", artifact.display());

  Ok(())
}
