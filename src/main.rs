// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/main.rs - 项目主程序：加载、导出、重新加载并推理
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use zhuanyi::{
  FromUrl,
  input::{InputWrapper, parse_source},
  model::Yolo11Builder,
  output::OutputWrapper,
  task::{ExportPredictTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("导出格式: {}", args.format);
  info!("输入来源: {}", args.source);
  if let Some(output) = &args.output {
    info!("输出路径: {}", output);
  }
  info!("置信度阈值: {}, NMS 阈值: {}", args.conf, args.iou);

  let mut model = Yolo11Builder::from_source(&args.model)?
    .confidence(args.conf)
    .iou(args.iou)
    .max_det(args.max_det);
  if let Some(threads) = args.threads {
    model = model.intra_threads(threads);
  }

  let source = parse_source(&args.source)?;
  let output = args
    .output
    .as_ref()
    .map(OutputWrapper::from_url)
    .transpose()?;

  let cache_dir = args.cache_dir.as_deref();
  let open_input = || {
    InputWrapper::from_url_with_cache(&source, cache_dir).map(InputWrapper::into_frames)
  };

  let outcome = ExportPredictTask::new(args.format).run_task(open_input, model, output)?;

  info!("导出包: {}", outcome.artifact.display());
  info!("检测数: {}", outcome.result.len());

  Ok(())
}
