// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/task.rs - 推理任务
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

use tracing::info;

use crate::{
  export::{Export, ExportFormat},
  frame::RgbFrame,
  model::{ClassLabel, DetectResult, Model, WithLabel, Yolo11Builder},
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 对第一帧做一次推理
pub struct OneShotTask;

impl<
  T: WithLabel,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbFrame>,
  M: Model<Input = RgbFrame, Output = DetectResult<T>, Error = ME>,
  O: Render<RgbFrame, DetectResult<T>, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Output = DetectResult<T>;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let result = model.infer(&frame)?;
    info!(
      "image 1/1 {}: {}x{} {}, {:.1}ms",
      frame.source(),
      frame.width(),
      frame.height(),
      result.summary(),
      result.elapsed.as_secs_f64() * 1000.0
    );
    let now = std::time::Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}

/// 加载、导出、重新加载导出包并推理一次
///
/// 输入以闭包形式给出，在第 4 步才打开（下载）。
pub struct ExportPredictTask {
  format: ExportFormat,
}

pub struct ExportPredictOutcome {
  /// 导出包路径
  pub artifact: PathBuf,
  pub result: DetectResult<ClassLabel>,
}

impl ExportPredictTask {
  pub fn new(format: ExportFormat) -> Self {
    Self { format }
  }
}

impl<
  IE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  F: FnOnce() -> Result<I, IE>,
  I: Iterator<Item = RgbFrame>,
  O: Render<RgbFrame, DetectResult<ClassLabel>, Error = RE>,
> Task<F, Yolo11Builder, O> for ExportPredictTask
{
  type Output = ExportPredictOutcome;
  type Error = anyhow::Error;

  fn run_task(self, open_input: F, model: Yolo11Builder, output: O) -> Result<Self::Output, Self::Error> {
    info!("[1/4] 加载模型");
    let source = model.clone().build()?;
    match source.num_classes() {
      Some(n) => info!("模型已加载: {}（{} 个类别）", source.model_path().display(), n),
      None => info!("模型已加载: {}（类别数待推断）", source.model_path().display()),
    }

    info!("[2/4] 导出为 {} 格式", self.format);
    let artifact = source.export(self.format)?;
    drop(source);

    info!("[3/4] 加载导出包: {}", artifact.display());
    let exported = model.with_model_path(&artifact).build()?;
    info!("导出包已加载，执行后端: {}", exported.target());

    info!("[4/4] 推理");
    let input = open_input()?;
    let result = OneShotTask.run_task(input, exported, output)?;

    Ok(ExportPredictOutcome { artifact, result })
  }
}
