// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/model/target.rs - 推理执行后端
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

use ort::session::builder::SessionBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::Yolo11Error;

/// ONNX Runtime 执行后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTarget {
  #[default]
  Cpu,
  CoreMl,
  Cuda,
  TensorRt,
}

impl std::fmt::Display for ExecutionTarget {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      ExecutionTarget::Cpu => "cpu",
      ExecutionTarget::CoreMl => "coreml",
      ExecutionTarget::Cuda => "cuda",
      ExecutionTarget::TensorRt => "tensorrt",
    };
    f.write_str(name)
  }
}

impl ExecutionTarget {
  /// 当前构建是否编译了该后端
  pub fn is_compiled(&self) -> bool {
    match self {
      ExecutionTarget::Cpu => true,
      ExecutionTarget::CoreMl => cfg!(feature = "coreml"),
      ExecutionTarget::Cuda => cfg!(feature = "cuda"),
      ExecutionTarget::TensorRt => cfg!(feature = "tensorrt"),
    }
  }

  /// 为会话注册执行后端；未编译的后端回退到 CPU
  pub(crate) fn register(self, builder: SessionBuilder) -> Result<SessionBuilder, Yolo11Error> {
    if !self.is_compiled() {
      warn!("未启用 {} 后端特性，回退到 CPU", self);
      return Ok(builder);
    }

    match self {
      ExecutionTarget::Cpu => {
        info!("使用 CPU 执行后端");
        Ok(builder)
      }
      #[cfg(feature = "coreml")]
      ExecutionTarget::CoreMl => {
        use ort::execution_providers::CoreMLExecutionProvider;
        info!("使用 CoreML 执行后端");
        builder
          .with_execution_providers([CoreMLExecutionProvider::default().build()])
          .map_err(Yolo11Error::ort("注册 CoreML 后端"))
      }
      #[cfg(feature = "cuda")]
      ExecutionTarget::Cuda => {
        use ort::execution_providers::CUDAExecutionProvider;
        info!("使用 CUDA 执行后端");
        builder
          .with_execution_providers([CUDAExecutionProvider::default().with_device_id(0).build()])
          .map_err(Yolo11Error::ort("注册 CUDA 后端"))
      }
      #[cfg(feature = "tensorrt")]
      ExecutionTarget::TensorRt => {
        use ort::execution_providers::TensorRTExecutionProvider;
        info!("使用 TensorRT 执行后端");
        builder
          .with_execution_providers([TensorRTExecutionProvider::default()
            .with_device_id(0)
            .with_fp16(true)
            .build()])
          .map_err(Yolo11Error::ort("注册 TensorRT 后端"))
      }
      #[allow(unreachable_patterns)]
      _ => Ok(builder),
    }
  }
}
