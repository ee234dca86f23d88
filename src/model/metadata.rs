// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/model/metadata.rs - ONNX 模型元数据解析
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

use tracing::{debug, warn};

use crate::model::COCO_CLASSES;

pub const DEFAULT_IMGSZ: u32 = 640;

/// YOLO 导出时写入 ONNX 的自定义元数据
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
  /// 类别名称；为空表示模型未提供，类别数由输出形状推断
  pub names: Vec<String>,
  /// (宽, 高)
  pub imgsz: (u32, u32),
  pub task: Option<String>,
  pub description: Option<String>,
}

impl Default for ModelMetadata {
  fn default() -> Self {
    Self {
      names: Vec::new(),
      imgsz: (DEFAULT_IMGSZ, DEFAULT_IMGSZ),
      task: None,
      description: None,
    }
  }
}

impl ModelMetadata {
  /// 从键值查询函数构造，缺失或无法解析的字段使用默认值
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let mut meta = Self::default();

    if let Some(raw) = lookup("names") {
      match parse_names(&raw) {
        Some(names) if !names.is_empty() => meta.names = names,
        _ => warn!("无法解析类别名称元数据，类别数将由输出推断: {}", raw),
      }
    }

    if let Some(raw) = lookup("imgsz") {
      match parse_imgsz(&raw) {
        Some(imgsz) => meta.imgsz = imgsz,
        None => warn!("无法解析输入尺寸元数据，使用默认值 {}: {}", DEFAULT_IMGSZ, raw),
      }
    }

    meta.task = lookup("task");
    meta.description = lookup("description");

    debug!(
      "模型元数据: {} 个类别, 输入尺寸 {}x{}, 任务 {:?}",
      meta.names.len(),
      meta.imgsz.0,
      meta.imgsz.1,
      meta.task
    );
    meta
  }

  /// 元数据是否给出了类别名称
  pub fn has_names(&self) -> bool {
    !self.names.is_empty()
  }
}

/// 元数据缺少类别名称时使用的标签：80 类使用 COCO 名称，其余为 `class{id}`
pub fn fallback_names(num_classes: usize) -> Vec<String> {
  if num_classes == COCO_CLASSES.len() {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
  } else {
    (0..num_classes).map(|id| format!("class{}", id)).collect()
  }
}

/// 解析 `{0: 'person', 1: 'bicycle'}` 形式的类别表，按编号排列
pub fn parse_names(raw: &str) -> Option<Vec<String>> {
  let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
  let mut chars = body.chars().peekable();
  let mut entries: Vec<(usize, String)> = Vec::new();

  loop {
    while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
      chars.next();
    }
    if chars.peek().is_none() {
      break;
    }

    let mut id = String::new();
    while let Some(c) = chars.peek().copied().filter(|c| c.is_ascii_digit()) {
      id.push(c);
      chars.next();
    }
    let id: usize = id.parse().ok()?;

    while chars.peek().is_some_and(|c| c.is_whitespace()) {
      chars.next();
    }
    if chars.next()? != ':' {
      return None;
    }
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
      chars.next();
    }

    let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;
    let mut name = String::new();
    loop {
      let c = chars.next()?;
      if c == quote {
        break;
      }
      name.push(c);
    }
    entries.push((id, name));
  }

  entries.sort_by_key(|(id, _)| *id);
  // 编号必须连续
  if entries.iter().enumerate().any(|(i, (id, _))| i != *id) {
    return None;
  }
  Some(entries.into_iter().map(|(_, name)| name).collect())
}

/// 解析 `[640, 640]`（高, 宽）或单个整数
pub fn parse_imgsz(raw: &str) -> Option<(u32, u32)> {
  let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
  let dims: Vec<u32> = trimmed
    .split(',')
    .map(|s| s.trim().parse::<u32>())
    .collect::<Result<_, _>>()
    .ok()?;

  match dims.as_slice() {
    [s] if *s > 0 => Some((*s, *s)),
    [h, w] if *h > 0 && *w > 0 => Some((*w, *h)),
    _ => None,
  }
}
