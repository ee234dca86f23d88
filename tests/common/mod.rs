// 该文件是 Zhuanyi （转译） 项目的一部分。
// tests/common/mod.rs - 测试用的最小 YOLO 形式 ONNX 模型
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

#![allow(dead_code)]

use std::path::Path;

/// 输出固定预测的检测模型
///
/// 图结构为 `output0 = predictions + ReduceSum(images) * 0`，
/// 输入 `[1, 3, imgsz, imgsz]`，输出 `[1, 4 + nc, N]`。
pub struct TinyDetector {
  pub imgsz: u32,
  /// `{0: 'cat', 1: 'dog'}` 形式的类别表；`None` 时不写入元数据
  pub names: Option<&'static str>,
  /// 每个候选框为 `cx, cy, w, h` 加上各类别分数
  pub boxes: Vec<Vec<f32>>,
}

impl TinyDetector {
  pub fn channels(&self) -> usize {
    self.boxes.first().map(Vec::len).unwrap_or(4)
  }

  pub fn write(&self, path: &Path) {
    std::fs::write(path, self.encode()).unwrap();
  }

  fn encode(&self) -> Vec<u8> {
    let channels = self.channels();
    let num_boxes = self.boxes.len();
    let imgsz = self.imgsz as i64;

    // 通道优先排列
    let mut predictions = Vec::with_capacity(channels * num_boxes);
    for c in 0..channels {
      for b in &self.boxes {
        predictions.push(b[c]);
      }
    }

    let mut graph = Vec::new();
    message(&mut graph, 1, &node(&["images"], "sum", "ReduceSum", &[("keepdims", 0)]));
    message(&mut graph, 1, &node(&["sum", "zero"], "masked", "Mul", &[]));
    message(&mut graph, 1, &node(&["predictions", "masked"], "output0", "Add", &[]));
    string(&mut graph, 2, "tiny_detector");
    message(
      &mut graph,
      5,
      &tensor("predictions", &[1, channels as i64, num_boxes as i64], &predictions),
    );
    message(&mut graph, 5, &tensor("zero", &[], &[0.0]));
    message(&mut graph, 11, &value_info("images", &[1, 3, imgsz, imgsz]));
    message(
      &mut graph,
      12,
      &value_info("output0", &[1, channels as i64, num_boxes as i64]),
    );

    let mut opset = Vec::new();
    varint_field(&mut opset, 2, 13);

    let mut model = Vec::new();
    varint_field(&mut model, 1, 8);
    string(&mut model, 2, "zhuanyi-tests");
    message(&mut model, 7, &graph);
    message(&mut model, 8, &opset);
    message(&mut model, 14, &entry("imgsz", &format!("[{}, {}]", imgsz, imgsz)));
    message(&mut model, 14, &entry("task", "detect"));
    if let Some(names) = self.names {
      message(&mut model, 14, &entry("names", names));
    }
    model
  }
}

fn varint(buf: &mut Vec<u8>, mut value: u64) {
  while value >= 0x80 {
    buf.push((value as u8 & 0x7f) | 0x80);
    value >>= 7;
  }
  buf.push(value as u8);
}

fn key(buf: &mut Vec<u8>, field: u32, wire: u32) {
  varint(buf, ((field << 3) | wire) as u64);
}

fn varint_field(buf: &mut Vec<u8>, field: u32, value: i64) {
  key(buf, field, 0);
  varint(buf, value as u64);
}

fn bytes(buf: &mut Vec<u8>, field: u32, data: &[u8]) {
  key(buf, field, 2);
  varint(buf, data.len() as u64);
  buf.extend_from_slice(data);
}

fn string(buf: &mut Vec<u8>, field: u32, value: &str) {
  bytes(buf, field, value.as_bytes());
}

fn message(buf: &mut Vec<u8>, field: u32, inner: &[u8]) {
  bytes(buf, field, inner);
}

fn node(inputs: &[&str], output: &str, op_type: &str, int_attrs: &[(&str, i64)]) -> Vec<u8> {
  let mut buf = Vec::new();
  for input in inputs {
    string(&mut buf, 1, input);
  }
  string(&mut buf, 2, output);
  string(&mut buf, 3, output);
  string(&mut buf, 4, op_type);
  for (name, value) in int_attrs {
    let mut attr = Vec::new();
    string(&mut attr, 1, name);
    varint_field(&mut attr, 3, *value);
    // AttributeProto.type = INT
    varint_field(&mut attr, 20, 2);
    message(&mut buf, 5, &attr);
  }
  buf
}

fn tensor(name: &str, dims: &[i64], values: &[f32]) -> Vec<u8> {
  let mut buf = Vec::new();
  for dim in dims {
    varint_field(&mut buf, 1, *dim);
  }
  // TensorProto.data_type = FLOAT
  varint_field(&mut buf, 2, 1);
  string(&mut buf, 8, name);
  let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
  bytes(&mut buf, 9, &raw);
  buf
}

fn value_info(name: &str, dims: &[i64]) -> Vec<u8> {
  let mut shape = Vec::new();
  for dim in dims {
    let mut d = Vec::new();
    varint_field(&mut d, 1, *dim);
    message(&mut shape, 1, &d);
  }
  let mut tensor_type = Vec::new();
  varint_field(&mut tensor_type, 1, 1);
  message(&mut tensor_type, 2, &shape);
  let mut type_proto = Vec::new();
  message(&mut type_proto, 1, &tensor_type);

  let mut buf = Vec::new();
  string(&mut buf, 1, name);
  message(&mut buf, 2, &type_proto);
  buf
}

fn entry(key_name: &str, value: &str) -> Vec<u8> {
  let mut buf = Vec::new();
  string(&mut buf, 1, key_name);
  string(&mut buf, 2, value);
  buf
}

#[test]
fn varint_encoding_matches_protobuf() {
  let mut buf = Vec::new();
  varint(&mut buf, 300);
  assert_eq!(buf, [0xac, 0x02]);

  let mut buf = Vec::new();
  varint_field(&mut buf, 20, 2);
  assert_eq!(buf, [0xa0, 0x01, 0x02]);
}
