// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::model::{DetectItem, DetectResult, WithLabel};

const BOX_THICKNESS: i32 = 2;
const PALETTE_SIZE: u32 = 80;

pub struct Draw {
  thickness: i32,
  colors: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    // 每个类别一种颜色，色相均匀分布
    let colors = (0..PALETTE_SIZE)
      .map(|i| {
        let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      thickness: BOX_THICKNESS,
      colors,
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = match h as u32 {
    0..60 => (c, x, 0.0),
    60..120 => (x, c, 0.0),
    120..180 => (0.0, c, x),
    180..240 => (0.0, x, c),
    240..300 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };

  Rgb([
    ((r + m) * 255.0).round() as u8,
    ((g + m) * 255.0).round() as u8,
    ((b + m) * 255.0).round() as u8,
  ])
}

impl Draw {
  pub fn color_for(&self, class_id: u32) -> Rgb<u8> {
    self.colors[class_id as usize % self.colors.len()]
  }

  // bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &[f32; 4], color: Rgb<u8>) {
    let (w, h) = (image.width() as f32, image.height() as f32);

    let x_min = ((bbox[0] * w).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((bbox[1] * h).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((bbox[2] * w).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((bbox[3] * h).ceil() as i32).clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    for t in 0..self.thickness {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  pub fn draw_detections_on_image<T: WithLabel>(&self, image: &mut RgbImage, result: &DetectResult<T>) {
    for DetectItem { kind, bbox, .. } in result.items.iter() {
      self.draw_bbox(image, bbox, self.color_for(kind.to_label_id()));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::ClassLabel;
  use std::time::Duration;

  #[test]
  fn hsv_primary_colors() {
    assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Rgb([255, 0, 0]));
    assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), Rgb([0, 255, 0]));
    assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), Rgb([0, 0, 255]));
  }

  #[test]
  fn draws_box_edges_only() {
    let draw = Draw::default();
    let mut image = RgbImage::new(100, 100);
    let result = DetectResult {
      items: vec![DetectItem {
        kind: ClassLabel {
          id: 0,
          name: "person".to_string(),
        },
        score: 0.9,
        bbox: [0.1, 0.1, 0.5, 0.5],
      }]
      .into_boxed_slice(),
      shape: (100, 100),
      elapsed: Duration::ZERO,
    };
    draw.draw_detections_on_image(&mut image, &result);

    let color = draw.color_for(0);
    assert_eq!(image.get_pixel(10, 10), &color);
    assert_eq!(image.get_pixel(30, 10), &color);
    assert_eq!(image.get_pixel(30, 30), &Rgb([0, 0, 0]));
  }
}
