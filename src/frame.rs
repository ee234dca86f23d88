// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/frame.rs - 图像帧与 letterbox 预处理
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

use image::{Rgb, RgbImage, imageops::FilterType};
use ndarray::Array4;

const RGB_CHANNELS: usize = 3;
const LETTERBOX_COLOR: u8 = 114;

/// 解码后的 RGB 图像帧
#[derive(Debug, Clone)]
pub struct RgbFrame {
  image: RgbImage,
  source: String,
}

impl RgbFrame {
  pub fn new(image: RgbImage, source: impl Into<String>) -> Self {
    Self {
      image,
      source: source.into(),
    }
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn into_image(self) -> RgbImage {
    self.image
  }

  /// 帧来源（文件路径或 URL）
  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

/// letterbox 变换参数，用于把模型坐标映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub pad_x: u32,
  pub pad_y: u32,
  /// 原图宽度
  pub width: u32,
  /// 原图高度
  pub height: u32,
}

impl Letterbox {
  pub fn new(width: u32, height: u32, target_w: u32, target_h: u32) -> Self {
    let scale = (target_w as f32 / width as f32).min(target_h as f32 / height as f32);
    let (new_w, new_h) = Self::resized_dims(width, height, scale);
    Self {
      scale,
      pad_x: target_w.saturating_sub(new_w) / 2,
      pad_y: target_h.saturating_sub(new_h) / 2,
      width,
      height,
    }
  }

  fn resized_dims(width: u32, height: u32, scale: f32) -> (u32, u32) {
    (
      ((width as f32 * scale).round() as u32).max(1),
      ((height as f32 * scale).round() as u32).max(1),
    )
  }

  /// 将模型输入空间中的 [x_min, y_min, x_max, y_max] 映射回原图像素坐标
  pub fn unmap(&self, bbox: [f32; 4]) -> [f32; 4] {
    let (w, h) = (self.width as f32, self.height as f32);
    let (px, py) = (self.pad_x as f32, self.pad_y as f32);
    [
      ((bbox[0] - px) / self.scale).clamp(0.0, w),
      ((bbox[1] - py) / self.scale).clamp(0.0, h),
      ((bbox[2] - px) / self.scale).clamp(0.0, w),
      ((bbox[3] - py) / self.scale).clamp(0.0, h),
    ]
  }
}

/// 等比缩放并以灰色填充到目标尺寸
pub fn letterbox(image: &RgbImage, target_w: u32, target_h: u32) -> (RgbImage, Letterbox) {
  let lb = Letterbox::new(image.width(), image.height(), target_w, target_h);
  let (new_w, new_h) = Letterbox::resized_dims(image.width(), image.height(), lb.scale);

  let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);
  let mut canvas = RgbImage::from_pixel(target_w, target_h, Rgb([LETTERBOX_COLOR; 3]));
  image::imageops::replace(&mut canvas, &resized, lb.pad_x as i64, lb.pad_y as i64);

  (canvas, lb)
}

/// 转换为 [1, 3, H, W] 的 f32 张量，数值归一化到 0~1
pub fn to_nchw_f32(image: &RgbImage) -> Array4<f32> {
  let (width, height) = image.dimensions();
  let mut tensor = Array4::<f32>::zeros((1, RGB_CHANNELS, height as usize, width as usize));

  for (x, y, pixel) in image.enumerate_pixels() {
    for c in 0..RGB_CHANNELS {
      tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
    }
  }

  tensor
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn letterbox_portrait_pads_horizontally() {
    let lb = Letterbox::new(810, 1080, 640, 640);
    assert!((lb.scale - 640.0 / 1080.0).abs() < 1e-6);
    assert_eq!(lb.pad_y, 0);
    assert_eq!(lb.pad_x, 80);
  }

  #[test]
  fn odd_padding_uses_pasted_offset() {
    // 3x1 -> 64x64: 缩放后高 21，上下共 43 行填充
    let image = RgbImage::from_pixel(3, 1, Rgb([255, 0, 0]));
    let (canvas, lb) = letterbox(&image, 64, 64);
    assert_eq!(lb.pad_y, 21);
    assert_eq!(canvas.get_pixel(32, 20), &Rgb([LETTERBOX_COLOR; 3]));
    assert_eq!(canvas.get_pixel(32, 21), &Rgb([255, 0, 0]));
    assert_eq!(canvas.get_pixel(32, 41), &Rgb([255, 0, 0]));
    assert_eq!(canvas.get_pixel(32, 42), &Rgb([LETTERBOX_COLOR; 3]));

    // 图像首行在模型空间中位于 pad_y，映射回原图应为 0
    let restored = lb.unmap([0.0, 21.0 + 0.5 * lb.scale, 64.0, 42.0]);
    assert!((restored[1] - 0.5).abs() < 1e-4, "{}", restored[1]);
  }

  #[test]
  fn unmap_inverts_letterbox() {
    let lb = Letterbox::new(1280, 720, 640, 640);
    // 原图中 (100, 100) - (300, 200) 的框
    let model_box = [
      100.0 * lb.scale + lb.pad_x as f32,
      100.0 * lb.scale + lb.pad_y as f32,
      300.0 * lb.scale + lb.pad_x as f32,
      200.0 * lb.scale + lb.pad_y as f32,
    ];
    let restored = lb.unmap(model_box);
    for (a, b) in restored.iter().zip([100.0, 100.0, 300.0, 200.0]) {
      assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }
  }

  #[test]
  fn unmap_clamps_to_image() {
    let lb = Letterbox::new(100, 100, 640, 640);
    let restored = lb.unmap([-50.0, -50.0, 700.0, 700.0]);
    assert_eq!(restored, [0.0, 0.0, 100.0, 100.0]);
  }

  #[test]
  fn letterbox_output_has_target_size_and_padding_color() {
    let image = RgbImage::from_pixel(200, 100, Rgb([255, 0, 0]));
    let (canvas, lb) = letterbox(&image, 64, 64);
    assert_eq!(canvas.dimensions(), (64, 64));
    assert_eq!(lb.pad_y, 16);
    assert_eq!(canvas.get_pixel(0, 0), &Rgb([LETTERBOX_COLOR; 3]));
    assert_eq!(canvas.get_pixel(32, 32), &Rgb([255, 0, 0]));
  }

  #[test]
  fn nchw_tensor_is_planar_and_normalized() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 0]));
    image.put_pixel(1, 0, Rgb([0, 0, 255]));
    let tensor = to_nchw_f32(&image);
    assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
    assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
    assert_eq!(tensor[[0, 2, 0, 0]], 0.0);
    assert_eq!(tensor[[0, 2, 0, 1]], 1.0);
  }
}
