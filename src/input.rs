// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame};

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

mod remote_image;
pub use self::remote_image::{RemoteImageInput, RemoteImageInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Remote image input error: {0}")]
  RemoteImageInputError(#[from] RemoteImageInputError),
  #[error("Invalid source '{0}': {1}")]
  InvalidSource(String, String),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 将命令行中的输入来源转换为 URL
///
/// 已带有方案的字符串（`https://`、`image:` 等）保持不变，
/// 其余按本地路径处理并转换为绝对的 `file://` URL。
pub fn parse_source(source: &str) -> Result<Url, InputError> {
  if let Ok(url) = Url::parse(source) {
    // Windows 盘符（如 `C:\a.jpg`）会被解析成单字母方案
    if url.scheme().len() > 1 {
      return Ok(url);
    }
  }

  let path = std::path::Path::new(source);
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    std::env::current_dir()
      .map_err(|e| InputError::InvalidSource(source.to_string(), e.to_string()))?
      .join(path)
  };

  Url::from_file_path(&absolute)
    .map_err(|_| InputError::InvalidSource(source.to_string(), "无法转换为文件 URL".to_string()))
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  RemoteImage(RemoteImageInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME | "file" => {
        let input = ImageFileInput::from_url(url)?;
        Ok(InputWrapper::ReadImageFile(input))
      }
      "http" | "https" => {
        let input = RemoteImageInput::from_url(url)?;
        Ok(InputWrapper::RemoteImage(input))
      }
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl InputWrapper {
  /// 与 `from_url` 相同，但远程图像会额外缓存到 `cache_dir`
  pub fn from_url_with_cache(
    url: &Url,
    cache_dir: Option<&std::path::Path>,
  ) -> Result<Self, InputError> {
    match (url.scheme(), cache_dir) {
      ("http" | "https", Some(dir)) => {
        let input = RemoteImageInput::fetch(url, Some(dir))?;
        Ok(InputWrapper::RemoteImage(input))
      }
      _ => Self::from_url(url),
    }
  }

  pub fn into_frames(self) -> InputFrames {
    match self {
      InputWrapper::ReadImageFile(input) => InputFrames::ReadImageFile(input.into_frames()),
      InputWrapper::RemoteImage(input) => InputFrames::RemoteImage(input.into_frames()),
    }
  }
}

pub enum InputFrames {
  ReadImageFile(self::read_image_file::ImageFileFrames),
  RemoteImage(self::remote_image::RemoteImageFrames),
}

impl Iterator for InputFrames {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputFrames::ReadImageFile(input) => input.next(),
      InputFrames::RemoteImage(input) => input.next(),
    }
  }
}
