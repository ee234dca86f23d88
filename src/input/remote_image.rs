// 该文件是 Zhuanyi （转译） 项目的一部分。
// src/input/remote_image.rs - 远程图像输入（HTTP/HTTPS）
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

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, frame::RgbFrame};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const FALLBACK_FILE_NAME: &str = "image.jpg";

#[derive(Error, Debug)]
pub enum RemoteImageInputError {
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
  #[error("网络错误: {0}")]
  Network(#[from] reqwest::Error),
  #[error("HTTP 状态错误: {0} ({1})")]
  Status(reqwest::StatusCode, Url),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image decoding error: {0}")]
  ImageDecodeError(#[from] image::ImageError),
}

/// 通过 HTTP(S) 下载并在内存中解码的图像
pub struct RemoteImageInput {
  frame: Option<RgbFrame>,
  cached: Option<PathBuf>,
}

impl FromUrl for RemoteImageInput {
  type Error = RemoteImageInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::fetch(url, None)
  }
}

impl RemoteImageInput {
  /// 下载图像；若给出 `cache_dir`，原始字节同时写入该目录
  pub fn fetch(url: &Url, cache_dir: Option<&Path>) -> Result<Self, RemoteImageInputError> {
    if url.scheme() != "http" && url.scheme() != "https" {
      return Err(RemoteImageInputError::SchemeMismatch(format!(
        "期望 'http' 或 'https', 实际为 '{}'",
        url.scheme()
      )));
    }

    info!("下载图像: {}", url);
    let client = reqwest::blocking::Client::builder()
      .timeout(FETCH_TIMEOUT)
      .build()?;
    let response = client.get(url.as_str()).send()?;
    let status = response.status();
    if !status.is_success() {
      warn!("下载失败，状态码: {}", status);
      return Err(RemoteImageInputError::Status(status, url.clone()));
    }
    let bytes = response.bytes()?;
    debug!("下载完成，大小: {:.2} KB", bytes.len() as f64 / 1024.0);

    let cached = match cache_dir {
      Some(dir) => {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(cache_file_name(url));
        std::fs::write(&path, &bytes)?;
        info!("图像已缓存到: {}", path.display());
        Some(path)
      }
      None => None,
    };

    let image = image::load_from_memory(&bytes)?.to_rgb8();

    Ok(RemoteImageInput {
      frame: Some(RgbFrame::new(image, url.as_str())),
      cached,
    })
  }

  /// 缓存文件路径（未设置缓存目录时为 `None`）
  pub fn cached_path(&self) -> Option<&Path> {
    self.cached.as_deref()
  }

  pub fn into_frames(self) -> RemoteImageFrames {
    RemoteImageFrames { inner: self }
  }
}

/// 取 URL 最后一段作为缓存文件名
///
/// 解码后只保留文件名部分，缓存文件始终位于缓存目录内。
fn cache_file_name(url: &Url) -> String {
  url
    .path_segments()
    .and_then(|mut segments| segments.next_back())
    .map(|name| {
      urlencoding::decode(name)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| name.to_string())
    })
    .and_then(|decoded| {
      Path::new(&decoded)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
    })
    .filter(|name| !name.is_empty() && name != "..")
    .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

pub struct RemoteImageFrames {
  inner: RemoteImageInput,
}

impl Iterator for RemoteImageFrames {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.inner.frame.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cache_name_uses_last_segment() {
    let url = Url::parse("https://ultralytics.com/images/bus.jpg").unwrap();
    assert_eq!(cache_file_name(&url), "bus.jpg");

    let url = Url::parse("https://example.com/a%20b.png?x=1").unwrap();
    assert_eq!(cache_file_name(&url), "a b.png");

    let url = Url::parse("https://example.com/").unwrap();
    assert_eq!(cache_file_name(&url), FALLBACK_FILE_NAME);
  }

  #[test]
  fn cache_name_never_leaves_cache_dir() {
    let url = Url::parse("https://example.com/img/%2Ftmp%2Fowned.jpg").unwrap();
    assert_eq!(cache_file_name(&url), "owned.jpg");

    let url = Url::parse("https://example.com/img/..%2F..%2Fetc%2Fx.jpg").unwrap();
    assert_eq!(cache_file_name(&url), "x.jpg");

    let url = Url::parse("https://example.com/img/%2E%2E").unwrap();
    assert_eq!(cache_file_name(&url), FALLBACK_FILE_NAME);

    let url = Url::parse("https://example.com/img/a%2F").unwrap();
    let name = cache_file_name(&url);
    let dir = Path::new("/cache");
    assert!(dir.join(&name).starts_with(dir));
    assert_eq!(dir.join(&name).parent(), Some(dir));
  }

  #[test]
  fn rejects_non_http_scheme() {
    let url = Url::parse("ftp://example.com/bus.jpg").unwrap();
    assert!(matches!(
      RemoteImageInput::from_url(&url),
      Err(RemoteImageInputError::SchemeMismatch(_))
    ));
  }
}
