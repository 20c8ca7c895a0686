// 该文件是 Rizhao （日照） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod args;
pub mod config;
pub mod detector;
pub mod estimate;
pub mod frame;
pub mod input;
pub mod irradiance;
pub mod model;
pub mod output;
pub mod session;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 还原 `scheme://host/path` 或 `scheme:path` 形式 URL 指向的本地路径，
/// 主机部分视为相对路径的第一段，各部分按百分号编码解码
pub fn path_from_url(url: &url::Url) -> Result<std::path::PathBuf, std::string::FromUtf8Error> {
  let path = urlencoding::decode(url.path())?;
  let path = match url.host_str() {
    Some(host) if !host.is_empty() => format!("{}{}", urlencoding::decode(host)?, path),
    _ => path.into_owned(),
  };
  Ok(std::path::PathBuf::from(path))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;
  use url::Url;

  fn path_of(url: &str) -> PathBuf {
    path_from_url(&Url::parse(url).unwrap()).unwrap()
  }

  #[test]
  fn host_is_the_first_relative_segment() {
    assert_eq!(path_of("record://records/roof.txt"), PathBuf::from("records/roof.txt"));
    assert_eq!(path_of("yolo26://models/best3.rknn"), PathBuf::from("models/best3.rknn"));
  }

  #[test]
  fn opaque_and_absolute_paths() {
    assert_eq!(path_of("yolo26:models/best1.rknn"), PathBuf::from("models/best1.rknn"));
    assert_eq!(path_of("record:///tmp/roof.txt"), PathBuf::from("/tmp/roof.txt"));
  }

  #[test]
  fn percent_encoding_is_decoded() {
    assert_eq!(
      path_of("record:///tmp/my dir/roof.txt"),
      PathBuf::from("/tmp/my dir/roof.txt")
    );
    assert_eq!(
      path_of("record:///data/日照/屋顶.txt"),
      PathBuf::from("/data/日照/屋顶.txt")
    );
  }
}
