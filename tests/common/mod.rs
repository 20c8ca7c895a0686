// 该文件是 Rizhao （日照） 项目的一部分。
// tests/common/mod.rs - 集成测试公共工具
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

use std::{
  io::{BufRead, BufReader, Write},
  net::TcpListener,
  path::{Path, PathBuf},
  sync::mpsc::{self, Receiver},
  thread,
};

use image::RgbImage;
use tempfile::TempDir;

pub const PVGIS_BODY: &str =
  r#"{"inputs": {"location": {}}, "outputs": {"totals": {"fixed": {"E_d": 5.0, "E_y": 1825.0}}}}"#;

/// 只应答一次的本地 HTTP 服务，返回 (接口地址, 请求行接收端)
pub fn one_shot_server(status: &str, body: &'static str) -> (String, Receiver<String>) {
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let addr = listener.local_addr().unwrap();
  let status = status.to_string();
  let (tx, rx) = mpsc::channel();

  thread::spawn(move || {
    let Ok((mut stream, _)) = listener.accept() else {
      return;
    };
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    loop {
      let mut header = String::new();
      if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
        break;
      }
    }
    let _ = tx.send(request_line.trim_end().to_string());

    write!(
      stream,
      "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      status,
      body.len(),
      body
    )
    .unwrap();
    stream.flush().unwrap();
  });

  (format!("http://{}/api/v5_2/PVcalc", addr), rx)
}

/// 临时目录中的测试图像与检测记录
pub struct Scene {
  pub dir: TempDir,
  pub image: PathBuf,
  pub record: PathBuf,
}

impl Scene {
  pub fn new(width: u32, height: u32, record: &str) -> Self {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("roof.png");
    RgbImage::new(width, height).save(&image).unwrap();
    let record_path = dir.path().join("roof.txt");
    std::fs::write(&record_path, record).unwrap();
    Self {
      dir,
      image,
      record: record_path,
    }
  }

  pub fn record_url(&self) -> String {
    format!("record://{}", self.record.display())
  }

  pub fn path(&self, name: &str) -> PathBuf {
    self.dir.path().join(name)
  }

  /// 写入一个把 Replay 模型指向检测记录的配置文件
  pub fn config(&self, extra: &str) -> PathBuf {
    let path = self.path("rizhao.toml");
    let text = format!(
      "model = \"Replay\"\n{}\n[models]\nReplay = \"{}\"\n",
      extra,
      self.record_url()
    );
    std::fs::write(&path, text).unwrap();
    path
  }
}

pub fn exists(path: &Path) -> bool {
  path.is_file() && std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}
