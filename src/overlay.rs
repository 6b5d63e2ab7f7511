// 该文件是 Guanlan （观澜） 项目的一部分。
// src/overlay.rs - 叠加绘制策略
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

use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// 叠加绘制模式
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayMode {
  /// 使用内置示例视频时跳过绘制，其余情况绘制
  Auto,
  /// 总是绘制
  Always,
  /// 从不绘制
  Never,
}

/// 内置示例视频路径（随仓库发布，画面里已烧录检测框）
pub fn bundled_video_path() -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR"))
    .join("assets")
    .join("video.mp4")
}

/// 决定本次运行是否绘制新的检测叠加，每次运行求值一次
///
/// auto 模式下，输入与内置示例视频是同一文件（规范化后逐字节
/// 相等）时不再绘制：示例视频自带检测框，重复绘制会叠框。
/// 判定只看路径，不看内容；示例视频被复制或改名后按用户素材
/// 对待。
pub fn should_draw(mode: OverlayMode, input: &Path, bundled: &Path) -> bool {
  match mode {
    OverlayMode::Always => true,
    OverlayMode::Never => false,
    OverlayMode::Auto => canonical(input) != canonical(bundled),
  }
}

// 规范化失败（文件不存在等）时退回原路径参与比较
fn canonical(path: &Path) -> PathBuf {
  path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn always_and_never_ignore_the_path() {
    let bundled = bundled_video_path();
    assert!(should_draw(OverlayMode::Always, &bundled, &bundled));
    assert!(should_draw(OverlayMode::Always, Path::new("other.mp4"), &bundled));
    assert!(!should_draw(OverlayMode::Never, &bundled, &bundled));
    assert!(!should_draw(OverlayMode::Never, Path::new("other.mp4"), &bundled));
  }

  #[test]
  fn auto_skips_only_the_bundled_sample() {
    let bundled = bundled_video_path();
    assert!(!should_draw(OverlayMode::Auto, &bundled, &bundled));
    assert!(should_draw(OverlayMode::Auto, Path::new("footage.mp4"), &bundled));
  }

  #[test]
  fn auto_compares_canonicalized_paths() {
    let dir = tempfile::tempdir().unwrap();
    let sample = dir.path().join("video.mp4");
    std::fs::write(&sample, b"stub").unwrap();

    // 同一文件的另一种拼写
    let spelled = dir.path().join(".").join("video.mp4");
    assert!(!should_draw(OverlayMode::Auto, &spelled, &sample));

    let other = dir.path().join("other.mp4");
    std::fs::write(&other, b"stub").unwrap();
    assert!(should_draw(OverlayMode::Auto, &other, &sample));
  }

  #[test]
  fn auto_treats_a_copy_as_user_footage() {
    let dir = tempfile::tempdir().unwrap();
    let sample = dir.path().join("video.mp4");
    let copy = dir.path().join("copy.mp4");
    std::fs::write(&sample, b"stub").unwrap();
    std::fs::write(&copy, b"stub").unwrap();

    assert!(should_draw(OverlayMode::Auto, &copy, &sample));
  }
}
