//! コンソール表示アダプタ
//!
//! 描画面を持たない環境向けの表示シンク。表示された画像の概要を
//! ログとして出力する。UIループ（メインスレッド）からのみ呼ばれる。

use crate::domain::{DisplaySinkPort, StillImage, SurfaceHandle};

#[derive(Default)]
pub struct ConsoleDisplayAdapter {
    surfaces: u64,
    presented: u64,
}

impl ConsoleDisplayAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySinkPort for ConsoleDisplayAdapter {
    fn install_preview(&mut self) -> SurfaceHandle {
        self.surfaces += 1;
        tracing::info!(surface = self.surfaces, "Preview surface created");
        SurfaceHandle(self.surfaces)
    }

    fn present(&mut self, image: StillImage) {
        self.presented += 1;
        tracing::info!(
            width = image.width,
            height = image.height,
            bytes = image.data.len(),
            total = self.presented,
            "Captured image presented"
        );
    }
}
