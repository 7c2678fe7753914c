//! 合成フレームソース
//!
//! 実カメラの代わりに、専用の配信スレッドからテストパターンのフレームを
//! 一定間隔で生成する。配信のタイミング・停止保証・コミット時の
//! デバイス切り替えは実デバイス版と同じ契約で実装する。

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::domain::{
    CameraDevice, CameraError, CameraResult, CaptureConfig, DeviceInput, Facing, FrameHandler,
    FrameSourcePort, PixelFormat, RawFrame, SessionPreset,
};

/// 配信スレッドと設定側で共有する状態
struct Shared {
    /// コミット済みのアクティブデバイス（配信中の切り替えはここへ反映）
    device: Mutex<Option<CameraDevice>>,
    stop: AtomicBool,
}

/// 合成フレームソース
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    interval: std::time::Duration,
    photo_preset_supported: bool,
    shared: Arc<Shared>,
    delivery_thread: Option<JoinHandle<()>>,
}

impl SyntheticFrameSource {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            width: config.frame_width,
            height: config.frame_height,
            interval: config.frame_interval(),
            photo_preset_supported: config.photo_preset_supported,
            shared: Arc::new(Shared {
                device: Mutex::new(None),
                stop: AtomicBool::new(false),
            }),
            delivery_thread: None,
        }
    }
}

/// 向きとシーケンス番号から決まるBGRAテストパターンを書き込む
///
/// 背面は青みがかった、前面は赤みがかったグラデーションになる。
fn fill_test_pattern(buffer: &mut [u8], facing: Option<Facing>, sequence: u64) {
    let phase = (sequence % 256) as u8;
    for (index, pixel) in buffer.chunks_exact_mut(4).enumerate() {
        let gradient = (index % 256) as u8;
        let (b, r) = match facing {
            Some(Facing::Front) => (gradient.wrapping_add(phase), 0xC0),
            _ => (0xC0, gradient.wrapping_add(phase)),
        };
        pixel[0] = b;
        pixel[1] = 0x40;
        pixel[2] = r;
        pixel[3] = 0xFF;
    }
}

impl FrameSourcePort for SyntheticFrameSource {
    fn create_input(&mut self, device: &CameraDevice) -> CameraResult<DeviceInput> {
        Ok(DeviceInput {
            device: device.clone(),
        })
    }

    fn can_add_input(&self, _input: &DeviceInput) -> bool {
        true
    }

    fn supports_preset(&self, preset: SessionPreset) -> bool {
        match preset {
            SessionPreset::Photo => self.photo_preset_supported,
            SessionPreset::Standard => true,
        }
    }

    fn apply_configuration(
        &mut self,
        preset: SessionPreset,
        device: Option<&CameraDevice>,
    ) -> CameraResult<()> {
        *self.shared.device.lock().unwrap() = device.cloned();
        tracing::debug!(
            ?preset,
            device = device.map(|d| d.id.as_str()).unwrap_or("none"),
            "Frame source configuration applied"
        );
        Ok(())
    }

    fn start_delivery(&mut self, mut handler: FrameHandler) -> CameraResult<()> {
        if self.delivery_thread.is_some() {
            return Err(CameraError::invalid_state(
                "start_delivery",
                "delivery thread already running",
            ));
        }
        self.shared.stop.store(false, Ordering::Relaxed);

        let shared = Arc::clone(&self.shared);
        let width = self.width;
        let height = self.height;
        let interval = self.interval;

        let thread = std::thread::Builder::new()
            .name("frame-delivery".to_string())
            .spawn(move || {
                tracing::info!(width, height, "Frame delivery started");
                // サイズ計算はusizeで行う（u32の乗算は大きな解像度で溢れる）
                let mut buffer = vec![0u8; width as usize * height as usize * 4];
                let mut sequence: u64 = 0;

                while !shared.stop.load(Ordering::Relaxed) {
                    let facing = shared.device.lock().unwrap().as_ref().map(|d| d.facing);
                    fill_test_pattern(&mut buffer, facing, sequence);

                    handler(RawFrame {
                        data: &buffer,
                        width,
                        height,
                        format: PixelFormat::Bgra8,
                        sequence,
                        timestamp: Instant::now(),
                    });

                    sequence += 1;
                    std::thread::sleep(interval);
                }
                tracing::info!(frames = sequence, "Frame delivery stopped");
            })
            .map_err(|e| {
                CameraError::Configuration(format!("failed to spawn delivery thread: {}", e))
            })?;

        self.delivery_thread = Some(thread);
        Ok(())
    }

    fn stop_delivery(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.delivery_thread.take() {
            // 進行中のコールバックの完了を待つ。以後フレームは届かない
            let _ = thread.join();
        }
    }
}

impl Drop for SyntheticFrameSource {
    fn drop(&mut self) {
        self.stop_delivery();
    }
}
