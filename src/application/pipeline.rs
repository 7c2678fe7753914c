//! フレームパイプライン
//!
//! 配信スレッド上で毎フレーム呼ばれ、キャプチャ要求が立っているフレームだけを
//! 保持画像へ変換して推論とUI表示へ振り分ける。
//!
//! # フレームごとの処理
//! 1. 要求フラグがfalseなら即破棄（コピーなし、追加処理なし。これが共通ケース）
//! 2. trueならフレームを保持画像へ変換する
//! 3. 保持画像を推論ワーカーへ非同期ディスパッチ（fire-and-forget）
//! 4. 同じ画像をUIスレッドの表示シンクへディスパッチ
//! 5. 3-4の発行後にフラグをクリアする（完了は待たない）
//!
//! 遅い・失敗する推論が後続のフレーム配信を妨げることはない。
//! フレーム単位の失敗（変換・推論）はそのフレームに閉じ、伝播しない。

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use crate::application::{dispatcher::UiDispatcher, trigger::CaptureTrigger};
use crate::domain::{ClassifierPort, FrameHandler, RawFrame, StillImage};

/// パイプライン統計（停止時のログ出力用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// 配信されたフレーム総数
    pub delivered_frames: u64,
    /// トリガーされ処理されたフレーム数
    pub triggered_frames: u64,
}

/// フレームパイプライン
pub struct FramePipeline {
    trigger: CaptureTrigger,
    classifier: Arc<dyn ClassifierPort>,
    ui: UiDispatcher,
    /// stop()後に届く遅延ディスパッチの破棄ゲート
    halted: AtomicBool,
    delivered: AtomicU64,
    triggered: AtomicU64,
}

impl FramePipeline {
    pub fn new(
        trigger: CaptureTrigger,
        classifier: Arc<dyn ClassifierPort>,
        ui: UiDispatcher,
    ) -> Self {
        Self {
            trigger,
            classifier,
            ui,
            halted: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
            triggered: AtomicU64::new(0),
        }
    }

    /// 以降のフレームとディスパッチをすべて破棄する（stop時に呼ぶ）
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Relaxed);
    }

    /// 1フレームを処理する（配信スレッド上で呼ばれる）
    pub fn on_frame(&self, frame: RawFrame<'_>) {
        if self.halted.load(Ordering::Relaxed) {
            return;
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);

        // 共通ケース: 要求なしフレームはコピーも追加処理もせず破棄
        if !self.trigger.is_requested() {
            return;
        }

        let image = match frame.retain() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Frame conversion failed: {:?}", e);
                // フラグを恒久的にtrueのまま残さない
                self.trigger.clear();
                return;
            }
        };

        self.triggered.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(sequence = frame.sequence, "Capture request fulfilled");

        // 推論は配信スレッド外の短命ワーカーで実行（fire-and-forget）
        self.spawn_classify(image.clone());

        // 表示はUIスレッドへ
        self.ui.present(image);

        // 両ディスパッチの発行後にクリア。「要求されたか」を管理するフラグで
        // あって「完了したか」ではない
        self.trigger.clear();
    }

    /// 推論ワーカーを起動する
    ///
    /// 結果はログとして消費するだけで、パイプラインへのフィードバックはない。
    /// 失敗はそのフレームの結果が出ないだけ（リトライなし）。
    fn spawn_classify(&self, image: StillImage) {
        let classifier = Arc::clone(&self.classifier);
        std::thread::spawn(move || match classifier.classify(&image) {
            Ok(result) => {
                tracing::info!(
                    label = %result.label,
                    confidence = result.confidence,
                    "Classification result"
                );
            }
            Err(e) => {
                tracing::debug!("Classification failed: {:?}", e);
            }
        });
    }

    /// 統計スナップショットを取得する
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            delivered_frames: self.delivered.load(Ordering::Relaxed),
            triggered_frames: self.triggered.load(Ordering::Relaxed),
        }
    }

    /// フレームソースへ渡す配信コールバックを作成する
    pub fn handler(self: Arc<Self>) -> FrameHandler {
        Box::new(move |frame| self.on_frame(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::UiTask;
    use crate::domain::{CameraResult, ClassificationResult, PixelFormat};
    use crossbeam_channel::Receiver;
    use std::time::{Duration, Instant};

    /// 呼び出しをチャネルへ通知するモック分類器
    struct SignalingClassifier {
        tx: crossbeam_channel::Sender<()>,
        latency: Duration,
    }

    impl ClassifierPort for SignalingClassifier {
        fn classify(&self, _image: &StillImage) -> CameraResult<ClassificationResult> {
            if !self.latency.is_zero() {
                std::thread::sleep(self.latency);
            }
            let _ = self.tx.send(());
            Ok(ClassificationResult {
                label: "mock".to_string(),
                confidence: 1.0,
            })
        }
    }

    struct Harness {
        pipeline: Arc<FramePipeline>,
        trigger: CaptureTrigger,
        classified_rx: Receiver<()>,
        ui_rx: Receiver<UiTask>,
    }

    fn harness(latency: Duration) -> Harness {
        let (classified_tx, classified_rx) = crossbeam_channel::unbounded();
        let (ui, ui_rx) = UiDispatcher::new();
        let trigger = CaptureTrigger::new();
        let pipeline = Arc::new(FramePipeline::new(
            trigger.clone(),
            Arc::new(SignalingClassifier {
                tx: classified_tx,
                latency,
            }),
            ui,
        ));
        Harness {
            pipeline,
            trigger,
            classified_rx,
            ui_rx,
        }
    }

    fn deliver_frame(pipeline: &FramePipeline, sequence: u64, buffer: &[u8]) {
        pipeline.on_frame(RawFrame {
            data: buffer,
            width: 2,
            height: 2,
            format: PixelFormat::Bgra8,
            sequence,
            timestamp: Instant::now(),
        });
    }

    fn count_presents(rx: &Receiver<UiTask>) -> usize {
        rx.try_iter()
            .filter(|task| matches!(task, UiTask::Present(_)))
            .count()
    }

    #[test]
    fn test_untriggered_frames_are_discarded() {
        let h = harness(Duration::ZERO);
        let buffer = vec![0u8; 16];

        for sequence in 0..100 {
            deliver_frame(&h.pipeline, sequence, &buffer);
        }

        // フラグが一度も立たなければ変換・推論・表示はゼロ
        assert!(h
            .classified_rx
            .recv_timeout(Duration::from_millis(50))
            .is_err());
        assert_eq!(count_presents(&h.ui_rx), 0);

        let stats = h.pipeline.stats();
        assert_eq!(stats.delivered_frames, 100);
        assert_eq!(stats.triggered_frames, 0);
    }

    #[test]
    fn test_triggered_frame_classifies_and_presents_once() {
        let h = harness(Duration::ZERO);
        let buffer = vec![0u8; 16];

        // N回の要求は1回と同じ
        h.trigger.request();
        h.trigger.request();
        h.trigger.request();

        deliver_frame(&h.pipeline, 1, &buffer);

        // 推論1回・表示1回
        h.classified_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("exactly one classification expected");
        assert!(h
            .classified_rx
            .recv_timeout(Duration::from_millis(50))
            .is_err());
        assert_eq!(count_presents(&h.ui_rx), 1);

        // 発行後にフラグはクリアされ、後続フレームは破棄される
        assert!(!h.trigger.is_requested());
        deliver_frame(&h.pipeline, 2, &buffer);
        assert_eq!(count_presents(&h.ui_rx), 0);
        assert_eq!(h.pipeline.stats().triggered_frames, 1);
    }

    #[test]
    fn test_conversion_failure_clears_flag() {
        let h = harness(Duration::ZERO);
        let short_buffer = vec![0u8; 4]; // 2x2 BGRAには足りない

        h.trigger.request();
        deliver_frame(&h.pipeline, 1, &short_buffer);

        // 変換失敗はフレーム単位に閉じ、フラグは残らない
        assert!(!h.trigger.is_requested());
        assert_eq!(count_presents(&h.ui_rx), 0);
        assert_eq!(h.pipeline.stats().triggered_frames, 0);
    }

    #[test]
    fn test_slow_classification_does_not_block_delivery() {
        let h = harness(Duration::from_millis(500));
        let buffer = vec![0u8; 16];

        h.trigger.request();
        let started = Instant::now();
        deliver_frame(&h.pipeline, 1, &buffer);

        // on_frameは推論完了を待たずに戻る
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(count_presents(&h.ui_rx), 1);

        // ワーカーは後から完了する
        h.classified_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("classification should eventually finish");
    }

    #[test]
    fn test_halted_pipeline_drops_frames() {
        let h = harness(Duration::ZERO);
        let buffer = vec![0u8; 16];

        h.trigger.request();
        h.pipeline.halt();
        deliver_frame(&h.pipeline, 1, &buffer);

        // stop後のフレームは要求が立っていても破棄される
        assert_eq!(count_presents(&h.ui_rx), 0);
        assert_eq!(h.pipeline.stats().delivered_frames, 0);
    }
}
