//! キャプチャセッション
//!
//! デバイス入力・出力・プリセットを束ねる実行時オブジェクト。
//!
//! # 設定トランザクション
//! すべてのセッション変更は`begin_configuration()`と`commit_configuration()`の
//! ブラケット内でのみ許可される。変更はコミットまでバッファされ、稼働中の
//! フレームソースからは見えない（コミット時に一括で反映される）。

use crate::domain::{
    CameraDevice, CameraError, CameraResult, DeviceInput, FrameHandler, FrameSourcePort,
    SessionPreset,
};

/// 開いているトランザクションに滞留している変更
#[derive(Default)]
struct PendingConfig {
    preset: Option<SessionPreset>,
    /// `Some(None)`は「入力の取り外し」を表す
    input: Option<Option<DeviceInput>>,
    output: Option<FrameHandler>,
}

/// キャプチャセッション本体
///
/// Session Controllerだけが所有・変更する。Input Switcherは
/// トランザクション内からのみ入力を入れ替えられる。
pub struct CaptureSession {
    source: Box<dyn FrameSourcePort>,
    preset: SessionPreset,
    active_input: Option<DeviceInput>,
    output: Option<FrameHandler>,
    pending: Option<PendingConfig>,
    running: bool,
}

impl CaptureSession {
    pub fn new(source: Box<dyn FrameSourcePort>) -> Self {
        Self {
            source,
            preset: SessionPreset::default(),
            active_input: None,
            output: None,
            pending: None,
            running: false,
        }
    }

    /// 設定トランザクションを開く
    pub fn begin_configuration(&mut self) -> CameraResult<()> {
        if self.pending.is_some() {
            return Err(CameraError::invalid_state(
                "begin_configuration",
                "a configuration transaction is already open",
            ));
        }
        self.pending = Some(PendingConfig::default());
        Ok(())
    }

    /// 滞留中の変更を一括でコミットし、フレームソースへ反映する
    pub fn commit_configuration(&mut self) -> CameraResult<()> {
        let pending = self.pending.take().ok_or_else(|| {
            CameraError::invalid_state(
                "commit_configuration",
                "no open configuration transaction",
            )
        })?;

        if let Some(preset) = pending.preset {
            self.preset = preset;
        }
        if let Some(input) = pending.input {
            self.active_input = input;
        }
        if let Some(output) = pending.output {
            self.output = Some(output);
        }

        self.source
            .apply_configuration(self.preset, self.active_input.as_ref().map(|i| &i.device))
    }

    /// プリセットを設定する（トランザクション内のみ）
    pub fn set_preset(&mut self, preset: SessionPreset) -> CameraResult<()> {
        let pending = self.open_transaction("set_preset")?;
        pending.preset = Some(preset);
        Ok(())
    }

    /// プリセットがサポートされるか
    pub fn supports_preset(&self, preset: SessionPreset) -> bool {
        self.source.supports_preset(preset)
    }

    /// デバイスから入力オブジェクトを生成する
    pub fn create_input(&mut self, device: &CameraDevice) -> CameraResult<DeviceInput> {
        self.source.create_input(device)
    }

    /// 入力を追加できるか検証する
    ///
    /// アクティブ入力は常に1つまで。滞留中の変更も考慮する。
    pub fn can_add_input(&self, input: &DeviceInput) -> bool {
        self.current_input().is_none() && self.source.can_add_input(input)
    }

    /// 入力を追加する（トランザクション内のみ）
    pub fn add_input(&mut self, input: DeviceInput) -> CameraResult<()> {
        if self.current_input().is_some() {
            return Err(CameraError::invalid_state(
                "add_input",
                "an input is already installed",
            ));
        }
        let pending = self.open_transaction("add_input")?;
        pending.input = Some(Some(input));
        Ok(())
    }

    /// 現在の入力を取り外して返す（トランザクション内のみ）
    pub fn remove_input(&mut self) -> CameraResult<Option<DeviceInput>> {
        let removed = self.current_input().cloned();
        let pending = self.open_transaction("remove_input")?;
        pending.input = Some(None);
        Ok(removed)
    }

    /// フレーム出力シンクを設置する（トランザクション内のみ）
    pub fn set_output(&mut self, handler: FrameHandler) -> CameraResult<()> {
        let pending = self.open_transaction("set_output")?;
        pending.output = Some(handler);
        Ok(())
    }

    /// フレーム配信を開始する
    ///
    /// すでに稼働中なら何もしない。トランザクションが開いたままの呼び出しは
    /// エラー（コミットが先）。
    pub fn start_running(&mut self) -> CameraResult<()> {
        if self.running {
            return Ok(());
        }
        if self.pending.is_some() {
            return Err(CameraError::invalid_state(
                "start_running",
                "configuration transaction still open",
            ));
        }
        let handler = self.output.take().ok_or_else(|| {
            CameraError::invalid_state("start_running", "no output sink installed")
        })?;

        self.source.start_delivery(handler)?;
        self.running = true;
        Ok(())
    }

    /// フレーム配信を停止する
    ///
    /// 配信スレッドの完了を待ってから戻る。以後フレームは届かない。
    pub fn stop_running(&mut self) {
        if !self.running {
            return;
        }
        self.source.stop_delivery();
        self.running = false;
    }

    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 現在の入力（滞留中の変更を含むビュー）
    pub fn current_input(&self) -> Option<&DeviceInput> {
        match &self.pending {
            Some(PendingConfig {
                input: Some(slot), ..
            }) => slot.as_ref(),
            _ => self.active_input.as_ref(),
        }
    }

    /// コミット済みのアクティブ入力
    pub fn committed_input(&self) -> Option<&DeviceInput> {
        self.active_input.as_ref()
    }

    /// コミット済みの入力数（常に0または1）
    #[allow(dead_code)]
    pub fn input_count(&self) -> usize {
        usize::from(self.active_input.is_some())
    }

    /// コミット済みのプリセット
    pub fn preset(&self) -> SessionPreset {
        self.preset
    }

    fn open_transaction(&mut self, operation: &'static str) -> CameraResult<&mut PendingConfig> {
        self.pending.as_mut().ok_or_else(|| {
            CameraError::invalid_state(operation, "no open configuration transaction")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Facing, RawFrame};
    use std::sync::{Arc, Mutex};

    /// フレームソースへの反映をすべて記録するモック
    #[derive(Clone, Default)]
    struct RecordingSource {
        applied: Arc<Mutex<Vec<(SessionPreset, Option<String>)>>>,
        delivering: Arc<Mutex<bool>>,
    }

    impl FrameSourcePort for RecordingSource {
        fn create_input(&mut self, device: &CameraDevice) -> CameraResult<DeviceInput> {
            Ok(DeviceInput {
                device: device.clone(),
            })
        }

        fn can_add_input(&self, _input: &DeviceInput) -> bool {
            true
        }

        fn supports_preset(&self, _preset: SessionPreset) -> bool {
            true
        }

        fn apply_configuration(
            &mut self,
            preset: SessionPreset,
            device: Option<&CameraDevice>,
        ) -> CameraResult<()> {
            self.applied
                .lock()
                .unwrap()
                .push((preset, device.map(|d| d.id.clone())));
            Ok(())
        }

        fn start_delivery(&mut self, _handler: FrameHandler) -> CameraResult<()> {
            *self.delivering.lock().unwrap() = true;
            Ok(())
        }

        fn stop_delivery(&mut self) {
            *self.delivering.lock().unwrap() = false;
        }
    }

    fn back_device() -> CameraDevice {
        CameraDevice {
            id: "camera:back:0".to_string(),
            name: "Back".to_string(),
            facing: Facing::Back,
        }
    }

    fn noop_handler() -> FrameHandler {
        Box::new(|_frame: RawFrame<'_>| {})
    }

    #[test]
    fn test_mutation_outside_transaction_fails() {
        let mut session = CaptureSession::new(Box::new(RecordingSource::default()));

        let result = session.set_preset(SessionPreset::Photo);
        assert!(matches!(result, Err(CameraError::InvalidState { .. })));

        let input = DeviceInput {
            device: back_device(),
        };
        assert!(matches!(
            session.add_input(input),
            Err(CameraError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_changes_invisible_until_commit() {
        let source = RecordingSource::default();
        let applied = Arc::clone(&source.applied);
        let mut session = CaptureSession::new(Box::new(source));

        session.begin_configuration().unwrap();
        session.set_preset(SessionPreset::Photo).unwrap();
        let input = session.create_input(&back_device()).unwrap();
        session.add_input(input).unwrap();

        // コミット前はソースに何も反映されない
        assert!(applied.lock().unwrap().is_empty());
        assert_eq!(session.input_count(), 0);

        session.commit_configuration().unwrap();

        let applied = applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied[0],
            (SessionPreset::Photo, Some("camera:back:0".to_string()))
        );
        drop(applied);
        assert_eq!(session.input_count(), 1);
    }

    #[test]
    fn test_at_most_one_input() {
        let mut session = CaptureSession::new(Box::new(RecordingSource::default()));

        session.begin_configuration().unwrap();
        let first = session.create_input(&back_device()).unwrap();
        session.add_input(first).unwrap();

        let second = DeviceInput {
            device: CameraDevice {
                id: "camera:front:0".to_string(),
                name: "Front".to_string(),
                facing: Facing::Front,
            },
        };
        assert!(!session.can_add_input(&second));
        assert!(matches!(
            session.add_input(second),
            Err(CameraError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_double_begin_fails() {
        let mut session = CaptureSession::new(Box::new(RecordingSource::default()));
        session.begin_configuration().unwrap();
        assert!(matches!(
            session.begin_configuration(),
            Err(CameraError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_start_requires_committed_output() {
        let mut session = CaptureSession::new(Box::new(RecordingSource::default()));

        // 出力未設置での開始はエラー
        assert!(matches!(
            session.start_running(),
            Err(CameraError::InvalidState { .. })
        ));

        session.begin_configuration().unwrap();
        session.set_output(noop_handler()).unwrap();

        // トランザクションが開いたままの開始もエラー
        assert!(matches!(
            session.start_running(),
            Err(CameraError::InvalidState { .. })
        ));

        session.commit_configuration().unwrap();
        session.start_running().unwrap();
        assert!(session.is_running());

        // 二重開始は何もしない
        session.start_running().unwrap();

        session.stop_running();
        assert!(!session.is_running());
    }

    #[test]
    fn test_remove_input_returns_current() {
        let mut session = CaptureSession::new(Box::new(RecordingSource::default()));

        session.begin_configuration().unwrap();
        let input = session.create_input(&back_device()).unwrap();
        session.add_input(input).unwrap();
        session.commit_configuration().unwrap();

        session.begin_configuration().unwrap();
        let removed = session.remove_input().unwrap();
        assert_eq!(removed.map(|i| i.facing()), Some(Facing::Back));
        assert!(session.current_input().is_none());
        // コミットまではコミット済みビューに残る
        assert_eq!(session.input_count(), 1);

        session.commit_configuration().unwrap();
        assert_eq!(session.input_count(), 0);
    }
}
