/// Port定義（Clean Architectureのインターフェース）
///
/// Domain層が外部実装に依存するための抽象trait。
/// Infrastructure層がこれらを実装し、Application層がDIで注入する。
use crate::domain::error::CameraResult;
use crate::domain::types::{
    CameraDevice, ClassificationResult, DeviceInput, Facing, RawFrame, SessionPreset, StillImage,
    SurfaceHandle,
};

/// フレーム配信コールバック
///
/// 配信スレッド上で毎フレーム呼ばれる。渡される`RawFrame`はコールバックの
/// 間だけ有効で、持ち出すには`retain()`が必要。
pub type FrameHandler = Box<dyn FnMut(RawFrame<'_>) + Send>;

/// デバイス登録ポート: 接続カメラの列挙を抽象化
pub trait DeviceRegistryPort: Send + Sync {
    /// 指定の向きのデバイスを1台返す
    ///
    /// # Returns
    /// - `Ok(CameraDevice)`: デバイスが存在する
    /// - `Err(CameraError::DeviceUnavailable)`: その向きのカメラがない
    fn enumerate(&self, facing: Facing) -> CameraResult<CameraDevice>;
}

/// フレームソースポート: 配信スレッドとデバイス入力の生成を抽象化
///
/// セッションに1つだけ所有され、設定トランザクションのコミット時にのみ
/// `apply_configuration`で構成変更を受け取る。
pub trait FrameSourcePort: Send {
    /// デバイスからセッション入力オブジェクトを生成する
    fn create_input(&mut self, device: &CameraDevice) -> CameraResult<DeviceInput>;

    /// 入力を受け入れ可能か検証する
    fn can_add_input(&self, input: &DeviceInput) -> bool;

    /// プリセットがサポートされるか
    fn supports_preset(&self, preset: SessionPreset) -> bool;

    /// コミットされた構成（プリセット・アクティブデバイス）を反映する
    ///
    /// 配信中であれば、配信スレッドを止めずにデバイスを切り替える。
    fn apply_configuration(
        &mut self,
        preset: SessionPreset,
        device: Option<&CameraDevice>,
    ) -> CameraResult<()>;

    /// 専用の配信スレッドを開始し、毎フレーム`handler`を呼び出す
    fn start_delivery(&mut self, handler: FrameHandler) -> CameraResult<()>;

    /// 配信スレッドを停止する
    ///
    /// 進行中のコールバックが完了するまでブロックし、戻った後は
    /// フレームが一切届かないことを保証する。
    fn stop_delivery(&mut self);
}

/// 推論ポート: 1フレームの画像分類を抽象化
///
/// フレーム間の可変状態を持たず、複数のトリガーフレームから並行に
/// 呼ばれても安全であること。リトライなし、失敗は呼び出し側で抑制される。
pub trait ClassifierPort: Send + Sync {
    /// 最良ラベルを1件返す
    fn classify(&self, image: &StillImage) -> CameraResult<ClassificationResult>;
}

/// 表示ポート: UIスレッド上でのみ呼ばれる外部コラボレータ
pub trait DisplaySinkPort: Send {
    /// プレビューサーフェスを設置する（設定トランザクション中、コミット前）
    fn install_preview(&mut self) -> SurfaceHandle;

    /// 保持済み画像を表示する。戻り値なし、描画はシンク側の責務。
    fn present(&mut self, image: StillImage);
}
