//! Infrastructure層: Portの具体実装
//!
//! 実機のカメラ・推論エンジン・描画面の代わりに、設定駆動の合成実装を提供する。
//! Application層からはPort経由でしか見えないため、実デバイス対応のアダプタと
//! 差し替えてもセッション側のコードは変わらない。

pub mod classify;
pub mod console_display;
pub mod input;
pub mod registry;
pub mod synthetic;

pub use classify::MockClassifierAdapter;
pub use console_display::ConsoleDisplayAdapter;
pub use registry::StaticDeviceRegistry;
pub use synthetic::SyntheticFrameSource;
