//! Application Layer
//!
//! セッションライフサイクルとフレーム処理パイプラインのユースケースを実装します。
//!
//! ## モジュール構成
//! - `controller`: セッション状態機械（configure/start/stop）とセッションスレッド
//! - `session`: キャプチャセッション本体（設定トランザクション）
//! - `switcher`: アクティブ入力の切り替え（失敗時は直前の入力を復元）
//! - `pipeline`: フレームパイプライン（トリガー判定・変換・推論・表示の振り分け）
//! - `trigger`: キャプチャ要求フラグ（ロックフリー）
//! - `dispatcher`: UIスレッドディスパッチャ（表示とプレビュー設置の受け渡し）

pub mod controller;
pub mod dispatcher;
pub mod pipeline;
pub mod session;
pub mod switcher;
pub mod trigger;
