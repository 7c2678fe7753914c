//! キャプチャ要求フラグ（Application層）
//!
//! UIトリガー側がセットし、配信スレッドがクリアする単一のブール信号。
//! `Arc<AtomicBool>`を使用したロックフリー設計により、配信スレッドの
//! ホットパス（要求なしフレームの破棄判定）は数CPUサイクルで完了する。
//!
//! # メモリオーダー
//! Relaxed - まれな二重トリガーや取りこぼしは許容される設計のため、
//! 厳密な順序保証は不要。デッドロックや恒久的にtrueのまま残る状態だけを
//! 排除する。

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// キャプチャ要求フラグ（スレッド間で共有、ロックフリー）
#[derive(Clone)]
pub struct CaptureTrigger {
    requested: Arc<AtomicBool>,
}

impl CaptureTrigger {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// キャプチャを要求する（すでに要求済みなら効果なし＝冪等）
    #[inline]
    pub fn request(&self) {
        self.requested.store(true, Ordering::Relaxed);
    }

    /// 要求が立っているか確認する（配信スレッドのホットパス）
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    /// 要求をクリアする（配信スレッドのみが呼ぶ）
    #[inline]
    pub fn clear(&self) {
        self.requested.store(false, Ordering::Relaxed);
    }
}

impl Default for CaptureTrigger {
    fn default() -> Self {
        Self::new()
    }
}
