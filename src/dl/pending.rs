//! 请求在途标记
//!
//! 每个变更操作持有一个 `PendingFlag`；在途期间再次触发直接丢弃，不排队

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct PendingFlag(AtomicBool);

impl PendingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// 尝试占用；已在途时返回 None
    pub fn try_begin(&self) -> Option<PendingGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PendingGuard(&self.0))
    }
}

/// 离开作用域（包括 future 被丢弃）时自动清除在途标记
#[derive(Debug)]
pub struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 视图存活标记；视图销毁后在途请求的完成回调变为空操作
#[derive(Debug)]
pub struct Liveness(AtomicBool);

impl Default for Liveness {
    fn default() -> Self {
        Self(AtomicBool::new(true))
    }
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn tear_down(&self) {
        self.0.store(false, Ordering::Release);
    }
}
