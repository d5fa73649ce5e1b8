//! サーバー全体の統計情報

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use crate::domain::Timestamp;

/// プロセス全体で共有されるカウンタ
#[derive(Debug)]
pub struct ServerStats {
    started_at: Timestamp,
    started: Instant,
    message_count: AtomicU64,
}

impl ServerStats {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            started: Instant::now(),
            message_count: AtomicU64::new(0),
        }
    }

    /// 配信したチャットメッセージを 1 件数える
    pub fn record_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_message_increments_counter() {
        // テスト項目: メッセージを記録するとカウンタが増える
        // given (前提条件):
        let stats = ServerStats::new(Timestamp::new(0));

        // when (操作):
        stats.record_message();
        stats.record_message();

        // then (期待する結果):
        assert_eq!(stats.message_count(), 2);
        assert_eq!(stats.started_at(), Timestamp::new(0));
    }
}
