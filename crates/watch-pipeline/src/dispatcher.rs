//! 디스패처 -- 로그 피드와 감시자 목록을 소유하고 메인 루프를 실행합니다.
//!
//! # 상태
//! ```text
//! Idle --(엔트리 준비)--> Draining --(배치 처리 완료)--> Idle
//!   |                                                    |
//!   +----------------(종료 토큰 취소)--------------------> Stopped
//! ```
//!
//! 배치 처리 중에는 각 엔트리를 모든 감시자에게 순서대로 전달하고,
//! 발행은 하나씩 await 합니다. 종료 토큰은 배치 처리 중에도 확인하며,
//! 진행 중인 발행과 남은 배치는 버립니다 (flush 없음).

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ochlero_core::metrics as m;
use ochlero_core::pipeline::{EntrySource, Publisher};
use ochlero_core::types::JournalEntry;

use crate::error::WatchPipelineError;
use crate::watcher::{ScanReport, Watcher};

/// 기본 피드 대기 시간
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 디스패처 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// 피드 대기 중
    Idle,
    /// 준비된 배치를 감시자들에게 전달 중
    Draining,
    /// 종료됨 (최종 상태)
    Stopped,
}

/// 누적 처리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// 피드에서 받은 엔트리 수
    pub entries: u64,
    /// 감시자 범위에 들어간 (엔트리, 감시자) 쌍의 수
    pub in_scope: u64,
    /// 매칭된 이벤트 수
    pub matched: u64,
    /// 발행 성공 수
    pub published: u64,
    /// 발행 실패 수
    pub failed: u64,
}

impl DispatchStats {
    fn record(&mut self, report: ScanReport) {
        if report.in_scope {
            self.in_scope += 1;
        }
        self.matched += report.matched as u64;
        self.published += report.published as u64;
        self.failed += report.failed as u64;
    }
}

/// 디스패처
pub struct Dispatcher<S, P> {
    source: S,
    watchers: Vec<Watcher<P>>,
    poll_interval: Duration,
    state: DispatcherState,
    stats: DispatchStats,
}

impl<S, P> Dispatcher<S, P>
where
    S: EntrySource,
    P: Publisher,
{
    /// 피드와 감시자로 디스패처를 생성합니다.
    pub fn new(source: S, watchers: Vec<Watcher<P>>) -> Self {
        Self {
            source,
            watchers,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: DispatcherState::Idle,
            stats: DispatchStats::default(),
        }
    }

    /// 피드 대기 시간을 설정합니다.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 현재 상태
    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// 누적 통계
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// 감시자 목록
    pub fn watchers(&self) -> &[Watcher<P>] {
        &self.watchers
    }

    /// 엔트리 하나를 모든 감시자에게 순서대로 전달합니다.
    pub async fn dispatch(&mut self, entry: &JournalEntry) -> DispatchStats {
        metrics::counter!(m::ENTRIES_RECEIVED_TOTAL).increment(1);

        let mut delta = DispatchStats {
            entries: 1,
            ..DispatchStats::default()
        };
        for watcher in &self.watchers {
            delta.record(watcher.consider(entry).await);
        }

        self.stats.entries += delta.entries;
        self.stats.in_scope += delta.in_scope;
        self.stats.matched += delta.matched;
        self.stats.published += delta.published;
        self.stats.failed += delta.failed;
        delta
    }

    /// 종료 토큰이 취소되거나 피드가 닫힐 때까지 실행합니다.
    ///
    /// 정상 종료 시 누적 통계를 반환합니다.
    ///
    /// # Errors
    /// 피드가 닫히거나 실패하면 [`WatchPipelineError::Source`]를 반환합니다.
    pub async fn run(
        &mut self,
        shutdown: CancellationToken,
    ) -> Result<DispatchStats, WatchPipelineError> {
        if self.state == DispatcherState::Stopped {
            return Ok(self.stats);
        }

        tracing::info!(
            watchers = self.watchers.len(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "dispatcher started"
        );

        loop {
            self.state = DispatcherState::Idle;

            let ready = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                ready = self.source.wait_ready(self.poll_interval) => Some(ready),
            };
            let Some(ready) = ready else {
                return Ok(self.stop());
            };

            match ready {
                Ok(true) => {
                    self.state = DispatcherState::Draining;
                    let batch = self.source.next_batch();
                    tracing::debug!(count = batch.len(), "feed updated, dispatching");
                    for (done, entry) in batch.iter().enumerate() {
                        // 진행 중인 발행도 종료 토큰과 경쟁시키고, 남은 배치는 버림
                        let dispatched = tokio::select! {
                            biased;
                            _ = shutdown.cancelled() => false,
                            _ = self.dispatch(entry) => true,
                        };
                        if !dispatched {
                            tracing::info!(
                                dropped = batch.len() - done,
                                "shutdown during drain, dropping rest of batch"
                            );
                            return Ok(self.stop());
                        }
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    self.state = DispatcherState::Stopped;
                    tracing::error!(error = %e, "feed failed, stopping dispatcher");
                    return Err(e.into());
                }
            }
        }
    }

    fn stop(&mut self) -> DispatchStats {
        self.state = DispatcherState::Stopped;
        tracing::info!(
            entries = self.stats.entries,
            published = self.stats.published,
            failed = self.stats.failed,
            "dispatcher stopped"
        );
        self.stats
    }
}
