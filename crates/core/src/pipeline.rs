//! 파이프라인 trait -- 외부 협력자 확장 포인트 정의
//!
//! 감시 파이프라인은 로그 피드와 발행 싱크를 이 trait으로만 다룹니다.
//! 실제 구현(journalctl, MQTT)과 테스트용 구현을 교체할 수 있습니다.

use std::future::Future;
use std::time::Duration;

use crate::error::{PublishError, SourceError};
use crate::types::JournalEntry;

/// 메시지 발행 싱크
///
/// 각 호출은 독립적인 전송 작업입니다 (fire-and-forget).
/// 여러 감시자가 같은 인스턴스를 공유하므로 `&self`로 동작해야 합니다.
pub trait Publisher: Send + Sync {
    /// 토픽에 페이로드를 발행합니다.
    fn publish(
        &self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// 순차적, tail-following 로그 피드
pub trait EntrySource: Send {
    /// 새 엔트리가 준비될 때까지 최대 `timeout` 동안 대기합니다.
    ///
    /// 준비되면 `true`, 시간 초과면 `false`를 반환합니다.
    /// 취소되어도 엔트리를 잃지 않아야 합니다 (`tokio::select!`에서 사용).
    fn wait_ready(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, SourceError>> + Send;

    /// 현재 준비된 엔트리를 모두 꺼냅니다. 블로킹하지 않으며, 없으면 빈 벡터입니다.
    fn next_batch(&mut self) -> Vec<JournalEntry>;
}
