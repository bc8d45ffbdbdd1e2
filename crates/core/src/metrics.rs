//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ochlero_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(ochlero_core::metrics::PUBLISHES_SENT_TOTAL).increment(1);
//! ```

use metrics::{Unit, describe_counter};

/// 토픽 레이블 키
pub const LABEL_TOPIC: &str = "topic";

/// 감시자 이름 레이블 키
pub const LABEL_WATCHER: &str = "watcher";

/// 이벤트 이름 레이블 키 (감시자 안에서만 유일)
pub const LABEL_EVENT: &str = "event";

/// 피드에서 받은 엔트리 수 (counter)
pub const ENTRIES_RECEIVED_TOTAL: &str = "ochlero_entries_received_total";

/// 감시자 신원 필터를 통과한 엔트리 수 (counter)
pub const ENTRIES_IN_SCOPE_TOTAL: &str = "ochlero_entries_in_scope_total";

/// 이벤트 매칭 수 (counter, label: event)
pub const EVENTS_MATCHED_TOTAL: &str = "ochlero_events_matched_total";

/// 발행 성공 수 (counter, label: topic)
pub const PUBLISHES_SENT_TOTAL: &str = "ochlero_publishes_sent_total";

/// 발행 실패 수 (counter, label: topic)
pub const PUBLISHES_FAILED_TOTAL: &str = "ochlero_publishes_failed_total";

/// 파싱할 수 없는 피드 라인 수 (counter)
pub const FEED_MALFORMED_LINES_TOTAL: &str = "ochlero_feed_malformed_lines_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    describe_counter!(
        ENTRIES_RECEIVED_TOTAL,
        Unit::Count,
        "Journal entries received from the feed"
    );
    describe_counter!(
        ENTRIES_IN_SCOPE_TOTAL,
        Unit::Count,
        "Entries accepted by a watcher's identity filter"
    );
    describe_counter!(
        EVENTS_MATCHED_TOTAL,
        Unit::Count,
        "Event patterns that matched an entry message"
    );
    describe_counter!(
        PUBLISHES_SENT_TOTAL,
        Unit::Count,
        "Rendered messages published to the sink"
    );
    describe_counter!(
        PUBLISHES_FAILED_TOTAL,
        Unit::Count,
        "Publish attempts that failed"
    );
    describe_counter!(
        FEED_MALFORMED_LINES_TOTAL,
        Unit::Count,
        "Feed lines that could not be parsed as journal entries"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            ENTRIES_RECEIVED_TOTAL,
            ENTRIES_IN_SCOPE_TOTAL,
            EVENTS_MATCHED_TOTAL,
            PUBLISHES_SENT_TOTAL,
            PUBLISHES_FAILED_TOTAL,
            FEED_MALFORMED_LINES_TOTAL,
        ] {
            assert!(name.starts_with("ochlero_"), "{name}");
            assert!(name.ends_with("_total"), "{name}");
        }
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
