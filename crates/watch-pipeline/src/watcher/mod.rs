//! 감시자 -- 로그 소스 신원 필터 + 이벤트 스캔 + 발행
//!
//! 감시자는 엔트리의 `_SYSTEMD_UNIT`, `_COMM`, `SYSLOG_IDENTIFIER` 필드로
//! 자신의 범위인지 판단하고, 범위 안이면 `MESSAGE`를 모든 이벤트로 스캔하여
//! 매칭 결과를 즉시 자신의 토픽으로 발행합니다.
//!
//! # 구성
//! - [`types`]: YAML 감시자 정의
//! - [`loader`]: 파일/디렉토리 로딩

pub mod loader;
pub mod types;

use std::sync::Arc;

use ochlero_core::metrics as m;
use ochlero_core::pipeline::Publisher;
use ochlero_core::types::JournalEntry;

use crate::error::WatchPipelineError;
use crate::template::{Event, PatternCompiler};

pub use loader::WatcherLoader;
pub use types::{EventDefinition, WatcherDefinition, WatcherFile};

/// 발행 실패 로그에 남길 페이로드 최대 길이 (문자 수)
const LOG_PAYLOAD_MAX_CHARS: usize = 120;

/// 엔트리 하나를 처리한 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// 신원 필터 통과 여부
    pub in_scope: bool,
    /// 매칭된 이벤트 수
    pub matched: usize,
    /// 발행 성공 수
    pub published: usize,
    /// 발행 실패 수
    pub failed: usize,
}

impl ScanReport {
    /// 범위 밖 엔트리
    pub const OUT_OF_SCOPE: Self = Self {
        in_scope: false,
        matched: 0,
        published: 0,
        failed: 0,
    };
}

/// 감시자
///
/// 컴파일된 이벤트와 공유 발행자를 가집니다. 생성 후 불변입니다.
pub struct Watcher<P> {
    name: String,
    unit: Option<String>,
    comm: Option<String>,
    topic: String,
    events: Vec<Event>,
    publisher: Arc<P>,
}

impl<P: Publisher> Watcher<P> {
    /// 이미 컴파일된 이벤트로 감시자를 생성합니다.
    pub fn new(
        unit: Option<String>,
        comm: Option<String>,
        topic: impl Into<String>,
        events: Vec<Event>,
        publisher: Arc<P>,
    ) -> Self {
        let topic = topic.into();
        let name = match (&unit, &comm) {
            (Some(u), Some(c)) => format!("{u}/{c}"),
            (Some(u), None) => u.clone(),
            (None, Some(c)) => c.clone(),
            (None, None) => format!("*:{topic}"),
        };
        Self {
            name,
            unit,
            comm,
            topic,
            events,
            publisher,
        }
    }

    /// 정의의 모든 이벤트를 컴파일하여 감시자를 생성합니다.
    ///
    /// # Errors
    /// 이벤트 중 하나라도 컴파일에 실패하면 첫 번째 에러를 반환합니다.
    pub fn compile(
        definition: &WatcherDefinition,
        publisher: Arc<P>,
        compiler: &PatternCompiler,
    ) -> Result<Self, WatchPipelineError> {
        definition.validate()?;

        let events = definition
            .events
            .iter()
            .enumerate()
            .map(|(idx, event)| {
                let name = event.effective_name(idx);
                tracing::debug!(
                    watcher = %definition.display_name(),
                    event = %name,
                    "adding event"
                );
                compiler.compile(&name, &event.pattern, &event.placeholders, &event.publish)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut watcher = Self::new(
            definition.unit.clone(),
            definition.comm.clone(),
            definition.topic.clone(),
            events,
            publisher,
        );
        watcher.name = definition.display_name();
        Ok(watcher)
    }

    /// 진단용 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 발행 토픽
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// unit 필터
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// comm 필터
    pub fn comm(&self) -> Option<&str> {
        self.comm.as_deref()
    }

    /// 컴파일된 이벤트 (스캔 순서)
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// 엔트리가 이 감시자의 범위인지 확인합니다.
    ///
    /// - unit이 설정되어 있으면 `_SYSTEMD_UNIT`이 같아야 함
    /// - comm이 설정되어 있으면 `_COMM` 또는 `SYSLOG_IDENTIFIER` 중 하나가 같아야 함
    /// - 둘 다 없으면 모든 엔트리가 범위
    pub fn accepts(&self, entry: &JournalEntry) -> bool {
        if let Some(unit) = &self.unit {
            if entry.unit() != Some(unit.as_str()) {
                return false;
            }
        }

        if let Some(comm) = &self.comm {
            let comm = Some(comm.as_str());
            return entry.comm() == comm || entry.syslog_identifier() == comm;
        }

        true
    }

    /// 엔트리를 처리합니다.
    ///
    /// 범위 안이면 `MESSAGE`를 모든 이벤트로 순서대로 스캔하고,
    /// 매칭마다 즉시 발행합니다. 발행 실패는 기록만 하고 다음 이벤트로 진행합니다.
    pub async fn consider(&self, entry: &JournalEntry) -> ScanReport {
        if !self.accepts(entry) {
            return ScanReport::OUT_OF_SCOPE;
        }
        metrics::counter!(m::ENTRIES_IN_SCOPE_TOTAL).increment(1);

        let mut report = ScanReport {
            in_scope: true,
            ..ScanReport::default()
        };

        let Some(message) = entry.message() else {
            return report;
        };

        for event in &self.events {
            let Some(payload) = event.scan(message) else {
                continue;
            };
            report.matched += 1;
            metrics::counter!(
                m::EVENTS_MATCHED_TOTAL,
                m::LABEL_WATCHER => self.name.clone(),
                m::LABEL_EVENT => event.name().to_owned()
            )
            .increment(1);

            tracing::debug!(
                watcher = %self.name,
                event = %event.name(),
                topic = %self.topic,
                "event matched"
            );

            match self.publisher.publish(&self.topic, &payload).await {
                Ok(()) => {
                    report.published += 1;
                    metrics::counter!(m::PUBLISHES_SENT_TOTAL, m::LABEL_TOPIC => self.topic.clone())
                        .increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!(m::PUBLISHES_FAILED_TOTAL, m::LABEL_TOPIC => self.topic.clone())
                        .increment(1);
                    tracing::warn!(
                        watcher = %self.name,
                        event = %event.name(),
                        topic = %self.topic,
                        payload = %truncate(&payload, LOG_PAYLOAD_MAX_CHARS),
                        error = %e,
                        "failed to publish message"
                    );
                }
            }
        }

        report
    }
}

impl<P> std::fmt::Debug for Watcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("comm", &self.comm)
            .field("topic", &self.topic)
            .field("events", &self.events.len())
            .finish()
    }
}

/// 문자 경계를 지키며 문자열을 자릅니다.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}
