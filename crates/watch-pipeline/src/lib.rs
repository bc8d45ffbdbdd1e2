//! ochlero 감시 파이프라인
//!
//! systemd journal 엔트리를 사용자 정의 템플릿 패턴과 매칭하고,
//! 추출한 필드로 메시지를 렌더링하여 MQTT 토픽으로 발행합니다.
//!
//! # 모듈 구성
//!
//! - [`template`]: 별칭 해석, 패턴 컴파일, 필드 추출, 렌더링, 매크로 치환
//! - [`watcher`]: 로그 소스 신원 필터와 이벤트 스캔, YAML 감시자 정의 로더
//! - [`dispatcher`]: 피드 대기 및 엔트리 분배 메인 루프
//! - [`source`]: JSON 라인 피드, journalctl 자식 프로세스
//! - [`publisher`]: MQTT 단발 발행, dry-run 싱크
//! - [`pipeline`]: 설정으로부터 디스패처 조립
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! journalctl -> JsonLinesSource -> Dispatcher -> Watcher(unit/comm) -> Event::scan -> Publisher
//!                  (mpsc)                          |                      |
//!                                             신원 필터            별칭 + 매크로
//! ```

pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod publisher;
pub mod source;
pub mod template;
pub mod watcher;

// --- 주요 타입 re-export ---

// 파이프라인
pub use dispatcher::{DispatchStats, Dispatcher, DispatcherState};
pub use pipeline::{PipelineSummary, WatchPipelineBuilder};

// 에러
pub use error::WatchPipelineError;

// 템플릿
pub use template::{AliasTable, Event, MacroTable, MacroValue, PatternCompiler};

// 감시자
pub use watcher::{ScanReport, Watcher, WatcherDefinition, WatcherLoader};

// 피드
pub use source::{JournalSource, JsonLinesSource};

// 싱크
pub use publisher::{DryRunPublisher, MqttPublisher, Sink};
