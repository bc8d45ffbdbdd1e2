//! ochlero 공통 크레이트
//!
//! journal 감시 파이프라인의 모든 크레이트가 공유하는 타입을 정의합니다.
//!
//! - [`config`]: `ochlero.toml` 파싱 및 런타임 설정
//! - [`error`]: 도메인별 에러 정의
//! - [`metrics`]: 메트릭 이름 상수
//! - [`pipeline`]: 외부 협력자 trait (로그 피드, 발행 싱크)
//! - [`types`]: journal 엔트리 타입

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, OchleroError, PipelineError, PublishError, SourceError};

// 설정
pub use config::OchleroConfig;

// 파이프라인 trait
pub use pipeline::{EntrySource, Publisher};

// 도메인 타입
pub use types::JournalEntry;
