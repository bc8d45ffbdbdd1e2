//! 템플릿 엔진 -- 별칭 해석, 패턴 컴파일, 매크로 치환
//!
//! # 구성
//! - [`parser`]: 템플릿 -> 리터럴/placeholder 구간
//! - [`alias`]: `_INT_` 같은 별칭 토큰 -> 정규식 조각
//! - [`macros`]: 발행 시점에 평가되는 `_EPOCH_` 같은 토큰
//! - [`compiler`]: 이벤트 정의 -> [`Event`]
//! - [`event`]: 매칭, 필드 추출, 렌더링
//!
//! # 사용 예시
//!
//! ```
//! use std::collections::BTreeMap;
//! use ochlero_watch_pipeline::template::PatternCompiler;
//!
//! let compiler = PatternCompiler::default();
//! let mut placeholders = BTreeMap::new();
//! placeholders.insert("job".to_owned(), "_INT_".to_owned());
//!
//! let event = compiler
//!     .compile("job_done", "job ${job} finished", &placeholders, "done ${job}")
//!     .unwrap();
//! assert_eq!(event.scan("job 42 finished").as_deref(), Some("done 42"));
//! assert_eq!(event.scan("job 42 failed"), None);
//! ```

pub mod alias;
pub mod compiler;
pub mod event;
pub mod macros;
pub mod parser;

pub use alias::{AliasTable, BUILTIN_ALIASES};
pub use compiler::PatternCompiler;
pub use event::{Event, Fields, STATIC_MATCH_FIELD, STATIC_MATCH_VALUE};
pub use macros::{MacroTable, MacroValue};
