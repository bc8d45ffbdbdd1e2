//! 파이프라인 조립 -- 설정과 감시자 정의로 디스패처를 만듭니다.
//!
//! [`WatchPipelineBuilder`]는 별칭/매크로 테이블을 한 번 생성하여
//! 모든 감시자의 이벤트 컴파일에 공유하고, 하나라도 실패하면 즉시 에러를 반환합니다.
//!
//! # 사용 예시
//! ```ignore
//! use ochlero_watch_pipeline::{JournalSource, Sink, WatchPipelineBuilder, WatcherLoader};
//!
//! let definitions = WatcherLoader::load_path(&config.watchers.path).await?;
//! let dispatcher = WatchPipelineBuilder::new(Arc::new(Sink::from_config(&config.mqtt, false)))
//!     .aliases(&config.aliases)
//!     .macros(&config.macros)
//!     .definitions(definitions)
//!     .build(JournalSource::spawn(&config.journal)?)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ochlero_core::pipeline::{EntrySource, Publisher};

use crate::dispatcher::{DEFAULT_POLL_INTERVAL, Dispatcher};
use crate::error::WatchPipelineError;
use crate::template::{AliasTable, MacroTable, PatternCompiler};
use crate::watcher::{Watcher, WatcherDefinition};

/// 컴파일 결과 요약 (`--validate` 출력용)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// 감시자 수
    pub watchers: usize,
    /// 이벤트 수 (전체)
    pub events: usize,
    /// 별칭 수
    pub aliases: usize,
    /// 매크로 수
    pub macros: usize,
}

/// 파이프라인 빌더
pub struct WatchPipelineBuilder<P> {
    publisher: Arc<P>,
    aliases: AliasTable,
    macros: MacroTable,
    definitions: Vec<WatcherDefinition>,
    poll_interval: Duration,
}

impl<P: Publisher> WatchPipelineBuilder<P> {
    /// 기본 제공 별칭/매크로로 새 빌더를 생성합니다.
    pub fn new(publisher: Arc<P>) -> Self {
        Self {
            publisher,
            aliases: AliasTable::with_builtins(),
            macros: MacroTable::with_builtins(),
            definitions: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// 설정의 별칭을 기본 제공 별칭 위에 적용합니다.
    pub fn aliases(mut self, overrides: &BTreeMap<String, String>) -> Self {
        self.aliases = AliasTable::with_overrides(overrides);
        self
    }

    /// 설정의 리터럴 매크로를 기본 제공 매크로 위에 적용합니다.
    pub fn macros(mut self, literals: &BTreeMap<String, String>) -> Self {
        self.macros = MacroTable::with_literals(literals);
        self
    }

    /// 감시자 정의를 지정합니다 (순서 유지).
    pub fn definitions(mut self, definitions: Vec<WatcherDefinition>) -> Self {
        self.definitions = definitions;
        self
    }

    /// 피드 대기 시간을 지정합니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// 모든 감시자를 컴파일합니다.
    ///
    /// # Errors
    /// 감시자 정의 검증 또는 이벤트 컴파일에 실패한 경우
    pub fn build_watchers(self) -> Result<(Vec<Watcher<P>>, PipelineSummary), WatchPipelineError> {
        let compiler = PatternCompiler::new(self.aliases, self.macros);

        let watchers = self
            .definitions
            .iter()
            .map(|definition| {
                tracing::debug!(
                    watcher = %definition.display_name(),
                    topic = %definition.topic,
                    "adding watcher"
                );
                Watcher::compile(definition, Arc::clone(&self.publisher), &compiler)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let summary = PipelineSummary {
            watchers: watchers.len(),
            events: watchers.iter().map(|w| w.events().len()).sum(),
            aliases: compiler.aliases().len(),
            macros: compiler.macros().len(),
        };

        tracing::info!(
            watchers = summary.watchers,
            events = summary.events,
            "watchers compiled"
        );

        Ok((watchers, summary))
    }

    /// 감시자를 컴파일하고 피드와 묶어 디스패처를 만듭니다.
    pub fn build<S: EntrySource>(self, source: S) -> Result<Dispatcher<S, P>, WatchPipelineError> {
        let poll_interval = self.poll_interval;
        let (watchers, _) = self.build_watchers()?;
        Ok(Dispatcher::new(source, watchers).with_poll_interval(poll_interval))
    }
}
