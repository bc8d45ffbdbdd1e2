//! 감시자 정의 데이터 타입
//!
//! YAML 감시자 파일에서 역직렬화되는 구조체들을 정의합니다.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::WatchPipelineError;

/// 감시자 파일 하나 -- 감시자 목록을 가집니다.
///
/// # YAML 스키마
/// ```yaml
/// watchers:
///   - unit: backup.service
///     topic: ops/backup
///     events:
///       - name: job_done
///         pattern: 'job ${job} finished in ${secs}s'
///         where:
///           job: _INT_
///           secs: '[0-9.]+'
///         publish: 'backup job ${job} done at _ISO8601_'
///   - comm: sshd
///     topic: security/ssh
///     events:
///       - pattern: 'Accepted publickey for ${user} from ${ip} .*'
///         where:
///           user: _ALPHANUMERIC_
///           ip: _IPv4_
///         publish: '${user}@${ip}'
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherFile {
    /// 감시자 목록 (파일 내 선언 순서 유지)
    #[serde(default)]
    pub watchers: Vec<WatcherDefinition>,
}

impl WatcherFile {
    /// 모든 감시자를 검증합니다.
    pub fn validate(&self) -> Result<(), WatchPipelineError> {
        self.watchers.iter().try_for_each(WatcherDefinition::validate)
    }
}

/// 감시자 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherDefinition {
    /// 진단용 이름 (없으면 unit/comm/topic에서 유도)
    #[serde(default)]
    pub name: Option<String>,
    /// `_SYSTEMD_UNIT` 필터
    #[serde(default)]
    pub unit: Option<String>,
    /// `_COMM` / `SYSLOG_IDENTIFIER` 필터
    #[serde(default)]
    pub comm: Option<String>,
    /// 발행 토픽
    pub topic: String,
    /// 이벤트 목록 (선언 순서대로 스캔)
    #[serde(default)]
    pub events: Vec<EventDefinition>,
}

impl WatcherDefinition {
    /// 로그/에러에 사용할 이름
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match (&self.unit, &self.comm) {
            (Some(unit), Some(comm)) => format!("{unit}/{comm}"),
            (Some(unit), None) => unit.clone(),
            (None, Some(comm)) => comm.clone(),
            (None, None) => format!("*:{}", self.topic),
        }
    }

    /// 위치 기반 기본값을 포함한 이벤트 이름 목록
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .iter()
            .enumerate()
            .map(|(idx, event)| event.effective_name(idx))
            .collect()
    }

    /// 감시자의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), WatchPipelineError> {
        let watcher = self.display_name();
        let invalid = |reason: String| WatchPipelineError::WatcherValidation {
            watcher: watcher.clone(),
            reason,
        };

        if self.topic.is_empty() {
            return Err(invalid("topic must not be empty".to_owned()));
        }
        if self.topic.contains(['+', '#']) {
            return Err(invalid(format!(
                "topic '{}' must not contain wildcards",
                self.topic
            )));
        }
        if self.unit.as_deref() == Some("") {
            return Err(invalid("unit must not be empty when set".to_owned()));
        }
        if self.comm.as_deref() == Some("") {
            return Err(invalid("comm must not be empty when set".to_owned()));
        }

        let mut seen = HashSet::new();
        for (idx, event) in self.events.iter().enumerate() {
            let name = event.effective_name(idx);
            if !seen.insert(name.clone()) {
                return Err(invalid(format!("duplicate event name '{name}'")));
            }
        }

        if self.events.is_empty() {
            tracing::warn!(watcher = %watcher, "watcher has no events");
        }

        Ok(())
    }
}

/// 이벤트 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDefinition {
    /// 이벤트 이름 (없으면 `eventNNN`)
    #[serde(default)]
    pub name: Option<String>,
    /// 매칭 템플릿
    pub pattern: String,
    /// placeholder 정의
    #[serde(rename = "where", default)]
    pub placeholders: BTreeMap<String, String>,
    /// 발행 템플릿
    pub publish: String,
}

impl EventDefinition {
    /// 감시자 내 위치 `index`에서의 이름
    pub fn effective_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("event{index:03}"))
    }
}
