//! 매크로 -- 발행 시점에 평가되는 값
//!
//! 렌더링된 메시지 안의 `_EPOCH_` 같은 토큰을 발행 시점의 값으로 치환합니다.
//! 치환은 항상 필드 대입이 끝난 결과에 대해 수행되며, 컴파일 시점에는 하지 않습니다.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::alias::replace_tokens;

/// 매크로 값
#[derive(Clone)]
pub enum MacroValue {
    /// 고정 문자열
    Literal(String),
    /// 치환할 때마다 평가되는 값
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl MacroValue {
    /// 클로저로 동적 값을 생성합니다.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// 현재 값을 평가합니다.
    pub fn evaluate(&self) -> String {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for MacroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// 매크로 테이블
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    entries: Vec<(String, MacroValue)>,
}

impl MacroTable {
    /// 빈 테이블을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 제공 매크로로 채운 테이블을 생성합니다.
    ///
    /// - `_EPOCH_`: 현재 Unix 시각 (초)
    /// - `_ISO8601_`: 현재 UTC 시각 (RFC 3339)
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.insert(
            "_EPOCH_",
            MacroValue::dynamic(|| chrono::Utc::now().timestamp().to_string()),
        );
        table.insert(
            "_ISO8601_",
            MacroValue::dynamic(|| {
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            }),
        );
        table
    }

    /// 기본 제공 매크로에 설정의 리터럴 매크로를 더한 테이블을 생성합니다.
    pub fn with_literals(literals: &BTreeMap<String, String>) -> Self {
        let mut table = Self::with_builtins();
        for (token, value) in literals {
            table.insert(token.clone(), MacroValue::Literal(value.clone()));
        }
        table
    }

    /// 매크로를 추가하거나 대체합니다.
    pub fn insert(&mut self, token: impl Into<String>, value: MacroValue) {
        let token = token.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    /// 등록된 매크로 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 메시지 안의 매크로 토큰을 치환합니다.
    ///
    /// 메시지에 실제로 등장하는 매크로만, 호출당 한 번씩 평가합니다.
    /// 같은 토큰이 여러 번 나오면 같은 값으로 치환됩니다.
    pub fn resolve(&self, message: &str) -> String {
        let evaluated: Vec<(&str, String)> = self
            .entries
            .iter()
            .filter(|(token, _)| !token.is_empty() && message.contains(token.as_str()))
            .map(|(token, value)| (token.as_str(), value.evaluate()))
            .collect();

        if evaluated.is_empty() {
            return message.to_owned();
        }

        replace_tokens(
            message,
            evaluated.iter().map(|(t, v)| (*t, v.as_str())),
        )
    }
}
