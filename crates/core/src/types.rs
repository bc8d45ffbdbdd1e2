//! 도메인 타입 -- journal 엔트리
//!
//! 로그 피드가 생성하고 감시자(watcher)가 소비하는 구조화된 레코드를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 메시지 본문 필드
pub const FIELD_MESSAGE: &str = "MESSAGE";
/// systemd 유닛 필드
pub const FIELD_SYSTEMD_UNIT: &str = "_SYSTEMD_UNIT";
/// 프로세스 명령 이름 필드
pub const FIELD_COMM: &str = "_COMM";
/// syslog 식별자 필드
pub const FIELD_SYSLOG_IDENTIFIER: &str = "SYSLOG_IDENTIFIER";

/// journal 엔트리
///
/// 필드 이름 -> 문자열 값 매핑입니다. 값은 항상 문자열로 다룹니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    fields: BTreeMap<String, String>,
}

impl JournalEntry {
    /// 빈 엔트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드를 추가한 엔트리를 반환합니다.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// 필드를 설정합니다. 기존 값은 덮어씁니다.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// 필드를 제거합니다.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// `MESSAGE` 필드
    pub fn message(&self) -> Option<&str> {
        self.get(FIELD_MESSAGE)
    }

    /// `_SYSTEMD_UNIT` 필드
    pub fn unit(&self) -> Option<&str> {
        self.get(FIELD_SYSTEMD_UNIT)
    }

    /// `_COMM` 필드
    pub fn comm(&self) -> Option<&str> {
        self.get(FIELD_COMM)
    }

    /// `SYSLOG_IDENTIFIER` 필드
    pub fn syslog_identifier(&self) -> Option<&str> {
        self.get(FIELD_SYSLOG_IDENTIFIER)
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `journalctl --output=json` 한 줄을 엔트리로 변환합니다.
    ///
    /// # 값 변환 규칙
    /// - 문자열: 그대로
    /// - 숫자: 10진 문자열
    /// - 바이트 배열 (UTF-8이 아닌 메시지): lossy UTF-8 디코딩
    /// - 반복 필드 (값 배열): 첫 번째 값
    /// - `null` (너무 큰 필드 등): 건너뜀
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        let object: BTreeMap<String, Value> = serde_json::from_str(line)?;
        let fields = object
            .into_iter()
            .filter_map(|(name, value)| json_field_to_string(&value).map(|v| (name, v)))
            .collect();
        Ok(Self { fields })
    }
}

impl FromIterator<(String, String)> for JournalEntry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self
            .unit()
            .or_else(|| self.syslog_identifier())
            .or_else(|| self.comm())
            .unwrap_or("-");
        write!(f, "{}: {}", source, self.message().unwrap_or_default())
    }
}

fn json_field_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            match bytes {
                Some(bytes) if !items.is_empty() => {
                    Some(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => items.first().and_then(json_field_to_string),
            }
        }
        _ => None,
    }
}
