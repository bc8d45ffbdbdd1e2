//! 타입 별칭 -- 재사용 가능한 정규식 조각
//!
//! `where` 절의 조각에 들어 있는 `_INT_`, `_IPv4_` 같은 토큰을
//! 컴파일 전에 정규식 조각으로 치환합니다.
//!
//! [`AliasTable`]은 명시적으로 생성되어 컴파일러에 주입되는 읽기 전용 값입니다.

use std::collections::BTreeMap;

/// 기본 제공 별칭 (적용 순서 = 선언 순서)
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("_SYSLOGTIMESTAMP_", r"[A-Z][a-z]+\s+\d+\s\d+:\d+:\d+"),
    (
        "_IPv4_",
        r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)",
    ),
    ("_EMAIL_", r"([a-z0-9_\.-]+)@([\da-z\.-]+)\.([a-z\.]{2,6})"),
    ("_ALPHANUMERIC_", r"\w+"),
    ("_INT_", r"[0-9]+"),
    ("_URL_", r"(https?://)?([\da-z\.-]+)\.([a-z\.]{2,6})([/\w \.-]*)*/?"),
];

/// 별칭 테이블
///
/// 토큰 -> 정규식 조각 매핑을 결정적인 순서로 보관합니다.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

impl AliasTable {
    /// 빈 테이블을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 제공 별칭으로 채운 테이블을 생성합니다.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for (token, fragment) in BUILTIN_ALIASES {
            table.insert(*token, *fragment);
        }
        table
    }

    /// 기본 제공 별칭에 설정의 별칭을 더한 테이블을 생성합니다.
    ///
    /// 같은 토큰이 있으면 설정 값이 기본값을 대체합니다 (위치는 유지).
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::with_builtins();
        for (token, fragment) in overrides {
            table.insert(token.clone(), fragment.clone());
        }
        table
    }

    /// 별칭을 추가하거나 대체합니다.
    pub fn insert(&mut self, token: impl Into<String>, fragment: impl Into<String>) {
        let token = token.into();
        let fragment = fragment.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = fragment,
            None => self.entries.push((token, fragment)),
        }
    }

    /// 토큰의 조각을 조회합니다.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, f)| f.as_str())
    }

    /// 등록된 별칭 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 조각 안의 모든 별칭 토큰을 치환합니다.
    ///
    /// 입력을 왼쪽에서 오른쪽으로 한 번만 훑으며, 치환 결과는 다시 검사하지 않습니다.
    /// 같은 위치에서 여러 토큰이 시작할 수 있으면 테이블 순서상 먼저인 토큰이 이깁니다.
    pub fn resolve(&self, fragment: &str) -> String {
        replace_tokens(fragment, self.entries.iter().map(|(t, f)| (t.as_str(), f.as_str())))
    }
}

/// 단일 패스 토큰 치환. 매크로 테이블도 같은 방식으로 동작합니다.
pub(crate) fn replace_tokens<'a, I>(input: &str, tokens: I) -> String
where
    I: Iterator<Item = (&'a str, &'a str)> + Clone,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    'scan: while !rest.is_empty() {
        for (token, replacement) in tokens.clone() {
            if !token.is_empty() && rest.starts_with(token) {
                out.push_str(replacement);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}
