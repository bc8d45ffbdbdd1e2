//! 컴파일된 이벤트 -- 매칭, 필드 추출, 메시지 렌더링
//!
//! [`Event`]는 [`PatternCompiler`](super::PatternCompiler)가 생성하며 이후 불변입니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;

use super::macros::MacroTable;
use super::parser::Segment;

/// placeholder가 없는 패턴이 매칭됐을 때 반환하는 필드 이름
pub const STATIC_MATCH_FIELD: &str = "_static_";
/// placeholder가 없는 패턴이 매칭됐을 때 반환하는 필드 값
pub const STATIC_MATCH_VALUE: &str = "matched";

/// 추출된 필드 (placeholder 이름 -> 값)
pub type Fields = BTreeMap<String, String>;

/// 컴파일된 매처
///
/// 전체 문자열 매칭 패턴과 렌더 템플릿을 가집니다.
/// 공유 가변 상태가 없으므로 여러 태스크에서 동시에 사용할 수 있습니다.
#[derive(Debug, Clone)]
pub struct Event {
    pub(super) name: String,
    pub(super) template: String,
    pub(super) placeholders: BTreeMap<String, String>,
    pub(super) captures: Vec<String>,
    pub(super) pattern: Regex,
    pub(super) publish_template: String,
    pub(super) render: Vec<Segment>,
    pub(super) macros: Arc<MacroTable>,
}

impl Event {
    /// 진단용 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 원본 매칭 템플릿
    pub fn template(&self) -> &str {
        &self.template
    }

    /// 별칭이 해석된 placeholder 정의
    pub fn placeholders(&self) -> &BTreeMap<String, String> {
        &self.placeholders
    }

    /// 패턴이 캡처하는 placeholder 이름 (템플릿 등장 순서)
    pub fn captured_names(&self) -> &[String] {
        &self.captures
    }

    /// 컴파일된 정규식 소스
    pub fn pattern_source(&self) -> &str {
        self.pattern.as_str()
    }

    /// 원본 발행 템플릿
    pub fn publish_template(&self) -> &str {
        &self.publish_template
    }

    /// 줄 전체를 패턴에 매칭하고 필드를 추출합니다.
    ///
    /// - 매칭 실패: `None`
    /// - placeholder 없는 패턴: `{STATIC_MATCH_FIELD: STATIC_MATCH_VALUE}`
    /// - 참여하지 않은 그룹(선택적 구간)의 값은 빈 문자열
    pub fn prescan(&self, line: &str) -> Option<Fields> {
        let caps = self.pattern.captures(line)?;

        if self.captures.is_empty() {
            let mut sentinel = Fields::new();
            sentinel.insert(STATIC_MATCH_FIELD.to_owned(), STATIC_MATCH_VALUE.to_owned());
            return Some(sentinel);
        }

        Some(
            self.captures
                .iter()
                .map(|name| {
                    let value = caps.name(name).map_or("", |m| m.as_str());
                    (name.clone(), value.to_owned())
                })
                .collect(),
        )
    }

    /// 매칭에 성공하면 렌더링된 발행 메시지를 반환합니다.
    ///
    /// 매크로는 필드 대입이 끝난 결과에 대해 이 시점에 평가됩니다.
    pub fn scan(&self, line: &str) -> Option<String> {
        let fields = self.prescan(line)?;
        Some(self.macros.resolve(&self.render(&fields)))
    }

    /// 필드를 렌더 템플릿에 대입합니다 (매크로 미적용).
    pub fn render(&self, fields: &Fields) -> String {
        let mut out = String::with_capacity(self.publish_template.len());
        for segment in &self.render {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(value) = fields.get(name) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}
