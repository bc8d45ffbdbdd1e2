//! 패턴 컴파일러 -- 템플릿 + placeholder 정의 -> [`Event`]
//!
//! 1. 매칭/발행 템플릿을 구간 시퀀스로 분해
//! 2. `where` 조각의 별칭 해석
//! 3. 매칭 패턴 `^(?:...)$` 조립 (placeholder -> `(?P<name>fragment)`)
//! 4. 발행 템플릿 -> 렌더 슬롯
//!
//! 모든 검증은 생성 시점에 수행됩니다. 첫 매칭까지 미루지 않습니다.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::sync::Arc;

use regex::Regex;

use super::alias::AliasTable;
use super::event::Event;
use super::macros::MacroTable;
use super::parser::{Segment, placeholder_names, tokenize};
use crate::error::WatchPipelineError;

/// 패턴 컴파일러
///
/// 별칭/매크로 테이블을 주입받아 이벤트를 컴파일합니다.
/// 테이블은 컴파일된 이벤트들과 `Arc`로 공유됩니다.
#[derive(Debug, Clone)]
pub struct PatternCompiler {
    aliases: Arc<AliasTable>,
    macros: Arc<MacroTable>,
}

impl PatternCompiler {
    /// 주어진 테이블로 컴파일러를 생성합니다.
    pub fn new(aliases: AliasTable, macros: MacroTable) -> Self {
        Self {
            aliases: Arc::new(aliases),
            macros: Arc::new(macros),
        }
    }

    /// 별칭 테이블
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// 매크로 테이블
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// 이벤트를 컴파일합니다.
    ///
    /// # Errors
    /// - 매칭 템플릿이 `where`에 없는 placeholder를 참조
    /// - 매칭 템플릿에서 같은 placeholder를 두 번 이상 참조
    /// - 발행 템플릿이 패턴에서 캡처되지 않는 placeholder를 참조
    /// - 조립된 패턴이 유효한 정규식이 아님
    pub fn compile(
        &self,
        name: &str,
        template: &str,
        placeholders: &BTreeMap<String, String>,
        publish: &str,
    ) -> Result<Event, WatchPipelineError> {
        let resolved: BTreeMap<String, String> = placeholders
            .iter()
            .map(|(key, fragment)| (key.clone(), self.aliases.resolve(fragment)))
            .collect();

        let segments = tokenize(template);
        let mut source = String::with_capacity(template.len() + 8);
        let mut captures: Vec<String> = Vec::new();
        source.push_str("^(?:");

        for segment in &segments {
            match segment {
                Segment::Literal(text) => source.push_str(text),
                Segment::Placeholder(key) => {
                    let fragment = resolved.get(key).ok_or_else(|| {
                        WatchPipelineError::UndeclaredPlaceholder {
                            event: name.to_owned(),
                            name: key.clone(),
                        }
                    })?;
                    if captures.contains(key) {
                        return Err(WatchPipelineError::PlaceholderCollision {
                            event: name.to_owned(),
                            name: key.clone(),
                        });
                    }
                    // String에 대한 write!는 실패하지 않습니다
                    let _ = write!(source, "(?P<{key}>{fragment})");
                    captures.push(key.clone());
                }
            }
        }
        source.push_str(")$");

        let pattern = Regex::new(&source).map_err(|e| WatchPipelineError::InvalidPattern {
            event: name.to_owned(),
            reason: e.to_string(),
        })?;

        let render = tokenize(publish);
        let captured: HashSet<&str> = captures.iter().map(String::as_str).collect();
        if let Some(missing) = placeholder_names(&render).find(|key| !captured.contains(key)) {
            return Err(WatchPipelineError::UncapturedPlaceholder {
                event: name.to_owned(),
                name: missing.to_owned(),
            });
        }

        for unused in resolved.keys().filter(|key| !captured.contains(key.as_str())) {
            tracing::debug!(
                event = name,
                placeholder = %unused,
                "placeholder declared in 'where' but not used by the pattern"
            );
        }

        Ok(Event {
            name: name.to_owned(),
            template: template.to_owned(),
            placeholders: resolved,
            captures,
            pattern,
            publish_template: publish.to_owned(),
            render,
            macros: Arc::clone(&self.macros),
        })
    }
}

impl Default for PatternCompiler {
    /// 기본 제공 별칭과 매크로를 사용합니다.
    fn default() -> Self {
        Self::new(AliasTable::with_builtins(), MacroTable::with_builtins())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::event::{STATIC_MATCH_FIELD, STATIC_MATCH_VALUE};
    use crate::template::macros::MacroValue;

    fn where_(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn pattern_without_placeholders() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile("testEvent", "abcd", &BTreeMap::new(), "dcba")
            .unwrap();
        assert_eq!(event.pattern_source(), "^(?:abcd)$");

        let fields = event.prescan("abcd").unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get(STATIC_MATCH_FIELD).unwrap(), STATIC_MATCH_VALUE);

        assert_eq!(event.scan("abcd").as_deref(), Some("dcba"));
        assert_eq!(event.scan("trolololo"), None);
    }

    #[test]
    fn pattern_with_placeholders() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile(
                "testEvent",
                "abcd ${a} ${b} dcba",
                &where_(&[("a", "aaa"), ("b", "bbb")]),
                "hello ${b} ${a}",
            )
            .unwrap();
        assert_eq!(
            event.pattern_source(),
            "^(?:abcd (?P<a>aaa) (?P<b>bbb) dcba)$"
        );
        assert_eq!(event.prescan("abcd"), None);

        let fields = event.prescan("abcd aaa bbb dcba").unwrap();
        assert_eq!(fields, where_(&[("a", "aaa"), ("b", "bbb")]));
        assert_eq!(
            event.scan("abcd aaa bbb dcba").as_deref(),
            Some("hello bbb aaa")
        );
        assert_eq!(event.scan("trolololo"), None);
    }

    #[test]
    fn pattern_with_aliases() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile(
                "testEvent",
                "abcd ${a} ${b} dcba",
                &where_(&[("a", "_INT_"), ("b", "_ALPHANUMERIC_")]),
                "hello ${b} ${a}",
            )
            .unwrap();
        assert_eq!(
            event.pattern_source(),
            r"^(?:abcd (?P<a>[0-9]+) (?P<b>\w+) dcba)$"
        );
        assert_eq!(
            event.prescan("abcd 42 ROFLCOPTER dcba").unwrap(),
            where_(&[("a", "42"), ("b", "ROFLCOPTER")])
        );
        assert_eq!(
            event.scan("abcd 42 ROFLCOPTER dcba").as_deref(),
            Some("hello ROFLCOPTER 42")
        );
        assert_eq!(event.placeholders().get("a").unwrap(), "[0-9]+");
    }

    #[test]
    fn partial_match_does_not_count() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile("e", "job ${id}", &where_(&[("id", "_INT_")]), "${id}")
            .unwrap();
        assert_eq!(event.scan("job 12 finished"), None);
        assert_eq!(event.scan("the job 12"), None);
        assert_eq!(event.scan("job 12").as_deref(), Some("12"));
    }

    #[test]
    fn top_level_alternation_stays_anchored() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile("e", "start|stop", &BTreeMap::new(), "state changed")
            .unwrap();
        assert!(event.prescan("start").is_some());
        assert!(event.prescan("stop").is_some());
        assert!(event.prescan("restart").is_none());
        assert!(event.prescan("stopped").is_none());
    }

    #[test]
    fn undeclared_placeholder_is_compile_error() {
        let compiler = PatternCompiler::default();
        let err = compiler
            .compile("e", "user ${user} logged in", &BTreeMap::new(), "hi")
            .unwrap_err();
        assert!(matches!(
            err,
            WatchPipelineError::UndeclaredPlaceholder { ref name, .. } if name == "user"
        ));
    }

    #[test]
    fn repeated_placeholder_is_collision() {
        let compiler = PatternCompiler::default();
        let err = compiler
            .compile("e", "${a} and ${a}", &where_(&[("a", "x")]), "${a}")
            .unwrap_err();
        assert!(matches!(err, WatchPipelineError::PlaceholderCollision { .. }));
    }

    #[test]
    fn fragment_group_name_collision_is_invalid_pattern() {
        let compiler = PatternCompiler::default();
        let err = compiler
            .compile(
                "e",
                "${a} ${b}",
                &where_(&[("a", "x"), ("b", "(?P<a>y)")]),
                "${a}",
            )
            .unwrap_err();
        assert!(matches!(err, WatchPipelineError::InvalidPattern { .. }));
    }

    #[test]
    fn malformed_fragment_is_invalid_pattern() {
        let compiler = PatternCompiler::default();
        let err = compiler
            .compile("bad", "x ${a}", &where_(&[("a", "[unclosed")]), "${a}")
            .unwrap_err();
        assert!(err.is_compile_error());
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn publish_placeholder_must_be_captured() {
        let compiler = PatternCompiler::default();
        let err = compiler
            .compile("e", "static", &where_(&[("a", "x")]), "value ${a}")
            .unwrap_err();
        assert!(matches!(
            err,
            WatchPipelineError::UncapturedPlaceholder { ref name, .. } if name == "a"
        ));
    }

    #[test]
    fn unused_where_entry_is_allowed() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile("e", "static", &where_(&[("a", "x")]), "fixed")
            .unwrap();
        assert!(event.captured_names().is_empty());
        assert_eq!(event.scan("static").as_deref(), Some("fixed"));
    }

    #[test]
    fn optional_group_renders_empty() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile(
                "e",
                "done(?: ${code})?",
                &where_(&[("code", "_INT_")]),
                "[${code}]",
            )
            .unwrap();
        assert_eq!(event.scan("done 3").as_deref(), Some("[3]"));
        assert_eq!(event.scan("done").as_deref(), Some("[]"));
    }

    #[test]
    fn placeholder_value_is_not_reexpanded() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile("e", "say ${w}", &where_(&[("w", ".+")]), "${w} / ${w}")
            .unwrap();
        assert_eq!(
            event.scan("say ${w}").as_deref(),
            Some("${w} / ${w}")
        );
    }

    #[test]
    fn macros_apply_to_rendered_output() {
        let mut macros = MacroTable::new();
        macros.insert("_EPOCH_", MacroValue::dynamic(|| "123456".to_owned()));
        let compiler = PatternCompiler::new(AliasTable::with_builtins(), macros);
        let event = compiler
            .compile(
                "e",
                "build ${n} ok",
                &where_(&[("n", "_INT_")]),
                "build ${n} at _EPOCH_",
            )
            .unwrap();
        assert_eq!(
            event.scan("build 7 ok").as_deref(),
            Some("build 7 at 123456")
        );
    }

    #[test]
    fn compiling_twice_is_equivalent() {
        let compiler = PatternCompiler::default();
        let placeholders = where_(&[("ip", "_IPv4_"), ("user", "_ALPHANUMERIC_")]);
        let first = compiler
            .compile("e", "login ${user} from ${ip}", &placeholders, "${user}@${ip}")
            .unwrap();
        let second = compiler
            .compile("e", "login ${user} from ${ip}", &placeholders, "${user}@${ip}")
            .unwrap();
        assert_eq!(first.pattern_source(), second.pattern_source());
        for line in [
            "login root from 10.0.0.1",
            "login root from 999.0.0.1",
            "logout root",
            "",
        ] {
            assert_eq!(first.prescan(line), second.prescan(line));
            assert_eq!(first.scan(line), second.scan(line));
        }
    }

    #[test]
    fn empty_template_matches_only_empty_line() {
        let compiler = PatternCompiler::default();
        let event = compiler
            .compile("e", "", &BTreeMap::new(), "empty")
            .unwrap();
        assert_eq!(event.scan("").as_deref(), Some("empty"));
        assert_eq!(event.scan(" "), None);
    }
}
