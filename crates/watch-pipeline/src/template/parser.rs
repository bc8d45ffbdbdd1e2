//! 템플릿 토크나이저
//!
//! 템플릿 문자열을 리터럴 구간과 `${name}` placeholder 참조의 시퀀스로 분해합니다.
//! 매칭 패턴 빌더와 렌더러는 모두 이 시퀀스를 소비하므로,
//! 문자열 치환을 반복하며 생기는 이중 치환이 발생하지 않습니다.

/// 템플릿 구간
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// 리터럴 텍스트 (매칭 템플릿에서는 정규식 소스, 발행 템플릿에서는 일반 텍스트)
    Literal(String),
    /// `${name}` 참조
    Placeholder(String),
}

/// 템플릿을 구간 시퀀스로 분해합니다.
///
/// placeholder 이름은 `[A-Za-z_][A-Za-z0-9_]*` 이어야 합니다.
/// 그 외의 `$`, 닫히지 않은 `${`, 잘못된 이름은 리터럴로 남습니다.
/// 인접한 리터럴은 하나로 합쳐집니다.
pub fn tokenize(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(pos) = rest.find("${") {
        let after = &rest[pos + 2..];
        match after.find('}') {
            Some(end) if is_placeholder_name(&after[..end]) => {
                literal.push_str(&rest[..pos]);
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(after[..end].to_owned()));
                rest = &after[end + 1..];
            }
            _ => {
                // `$`만 소비하고 다음 위치부터 다시 스캔 (`${a ${b}`의 `${b}`)
                literal.push_str(&rest[..pos + 1]);
                rest = &rest[pos + 1..];
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// 유효한 placeholder 이름인지 확인합니다 (정규식 그룹 이름으로도 유효).
pub fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// 구간 시퀀스에서 placeholder 이름을 등장 순서대로 반환합니다.
pub fn placeholder_names(segments: &[Segment]) -> impl Iterator<Item = &str> {
    segments.iter().filter_map(|segment| match segment {
        Segment::Placeholder(name) => Some(name.as_str()),
        Segment::Literal(_) => None,
    })
}
