//! 에러 타입 -- 도메인별 에러 정의

/// ochlero 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum OchleroError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 구성/실행 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 메시지 발행 에러
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// 로그 피드 에러
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 구성/실행 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 템플릿/감시자 컴파일 실패 (시작 시 치명적)
    #[error("compile failed: {0}")]
    Compile(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

/// 메시지 발행 에러
///
/// 발행 실패는 호출 단위로 복구 가능하며, 메인 루프로 전파되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// 브로커 연결/전송 실패
    #[error("transport failure on topic '{topic}': {reason}")]
    Transport { topic: String, reason: String },

    /// 제한 시간 초과
    #[error("publish to topic '{topic}' timed out after {timeout_ms}ms")]
    Timeout { topic: String, timeout_ms: u64 },
}

/// 로그 피드 에러
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// 피드 프로세스 시작 실패
    #[error("failed to spawn feed '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// 피드가 닫힘 (더 이상 엔트리가 오지 않음)
    #[error("feed closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_error_display_contains_topic() {
        let err = PublishError::Timeout {
            topic: "ci/jobs".to_owned(),
            timeout_ms: 5000,
        };
        let msg = err.to_string();
        assert!(msg.contains("ci/jobs"));
        assert!(msg.contains("5000"));
    }

    #[test]
    fn config_error_converts_to_top_level() {
        let err: OchleroError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, OchleroError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn source_closed_display() {
        let err: OchleroError = SourceError::Closed.into();
        assert_eq!(err.to_string(), "source error: feed closed");
    }
}
