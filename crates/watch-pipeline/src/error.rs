//! 감시 파이프라인 에러 타입
//!
//! [`WatchPipelineError`]는 템플릿 컴파일, 감시자 로딩, 발행, 피드 처리 중
//! 발생하는 모든 에러를 표현합니다.
//! `From<WatchPipelineError> for OchleroError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! 컴파일 계열 에러([`WatchPipelineError::is_compile_error`])는 시작 시 치명적이고,
//! 발행 에러는 호출 단위로 기록 후 무시됩니다.

use ochlero_core::error::{OchleroError, PipelineError, PublishError, SourceError};

/// 감시 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum WatchPipelineError {
    /// 패턴이 유효한 정규식이 아님
    #[error("event '{event}': invalid pattern: {reason}")]
    InvalidPattern {
        /// 이벤트 이름
        event: String,
        /// 정규식 엔진이 보고한 사유
        reason: String,
    },

    /// 매칭 템플릿에서 같은 placeholder가 두 번 이상 사용됨
    #[error("event '{event}': placeholder '{name}' is referenced more than once in the pattern")]
    PlaceholderCollision {
        /// 이벤트 이름
        event: String,
        /// 충돌한 placeholder 이름
        name: String,
    },

    /// `where`에 선언되지 않은 placeholder 참조
    #[error("event '{event}': placeholder '{name}' is not declared in 'where'")]
    UndeclaredPlaceholder {
        /// 이벤트 이름
        event: String,
        /// placeholder 이름
        name: String,
    },

    /// 발행 템플릿이 매칭 패턴에서 캡처되지 않는 placeholder를 참조함
    #[error("event '{event}': placeholder '{name}' in publish template is not captured by the pattern")]
    UncapturedPlaceholder {
        /// 이벤트 이름
        event: String,
        /// placeholder 이름
        name: String,
    },

    /// 감시자 정의 파일 로딩 실패
    #[error("watcher load error: {path}: {reason}")]
    WatcherLoad {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 감시자 정의 유효성 검증 실패
    #[error("watcher validation error: watcher '{watcher}': {reason}")]
    WatcherValidation {
        /// 감시자 이름
        watcher: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 발행 실패
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// 로그 피드 실패
    #[error(transparent)]
    Source(#[from] SourceError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchPipelineError {
    /// 시작 시 치명적인 컴파일 계열 에러인지 확인합니다.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern { .. }
                | Self::PlaceholderCollision { .. }
                | Self::UndeclaredPlaceholder { .. }
                | Self::UncapturedPlaceholder { .. }
                | Self::WatcherLoad { .. }
                | Self::WatcherValidation { .. }
        )
    }
}

impl From<WatchPipelineError> for OchleroError {
    fn from(err: WatchPipelineError) -> Self {
        match err {
            WatchPipelineError::Publish(e) => OchleroError::Publish(e),
            WatchPipelineError::Source(e) => OchleroError::Source(e),
            WatchPipelineError::Io(e) => OchleroError::Io(e),
            e if e.is_compile_error() => {
                OchleroError::Pipeline(PipelineError::Compile(e.to_string()))
            }
            e => OchleroError::Pipeline(PipelineError::InitFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_display_names_event_and_placeholder() {
        let err = WatchPipelineError::PlaceholderCollision {
            event: "job_done".to_owned(),
            name: "job".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("job_done"));
        assert!(msg.contains("'job'"));
    }

    #[test]
    fn compile_errors_convert_to_pipeline_compile() {
        let err = WatchPipelineError::InvalidPattern {
            event: "e".to_owned(),
            reason: "unclosed group".to_owned(),
        };
        assert!(err.is_compile_error());
        let top: OchleroError = err.into();
        assert!(matches!(
            top,
            OchleroError::Pipeline(PipelineError::Compile(_))
        ));
    }

    #[test]
    fn publish_error_keeps_its_kind() {
        let err = WatchPipelineError::from(PublishError::Transport {
            topic: "t".to_owned(),
            reason: "refused".to_owned(),
        });
        assert!(!err.is_compile_error());
        let top: OchleroError = err.into();
        assert!(matches!(top, OchleroError::Publish(_)));
    }

    #[test]
    fn config_error_is_init_failure() {
        let err = WatchPipelineError::Config {
            field: "watchers.path".to_owned(),
            reason: "missing".to_owned(),
        };
        let top: OchleroError = err.into();
        assert!(matches!(
            top,
            OchleroError::Pipeline(PipelineError::InitFailed(_))
        ));
    }
}
