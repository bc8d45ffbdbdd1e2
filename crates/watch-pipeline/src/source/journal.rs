//! systemd journal 피드
//!
//! `journalctl --follow --lines=0 --output=json`을 자식 프로세스로 실행하고
//! 표준 출력을 [`JsonLinesSource`]로 읽습니다. `--lines=0`으로 과거 엔트리를 건너뛰므로
//! 시작 시점 이후의 엔트리만 전달됩니다.

use std::process::Stdio;
use std::time::Duration;

use ochlero_core::config::JournalConfig;
use ochlero_core::error::SourceError;
use ochlero_core::pipeline::EntrySource;
use ochlero_core::types::JournalEntry;
use tokio::process::{Child, Command};

use super::JsonLinesSource;

/// journalctl 자식 프로세스 피드
pub struct JournalSource {
    command: String,
    child: Child,
    inner: JsonLinesSource,
}

impl JournalSource {
    /// 설정으로부터 journalctl 인자 목록을 만듭니다.
    pub fn command_args(config: &JournalConfig) -> Vec<String> {
        let mut args = vec![
            "--follow".to_owned(),
            "--lines=0".to_owned(),
            "--output=json".to_owned(),
            "--no-pager".to_owned(),
        ];
        if config.this_boot {
            args.push("--boot".to_owned());
        }
        if !config.priority.is_empty() {
            args.push(format!("--priority={}", config.priority));
        }
        args
    }

    /// journalctl을 실행합니다.
    ///
    /// 자식 프로세스는 피드가 drop되면 종료됩니다.
    ///
    /// # Errors
    /// 프로세스를 시작할 수 없거나 표준 출력을 얻을 수 없는 경우
    pub fn spawn(config: &JournalConfig) -> Result<Self, SourceError> {
        let args = Self::command_args(config);
        let spawn_error = |reason: String| SourceError::Spawn {
            command: config.command.clone(),
            reason,
        };

        let mut child = Command::new(&config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout was not captured".to_owned()))?;

        tracing::info!(
            command = %config.command,
            args = ?args,
            pid = child.id(),
            "journal feed started"
        );

        Ok(Self {
            command: config.command.clone(),
            child,
            inner: JsonLinesSource::from_reader(stdout, config.max_batch),
        })
    }

    /// 실행 중인 명령
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl EntrySource for JournalSource {
    async fn wait_ready(&mut self, timeout: Duration) -> Result<bool, SourceError> {
        let result = self.inner.wait_ready(timeout).await;
        if matches!(result, Err(SourceError::Closed)) {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::error!(command = %self.command, status = %status, "journal feed exited");
                }
                Ok(None) => {
                    tracing::error!(command = %self.command, "journal feed closed its output");
                }
                Err(e) => {
                    tracing::error!(command = %self.command, error = %e, "journal feed state unknown");
                }
            }
        }
        result
    }

    fn next_batch(&mut self) -> Vec<JournalEntry> {
        self.inner.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_args_follow_current_boot() {
        let args = JournalSource::command_args(&JournalConfig::default());
        assert_eq!(
            args,
            vec![
                "--follow",
                "--lines=0",
                "--output=json",
                "--no-pager",
                "--boot",
                "--priority=info"
            ]
        );
    }

    #[test]
    fn optional_args_can_be_disabled() {
        let config = JournalConfig {
            this_boot: false,
            priority: String::new(),
            ..JournalConfig::default()
        };
        let args = JournalSource::command_args(&config);
        assert!(!args.iter().any(|a| a == "--boot"));
        assert!(!args.iter().any(|a| a.starts_with("--priority")));
    }

    #[tokio::test]
    async fn missing_command_is_spawn_error() {
        let config = JournalConfig {
            command: "/nonexistent/journalctl-ochlero-test".to_owned(),
            ..JournalConfig::default()
        };
        let err = JournalSource::spawn(&config).err().unwrap();
        assert!(matches!(err, SourceError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exited_process_closes_feed() {
        // `true`는 인자를 무시하고 즉시 종료합니다
        let config = JournalConfig {
            command: "true".to_owned(),
            ..JournalConfig::default()
        };
        let mut source = JournalSource::spawn(&config).unwrap();
        let mut closed = false;
        for _ in 0..50 {
            match source.wait_ready(Duration::from_millis(100)).await {
                Err(SourceError::Closed) => {
                    closed = true;
                    break;
                }
                Ok(_) => {
                    source.next_batch();
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert!(closed);
    }
}
