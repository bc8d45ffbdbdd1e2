//! 감시자 파일 로더 -- YAML 감시자 정의를 디스크에서 로드합니다.
//!
//! 경로가 파일이면 그 파일만, 디렉토리면 그 안의 `.yml`/`.yaml` 파일을
//! 파일 이름 순서로 로드합니다. 어떤 파일이든 파싱/검증에 실패하면 전체 로딩이 실패합니다.

use std::path::{Path, PathBuf};

use crate::error::WatchPipelineError;

use super::types::{WatcherDefinition, WatcherFile};

/// 파일당 최대 크기
const MAX_WATCHER_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
/// 최대 감시자 수 (모든 파일 합계)
const MAX_WATCHERS_COUNT: usize = 10_000;

/// 감시자 파일 로더
pub struct WatcherLoader;

impl WatcherLoader {
    /// 파일 또는 디렉토리에서 감시자를 로드합니다.
    ///
    /// # Errors
    /// - 경로가 존재하지 않거나 읽을 수 없는 경우
    /// - 파싱 또는 검증에 실패한 파일이 있는 경우
    /// - 감시자 수가 `MAX_WATCHERS_COUNT`를 초과하는 경우
    pub async fn load_path(
        path: impl AsRef<Path>,
    ) -> Result<Vec<WatcherDefinition>, WatchPipelineError> {
        let path = path.as_ref();
        let metadata =
            tokio::fs::metadata(path)
                .await
                .map_err(|e| WatchPipelineError::WatcherLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read metadata: {e}"),
                })?;

        if metadata.is_dir() {
            Self::load_directory(path).await
        } else {
            let watchers = Self::load_file(path).await?;
            Self::check_count(path, watchers.len())?;
            Ok(watchers)
        }
    }

    /// 디렉토리의 모든 YAML 파일을 파일 이름 순서로 로드합니다.
    pub async fn load_directory(
        dir: impl AsRef<Path>,
    ) -> Result<Vec<WatcherDefinition>, WatchPipelineError> {
        let dir = dir.as_ref();
        let dir_error = |e: std::io::Error| WatchPipelineError::WatcherLoad {
            path: dir.display().to_string(),
            reason: format!("failed to read directory: {e}"),
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(dir_error)?;
        let mut files: Vec<PathBuf> = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
            let path = entry.path();

            // .yml / .yaml 확장자만 처리
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");

            if is_yaml {
                files.push(path);
            }
        }
        files.sort();

        let mut watchers = Vec::new();
        for file in &files {
            let loaded = Self::load_file(file).await?;
            tracing::debug!(
                path = %file.display(),
                count = loaded.len(),
                "loaded watcher file"
            );
            watchers.extend(loaded);
            Self::check_count(dir, watchers.len())?;
        }

        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            count = watchers.len(),
            "loaded watchers"
        );

        Ok(watchers)
    }

    /// 단일 YAML 파일에서 감시자를 로드합니다.
    pub async fn load_file(
        path: impl AsRef<Path>,
    ) -> Result<Vec<WatcherDefinition>, WatchPipelineError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata =
            tokio::fs::metadata(path)
                .await
                .map_err(|e| WatchPipelineError::WatcherLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file metadata: {e}"),
                })?;

        if metadata.len() > MAX_WATCHER_FILE_SIZE {
            return Err(WatchPipelineError::WatcherLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_WATCHER_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            WatchPipelineError::WatcherLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file: {e}"),
            }
        })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하고 검증합니다.
    pub fn parse_yaml(
        yaml_str: &str,
        source: &str,
    ) -> Result<Vec<WatcherDefinition>, WatchPipelineError> {
        // 빈 파일은 감시자가 없는 파일로 취급
        if yaml_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: WatcherFile =
            serde_yaml::from_str(yaml_str).map_err(|e| WatchPipelineError::WatcherLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        file.validate()?;

        Ok(file.watchers)
    }

    fn check_count(path: &Path, count: usize) -> Result<(), WatchPipelineError> {
        if count > MAX_WATCHERS_COUNT {
            return Err(WatchPipelineError::WatcherLoad {
                path: path.display().to_string(),
                reason: format!("too many watchers: max {MAX_WATCHERS_COUNT}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKUP_YAML: &str = r#"
watchers:
  - unit: backup.service
    topic: ops/backup
    events:
      - name: job_done
        pattern: 'job ${job} finished'
        where:
          job: _INT_
        publish: 'done ${job}'
"#;

    #[test]
    fn parse_valid_yaml() {
        let watchers = WatcherLoader::parse_yaml(BACKUP_YAML, "backup.yml").unwrap();
        assert_eq!(watchers.len(), 1);
        assert_eq!(watchers[0].unit.as_deref(), Some("backup.service"));
        assert_eq!(watchers[0].events[0].name.as_deref(), Some("job_done"));
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        let result = WatcherLoader::parse_yaml("not: [valid: yaml: {{{", "bad.yml");
        assert!(matches!(result, Err(WatchPipelineError::WatcherLoad { .. })));
    }

    #[test]
    fn parse_yaml_missing_topic() {
        let yaml = r#"
watchers:
  - unit: a.service
    events: []
"#;
        assert!(WatcherLoader::parse_yaml(yaml, "no_topic.yml").is_err());
    }

    #[test]
    fn parse_yaml_runs_validation() {
        let yaml = r#"
watchers:
  - topic: 'a/#'
    events: []
"#;
        let err = WatcherLoader::parse_yaml(yaml, "wild.yml").unwrap_err();
        assert!(matches!(err, WatchPipelineError::WatcherValidation { .. }));
    }

    #[test]
    fn empty_file_has_no_watchers() {
        assert!(WatcherLoader::parse_yaml("  \n", "empty.yml").unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_nonexistent_path_returns_error() {
        let result = WatcherLoader::load_path("/nonexistent/path/watchers").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn directory_is_loaded_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let second = BACKUP_YAML.replace("ops/backup", "ops/second");
        tokio::fs::write(dir.path().join("20-second.yaml"), second)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("10-first.yml"), BACKUP_YAML)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("README.txt"), "ignored")
            .await
            .unwrap();

        let watchers = WatcherLoader::load_path(dir.path()).await.unwrap();
        let topics: Vec<_> = watchers.iter().map(|w| w.topic.as_str()).collect();
        assert_eq!(topics, vec!["ops/backup", "ops/second"]);
    }

    #[tokio::test]
    async fn one_bad_file_fails_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("good.yml"), BACKUP_YAML)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("bad.yml"), "watchers: {{{")
            .await
            .unwrap();

        let result = WatcherLoader::load_directory(dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn single_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("watchers.yml");
        tokio::fs::write(&file, BACKUP_YAML).await.unwrap();

        let watchers = WatcherLoader::load_path(&file).await.unwrap();
        assert_eq!(watchers.len(), 1);
    }
}
