//! 설정 관리 -- ochlero.toml 파싱 및 런타임 설정
//!
//! [`OchleroConfig`]는 데몬 전체 설정을 담는 최상위 구조체입니다.
//! 감시자(watcher) 정의 자체는 YAML 파일에 있으며, 여기서는 그 경로만 가집니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`OCHLERO_MQTT_HOST=broker` 형식)
//! 3. 설정 파일 (`ochlero.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ochlero_core::error::OchleroError> {
//! use ochlero_core::config::OchleroConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = OchleroConfig::load("ochlero.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = OchleroConfig::parse("[mqtt]\nhost = \"broker\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, OchleroError};

/// ochlero 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OchleroConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// MQTT 싱크 설정
    #[serde(default)]
    pub mqtt: MqttConfig,
    /// journal 피드 설정
    #[serde(default)]
    pub journal: JournalConfig,
    /// 감시자 정의 위치
    #[serde(default)]
    pub watchers: WatchersConfig,
    /// 사용자 정의 타입 별칭 (`_NAME_` -> 정규식 조각)
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// 사용자 정의 리터럴 매크로 (`_NAME_` -> 값)
    #[serde(default)]
    pub macros: BTreeMap<String, String>,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl OchleroConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, OchleroError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, OchleroError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OchleroError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                OchleroError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, OchleroError> {
        toml::from_str(toml_str).map_err(|e| {
            OchleroError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `OCHLERO_{SECTION}_{FIELD}`
    /// 예: `OCHLERO_MQTT_HOST=broker.local`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "OCHLERO_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "OCHLERO_GENERAL_LOG_FORMAT");

        // MQTT
        override_string(&mut self.mqtt.host, "OCHLERO_MQTT_HOST");
        override_parsed(&mut self.mqtt.port, "OCHLERO_MQTT_PORT");
        override_optional_string(&mut self.mqtt.client_id, "OCHLERO_MQTT_CLIENT_ID");
        override_parsed(&mut self.mqtt.qos, "OCHLERO_MQTT_QOS");
        override_parsed(&mut self.mqtt.timeout_secs, "OCHLERO_MQTT_TIMEOUT_SECS");
        if let (Ok(username), Ok(password)) = (
            std::env::var("OCHLERO_MQTT_USERNAME"),
            std::env::var("OCHLERO_MQTT_PASSWORD"),
        ) {
            self.mqtt.auth = Some(MqttAuth { username, password });
        }

        // Journal
        override_string(&mut self.journal.command, "OCHLERO_JOURNAL_COMMAND");
        override_parsed(
            &mut self.journal.poll_interval_ms,
            "OCHLERO_JOURNAL_POLL_INTERVAL_MS",
        );
        override_parsed(&mut self.journal.max_batch, "OCHLERO_JOURNAL_MAX_BATCH");
        override_parsed(&mut self.journal.this_boot, "OCHLERO_JOURNAL_THIS_BOOT");
        override_string(&mut self.journal.priority, "OCHLERO_JOURNAL_PRIORITY");

        // Watchers
        override_string(&mut self.watchers.path, "OCHLERO_WATCHERS_PATH");

        // Metrics
        override_parsed(&mut self.metrics.enabled, "OCHLERO_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "OCHLERO_METRICS_LISTEN_ADDR");
        override_parsed(&mut self.metrics.port, "OCHLERO_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), OchleroError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.mqtt.host.is_empty() {
            return Err(invalid("mqtt.host", "host must not be empty"));
        }
        if self.mqtt.port == 0 {
            return Err(invalid("mqtt.port", "port must be greater than 0"));
        }
        if self.mqtt.qos > 2 {
            return Err(invalid("mqtt.qos", "must be one of: 0, 1, 2"));
        }
        if self.mqtt.timeout_secs == 0 {
            return Err(invalid("mqtt.timeout_secs", "must be greater than 0"));
        }
        if let Some(ref client_id) = self.mqtt.client_id {
            if client_id.trim().is_empty() || client_id.starts_with(' ') {
                return Err(invalid(
                    "mqtt.client_id",
                    "client id must not be empty or start with a space",
                ));
            }
        }
        if let Some(ref auth) = self.mqtt.auth {
            if auth.username.is_empty() {
                return Err(invalid("mqtt.auth.username", "username must not be empty"));
            }
        }

        if self.journal.command.is_empty() {
            return Err(invalid("journal.command", "command must not be empty"));
        }
        if self.journal.poll_interval_ms == 0 {
            return Err(invalid("journal.poll_interval_ms", "must be greater than 0"));
        }
        if self.journal.max_batch == 0 {
            return Err(invalid("journal.max_batch", "must be greater than 0"));
        }
        let valid_priorities = [
            "", "emerg", "alert", "crit", "err", "warning", "notice", "info", "debug",
        ];
        if !valid_priorities.contains(&self.journal.priority.as_str()) {
            return Err(invalid(
                "journal.priority",
                format!(
                    "must be empty or one of: {}",
                    valid_priorities[1..].join(", ")
                ),
            ));
        }

        if self.watchers.path.is_empty() {
            return Err(invalid("watchers.path", "path must not be empty"));
        }

        for token in self.aliases.keys() {
            validate_token("aliases", token)?;
        }
        for token in self.macros.keys() {
            validate_token("macros", token)?;
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "port must be greater than 0"));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// MQTT 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// None이면 `ochlero/<pid>`
    pub client_id: Option<String>,
    pub auth: Option<MqttAuth>,
    pub qos: u8,
    pub timeout_secs: u64,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 1883,
            client_id: None,
            auth: None,
            qos: 0,
            timeout_secs: 5,
            keep_alive_secs: 30,
        }
    }
}

impl MqttConfig {
    /// 실제로 사용할 클라이언트 ID를 반환합니다.
    pub fn effective_client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("ochlero/{}", std::process::id()))
    }
}

/// MQTT 인증 정보
#[derive(Clone, Serialize, Deserialize)]
pub struct MqttAuth {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for MqttAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// journal 피드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// journalctl 실행 파일
    pub command: String,
    /// 대기 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 한 번에 꺼낼 최대 엔트리 수
    pub max_batch: usize,
    /// 현재 부팅 이후 엔트리만
    pub this_boot: bool,
    /// 우선순위 상한 (빈 문자열이면 필터 없음)
    pub priority: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            command: "journalctl".to_owned(),
            poll_interval_ms: 100,
            max_batch: 1000,
            this_boot: true,
            priority: "info".to_owned(),
        }
    }
}

/// 감시자 정의 위치
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchersConfig {
    /// YAML 파일 또는 `*.yml`/`*.yaml` 파일이 있는 디렉토리
    pub path: String,
}

impl Default for WatchersConfig {
    fn default() -> Self {
        Self {
            path: "/etc/ochlero/watchers".to_owned(),
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9107,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> OchleroError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 별칭/매크로 토큰은 `_NAME_` 형태여야 합니다 (토큰끼리 겹치지 않도록).
fn validate_token(section: &str, token: &str) -> Result<(), OchleroError> {
    let inner = token
        .strip_prefix('_')
        .and_then(|rest| rest.strip_suffix('_'));
    match inner {
        Some(name) if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) => {
            Ok(())
        }
        _ => Err(invalid(
            &format!("{section}.{token}"),
            "token must look like _NAME_ (ASCII letters and digits between underscores)",
        )),
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_optional_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = Some(val);
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = std::any::type_name::<T>(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = OchleroConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.journal.poll_interval_ms, 100);
        assert!(config.journal.this_boot);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        OchleroConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = OchleroConfig::parse("").unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.watchers.path, "/etc/ochlero/watchers");
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let toml = r#"
[mqtt]
host = "firehose.example.org"

[mqtt.auth]
username = "bot"
password = "hunter2"

[aliases]
_HEX_ = "[0-9a-f]+"
"#;
        let config = OchleroConfig::parse(toml).unwrap();
        assert_eq!(config.mqtt.host, "firehose.example.org");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.auth.as_ref().unwrap().username, "bot");
        assert_eq!(config.aliases.get("_HEX_").unwrap(), "[0-9a-f]+");
        config.validate().unwrap();
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = OchleroConfig::parse("[mqtt\nhost=").unwrap_err();
        assert!(matches!(
            err,
            OchleroError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn invalid_qos_fails_validation() {
        let mut config = OchleroConfig::default();
        config.mqtt.qos = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_client_id_fails_validation() {
        let mut config = OchleroConfig::default();
        config.mqtt.client_id = Some("  ".to_owned());
        assert!(config.validate().is_err());

        config.mqtt.client_id = Some("ochlero-edge".to_owned());
        config.validate().unwrap();
    }

    #[test]
    fn invalid_priority_fails_validation() {
        let mut config = OchleroConfig::default();
        config.journal.priority = "loud".to_owned();
        assert!(config.validate().is_err());

        config.journal.priority = String::new();
        config.validate().unwrap();
    }

    #[test]
    fn alias_token_must_be_delimited() {
        let mut config = OchleroConfig::default();
        config.aliases.insert("HEX".to_owned(), "[0-9a-f]+".to_owned());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("aliases.HEX"));

        let mut config = OchleroConfig::default();
        config.macros.insert("__".to_owned(), "x".to_owned());
        assert!(config.validate().is_err());
    }

    #[test]
    fn auth_debug_hides_password() {
        let auth = MqttAuth {
            username: "bot".to_owned(),
            password: "hunter2".to_owned(),
        };
        let debug = format!("{auth:?}");
        assert!(debug.contains("bot"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn client_id_defaults_to_pid() {
        let config = MqttConfig::default();
        assert_eq!(
            config.effective_client_id(),
            format!("ochlero/{}", std::process::id())
        );
    }

    #[test]
    #[serial]
    fn env_override_replaces_values() {
        // SAFETY: serial 테스트에서만 환경변수를 변경합니다
        unsafe {
            std::env::set_var("OCHLERO_MQTT_HOST", "env-broker");
            std::env::set_var("OCHLERO_MQTT_PORT", "8883");
        }
        let mut config = OchleroConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("OCHLERO_MQTT_HOST");
            std::env::remove_var("OCHLERO_MQTT_PORT");
        }
        assert_eq!(config.mqtt.host, "env-broker");
        assert_eq!(config.mqtt.port, 8883);
    }

    #[test]
    #[serial]
    fn unparseable_env_override_is_ignored() {
        // SAFETY: serial 테스트에서만 환경변수를 변경합니다
        unsafe {
            std::env::set_var("OCHLERO_JOURNAL_POLL_INTERVAL_MS", "soon");
        }
        let mut config = OchleroConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("OCHLERO_JOURNAL_POLL_INTERVAL_MS");
        }
        assert_eq!(config.journal.poll_interval_ms, 100);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = OchleroConfig::from_file("/nonexistent/ochlero.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OchleroError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ochlero.toml");
        tokio::fs::write(&path, "[journal]\npoll_interval_ms = 250\n")
            .await
            .unwrap();
        let config = OchleroConfig::from_file(&path).await.unwrap();
        assert_eq!(config.journal.poll_interval_ms, 250);
    }
}
