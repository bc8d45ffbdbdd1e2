//! 발행 싱크 -- MQTT 단발 발행과 dry-run 로깅
//!
//! [`MqttPublisher`]는 호출마다 연결, 발행, 연결 해제를 수행하며
//! 호출 사이에 연결 상태를 유지하지 않습니다. 전체 과정은 설정된 제한 시간 안에 끝나야 합니다.

use std::time::Duration;

use ochlero_core::config::MqttConfig;
use ochlero_core::error::PublishError;
use ochlero_core::pipeline::Publisher;
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};

/// 요청 채널 용량 (발행 1건 + 연결 해제)
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// MQTT 단발 발행자
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    host: String,
    port: u16,
    client_id: String,
    credentials: Option<(String, String)>,
    qos: QoS,
    timeout: Duration,
    keep_alive: Duration,
}

impl MqttPublisher {
    /// 설정으로부터 발행자를 생성합니다.
    pub fn from_config(config: &MqttConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            client_id: config.effective_client_id(),
            credentials: config
                .auth
                .as_ref()
                .map(|auth| (auth.username.clone(), auth.password.clone())),
            qos: qos_from_level(config.qos),
            timeout: Duration::from_secs(config.timeout_secs),
            keep_alive: Duration::from_secs(config.keep_alive_secs),
        }
    }

    /// 브로커 주소 (`host:port`)
    pub fn broker(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 클라이언트 ID
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// 발행 QoS
    pub fn qos(&self) -> QoS {
        self.qos
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username.clone(), password.clone());
        }
        options
    }

    /// 연결, 발행, 확인 대기, 연결 해제를 순서대로 수행합니다.
    async fn publish_once(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        let transport = |reason: String| PublishError::Transport {
            topic: topic.to_owned(),
            reason,
        };

        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CHANNEL_CAPACITY);
        client
            .publish(topic, self.qos, false, payload.as_bytes().to_vec())
            .await
            .map_err(|e| transport(e.to_string()))?;

        let mut delivered = false;
        loop {
            let event = eventloop.poll().await.map_err(|e| transport(e.to_string()))?;

            let completes_delivery = match (&event, self.qos) {
                (Event::Outgoing(Outgoing::Publish(_)), QoS::AtMostOnce) => true,
                (Event::Incoming(Packet::PubAck(_)), QoS::AtLeastOnce) => true,
                (Event::Incoming(Packet::PubComp(_)), QoS::ExactlyOnce) => true,
                _ => false,
            };

            if completes_delivery && !delivered {
                delivered = true;
                client
                    .disconnect()
                    .await
                    .map_err(|e| transport(e.to_string()))?;
            }

            if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                return Ok(());
            }
        }
    }
}

impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        match tokio::time::timeout(self.timeout, self.publish_once(topic, payload)).await {
            Ok(result) => {
                if result.is_ok() {
                    tracing::debug!(
                        broker = %self.broker(),
                        topic = topic,
                        bytes = payload.len(),
                        "message published"
                    );
                }
                result
            }
            Err(_) => Err(PublishError::Timeout {
                topic: topic.to_owned(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

/// 설정의 QoS 수준(0..=2)을 변환합니다. 범위 밖 값은 설정 검증에서 거부됩니다.
fn qos_from_level(level: u8) -> QoS {
    match level {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

/// 발행하지 않고 로그만 남기는 싱크 (`--dry-run`)
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunPublisher;

impl Publisher for DryRunPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        tracing::info!(topic = topic, payload = payload, "dry run: message not published");
        Ok(())
    }
}

/// 런타임에 선택되는 발행 싱크
#[derive(Debug, Clone)]
pub enum Sink {
    /// MQTT 브로커로 발행
    Mqtt(MqttPublisher),
    /// 로그만 기록
    DryRun(DryRunPublisher),
}

impl Sink {
    /// 설정과 dry-run 여부로 싱크를 선택합니다.
    pub fn from_config(config: &MqttConfig, dry_run: bool) -> Self {
        if dry_run {
            Self::DryRun(DryRunPublisher)
        } else {
            Self::Mqtt(MqttPublisher::from_config(config))
        }
    }

    /// 진단용 설명
    pub fn describe(&self) -> String {
        match self {
            Self::Mqtt(publisher) => format!("mqtt://{}", publisher.broker()),
            Self::DryRun(_) => "dry-run".to_owned(),
        }
    }
}

impl Publisher for Sink {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        match self {
            Self::Mqtt(publisher) => publisher.publish(topic, payload).await,
            Self::DryRun(publisher) => publisher.publish(topic, payload).await,
        }
    }
}
