use rumqttc::QoS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker connection parameters.
///
/// Missing fields fall back to [`Default`], so a config file only needs the
/// values that differ from the public test broker.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BrokerConfig {
    pub address: String,
    pub port: u16,
    pub client_id: String,
    pub keepalive_secs: u64,
    /// Subscription QoS, 0 to 2
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Resume polling after a connection error. Unset means no reconnect.
    pub reconnect_delay_ms: Option<u64>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            address: "broker.emqx.io".to_string(),
            port: 1883,
            client_id: "TopicViewSubscriber".to_string(),
            keepalive_secs: 60,
            qos: 0,
            username: None,
            password: None,
            reconnect_delay_ms: None,
        }
    }
}

impl BrokerConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn reconnect_delay(&self) -> Option<Duration> {
        self.reconnect_delay_ms.map(Duration::from_millis)
    }

    pub fn qos(&self) -> Option<QoS> {
        match self.qos {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// Credentials are only used when both parts are present.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pw)) => Some((user.clone(), pw.clone())),
            _ => None,
        }
    }

    pub fn url(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_mapping() {
        let mut config = BrokerConfig::default();
        assert_eq!(config.qos(), Some(QoS::AtMostOnce));
        config.qos = 2;
        assert_eq!(config.qos(), Some(QoS::ExactlyOnce));
        config.qos = 3;
        assert_eq!(config.qos(), None);
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let mut config = BrokerConfig {
            username: Some("bms".to_string()),
            ..Default::default()
        };
        assert_eq!(config.credentials(), None);

        config.password = Some("secret".to_string());
        assert_eq!(
            config.credentials(),
            Some(("bms".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_url() {
        assert_eq!(BrokerConfig::default().url(), "broker.emqx.io:1883");
    }
}
