use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use rumqttc::{
    Client, ClientError, Connection, ConnectionError, Event, MqttOptions, Packet, QoS,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::BrokerConfig;
use super::message_manager::MessageRelay;

/// Capacity of the rumqttc request channel between client and event loop
const REQUEST_CAPACITY: usize = 100;
/// Granularity of the shutdown check while waiting to reconnect
const RECONNECT_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
    Reconnecting,
}

/// Connection status as shown in the status bar.
#[derive(Clone, Debug, Default)]
pub struct BrokerStatus {
    pub connection_state: ConnectionState,
    pub last_error: Option<String>,
    pub messages_received: u64,
    pub last_activity: Option<DateTime<Local>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Failed to spawn MQTT connection thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Failed to subscribe to {topic}: {source}")]
    Subscribe { topic: String, source: ClientError },

    #[error("Failed to request disconnect: {0}")]
    Disconnect(ClientError),
}

/// Owns the connection thread and the client used to stop it.
///
/// The thread runs rumqttc's blocking notification iterator. It is the only
/// producer for the relay queue in this program.
pub struct BrokerHandle {
    client: Client,
    thread: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl BrokerHandle {
    pub fn spawn(
        config: &BrokerConfig,
        topics: Vec<String>,
        relay: MessageRelay,
        status_tx: watch::Sender<BrokerStatus>,
        shutdown: CancellationToken,
    ) -> Result<Self, BrokerError> {
        let (client, connection) = Client::new(mqtt_options(config), REQUEST_CAPACITY);

        let worker = ConnectionWorker {
            client: client.clone(),
            topics,
            qos: config.qos().unwrap_or(QoS::AtMostOnce),
            reconnect_delay: config.reconnect_delay(),
            relay,
            status_tx,
            shutdown: shutdown.clone(),
        };

        info!("Attempting to connect to MQTT broker: {}", config.url());
        let thread = thread::Builder::new()
            .name("mqtt-connection".to_string())
            .spawn(move || worker.run(connection))?;

        Ok(Self {
            client,
            thread: Some(thread),
            shutdown,
        })
    }

    /// Cancels the connection loop and asks the broker to disconnect.
    ///
    /// Returns right away; the thread leaves after its current blocking read.
    pub fn stop(&self) -> Result<(), BrokerError> {
        info!("Disconnecting MQTT client...");
        self.shutdown.cancel();
        self.client.try_disconnect().map_err(BrokerError::Disconnect)
    }

    /// Waits for the connection thread to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("MQTT connection thread panicked");
            } else {
                debug!("MQTT connection thread joined");
            }
        }
    }
}

fn mqtt_options(config: &BrokerConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.address.clone(),
        config.port,
    );
    options.set_keep_alive(config.keepalive());
    if let Some((user, pw)) = config.credentials() {
        options.set_credentials(user, pw);
    }
    options
}

struct ConnectionWorker {
    client: Client,
    topics: Vec<String>,
    qos: QoS,
    reconnect_delay: Option<Duration>,
    relay: MessageRelay,
    status_tx: watch::Sender<BrokerStatus>,
    shutdown: CancellationToken,
}

impl ConnectionWorker {
    fn run(self, mut connection: Connection) {
        self.set_state(ConnectionState::Connecting);

        for notification in connection.iter() {
            if self.shutdown.is_cancelled() {
                break;
            }

            match notification {
                // rumqttc reports a refused CONNACK as an error, see below
                Ok(Event::Incoming(Packet::ConnAck(_))) => self.on_connected(),
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.relay.on_publish(&publish.topic, &publish.payload);
                    self.status_tx.send_modify(|status| {
                        status.messages_received += 1;
                        status.last_activity = Some(Local::now());
                    });
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!("Subscription acknowledged: {:?}", ack.return_codes);
                }
                Ok(event) => trace!("MQTT event: {:?}", event),
                Err(e) => {
                    if self.shutdown.is_cancelled() {
                        break;
                    }
                    self.on_connection_error(&e);

                    match self.reconnect_delay {
                        Some(delay) if self.wait_before_reconnect(delay) => {
                            self.set_state(ConnectionState::Reconnecting);
                        }
                        _ => break,
                    }
                }
            }
        }

        self.status_tx.send_modify(|status| {
            if status.connection_state != ConnectionState::Failed {
                status.connection_state = ConnectionState::Disconnected;
            }
        });
        info!("MQTT connection thread finished");
    }

    fn on_connected(&self) {
        info!("Connected to MQTT Broker!");
        self.set_state(ConnectionState::Connected);
        for topic in &self.topics {
            match self.subscribe(topic) {
                Ok(()) => info!("Subscribed to topic: {}", topic),
                Err(e) => warn!("{}", e),
            }
        }
    }

    fn on_connection_error(&self, e: &ConnectionError) {
        let message = match e {
            ConnectionError::ConnectionRefused(code) => {
                error!("Failed to connect, return code {:?}", code);
                format!("Connection refused: {:?}", code)
            }
            other => {
                error!("MQTT connection error: {}", other);
                other.to_string()
            }
        };
        self.status_tx.send_modify(|status| {
            status.connection_state = ConnectionState::Failed;
            status.last_error = Some(message);
        });
    }

    // try_ variant: this thread also drains the request channel, a blocking
    // send could wait on itself
    fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        self.client
            .try_subscribe(topic, self.qos)
            .map_err(|source| BrokerError::Subscribe {
                topic: topic.to_string(),
                source,
            })
    }

    /// Sleeps for `delay`, returning `false` early if shutdown was requested.
    fn wait_before_reconnect(&self, delay: Duration) -> bool {
        info!("Reconnecting in {:?}", delay);
        let deadline = Instant::now() + delay;
        loop {
            if self.shutdown.is_cancelled() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            thread::sleep(remaining.min(RECONNECT_POLL));
        }
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("MQTT connection state: {:?}", state);
        self.status_tx
            .send_modify(|status| status.connection_state = state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayQueue;
    use rumqttc::ConnectReturnCode;
    use std::sync::Arc;

    fn worker(shutdown: CancellationToken) -> (ConnectionWorker, watch::Receiver<BrokerStatus>) {
        let (client, _connection) = Client::new(mqtt_options(&BrokerConfig::default()), 10);
        let (status_tx, status_rx) = watch::channel(BrokerStatus::default());
        let worker = ConnectionWorker {
            client,
            topics: vec!["rj1".to_string()],
            qos: QoS::AtMostOnce,
            reconnect_delay: None,
            relay: MessageRelay::new(Arc::new(RelayQueue::new())),
            status_tx,
            shutdown,
        };
        (worker, status_rx)
    }

    #[test]
    fn test_connection_refused_marks_failed() {
        let (worker, status_rx) = worker(CancellationToken::new());
        worker.on_connection_error(&ConnectionError::ConnectionRefused(
            ConnectReturnCode::NotAuthorized,
        ));

        let status = status_rx.borrow();
        assert_eq!(status.connection_state, ConnectionState::Failed);
        assert_eq!(
            status.last_error.as_deref(),
            Some("Connection refused: NotAuthorized")
        );
    }

    #[test]
    fn test_other_connection_error_keeps_message() {
        let (worker, status_rx) = worker(CancellationToken::new());
        worker.on_connection_error(&ConnectionError::RequestsDone);

        let status = status_rx.borrow();
        assert_eq!(status.connection_state, ConnectionState::Failed);
        assert_eq!(
            status.last_error,
            Some(ConnectionError::RequestsDone.to_string())
        );
    }

    #[test]
    fn test_connack_marks_connected() {
        let (worker, status_rx) = worker(CancellationToken::new());
        worker.on_connected();
        assert_eq!(
            status_rx.borrow().connection_state,
            ConnectionState::Connected
        );
    }

    #[test]
    fn test_reconnect_wait_stops_on_shutdown() {
        let shutdown = CancellationToken::new();
        let (worker, _status_rx) = worker(shutdown.clone());

        assert!(worker.wait_before_reconnect(Duration::from_millis(10)));

        shutdown.cancel();
        let started = Instant::now();
        assert!(!worker.wait_before_reconnect(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_unreachable_broker_ends_thread() {
        let config = BrokerConfig {
            address: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let queue = Arc::new(RelayQueue::new());
        let (status_tx, status_rx) = watch::channel(BrokerStatus::default());

        let handle = BrokerHandle::spawn(
            &config,
            vec!["rj1".to_string()],
            MessageRelay::new(queue.clone()),
            status_tx,
            CancellationToken::new(),
        )
        .unwrap();
        handle.join();

        let status = status_rx.borrow();
        assert_eq!(status.connection_state, ConnectionState::Failed);
        assert!(status.last_error.is_some());
        assert!(queue.is_empty());
    }
}
