//! # MQTT Integration Module
//!
//! Connects to one broker, subscribes to the configured topics and feeds every
//! inbound publish into the relay queue.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker connection parameters and defaults
//! ├── message_manager.rs  - Publish callback, the producer side of the relay
//! └── mqtt_handler.rs     - Connection thread, subscriptions, status reporting
//! ```
//!
//! ## Threading
//!
//! rumqttc's blocking [`Connection`](rumqttc::Connection) iterator runs on its
//! own OS thread. Each publish is turned into a message and enqueued right
//! there; everything that touches the UI happens later on the dispatch side.
//! Connection state changes travel to the status bar over a `watch` channel.
//!
//! ## Failure Handling
//!
//! A refused or broken connection is logged and reported as
//! [`ConnectionState::Failed`](mqtt_handler::ConnectionState::Failed). The
//! thread then stops unless `reconnect_delay_ms` is configured, in which case
//! it waits and lets rumqttc reconnect on the next poll.

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;
