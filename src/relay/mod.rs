//! # Message Relay
//!
//! Moves broker messages from the connection thread to the presentation
//! thread without ever blocking the connection thread.
//!
//! ```text
//! relay/
//! ├── message.rs   - immutable message record and its display format
//! ├── queue.rs     - thread-safe FIFO, many producers, one consumer
//! ├── registry.rs  - topic to sink lookup, built once at startup
//! ├── sink.rs      - sink trait and the headless log sink
//! └── dispatch.rs  - drain-and-route pass and its fixed-period schedule
//! ```
//!
//! ```text
//! MQTT thread ──► RelayQueue ──► Dispatcher ──► TopicRegistry ──► sink per topic
//!  (producer)     (Arc, Mutex)   (UI thread)
//! ```
//!
//! Order is kept per producer. Messages from different producers may
//! interleave in any order, like their arrival from the broker.

pub mod dispatch;
pub mod message;
pub mod queue;
pub mod registry;
pub mod sink;

pub use dispatch::{DispatchReport, DispatchSchedule, Dispatcher};
pub use message::Message;
pub use queue::{QueuePolicy, RelayQueue};
pub use registry::TopicRegistry;
pub use sink::{LogSink, SinkError, TopicSink};
