//! Chat integration for tavern.
//!
//! - **Events** (`events`) - envelopes from the transport and the handler dispatcher
//! - **Commands** (`commands`) - `!`-prefixed message parsing and routing
//! - **Handlers** (`handlers`) - the store-backed command service
//! - **Replies** (`replies`) - plain-text reply rendering
//! - **Socket** (`socket`) - transport traits and the reconnecting event loop
//! - **Scheduler** (`scheduler`) - the periodic quote broadcast
//!
//! # Architecture
//!
//! ```text
//! ChatTransport → ChatRunner → EventDispatcher → CommandRouter → StoreCommandService
//!                     ↑                │                                  │
//!                 reply text ←─────────┘                          CollectionStore
//!                                     Ready ──watch──→ QuoteBroadcaster ──┘
//! ```

pub mod commands;
pub mod events;
pub mod handlers;
pub mod replies;
pub mod scheduler;
pub mod socket;
