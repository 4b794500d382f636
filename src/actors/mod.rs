//! Background actors of the hub
//!
//! Each actor runs as an independent async task and is driven through a
//! cloneable handle:
//!
//! ```text
//!   ┌──────────────┐   RetentionCommand (mpsc)   ┌────────────────┐
//!   │ API / hub    │ ──────────────────────────► │ RetentionActor │
//!   │ (handle)     │ ◄────────────────────────── │  + interval    │
//!   └──────────────┘        reply (oneshot)      └───────┬────────┘
//!                                                        │ age-filtered deletes
//!                                                        ▼
//!                                                 StorageBackend
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels for synchronous queries
//!
//! The ingestion path never goes through an actor; readings are handled
//! directly by the request that carries them.

pub mod messages;
pub mod retention;
