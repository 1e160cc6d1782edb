//! Subcast - batch posting to Reddit communities
//!
//! This library provides the posting client, the paced batch runner and the
//! activity dashboard that reads the exported event log.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod poster;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use error::{ErrorKind, Result, SubcastError};
pub use poster::{export_events, import_events, PostingClient};
pub use service::{batch_post, BatchRunner, DelayRange};
pub use types::{Event, EventStatus, PostKind, PostRequest};
