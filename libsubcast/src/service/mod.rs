//! Service layer for Subcast
//!
//! Workflows built on top of the posting client that the binaries drive.
//!
//! - `batch`: ordered batch posting with randomized pacing
//!
//! # Example
//!
//! ```no_run
//! use libsubcast::poster::PostingClient;
//! use libsubcast::service::{batch_post, DelayRange};
//! use libsubcast::types::PostRequest;
//!
//! # async fn example(mut client: PostingClient) -> libsubcast::Result<()> {
//! let requests = vec![
//!     PostRequest::text("test", "Hello", "First post"),
//!     PostRequest::link("rust", "Worth a read", "https://example.com"),
//! ];
//!
//! let events = batch_post(&mut client, &requests, DelayRange::new(30, 120)?).await;
//! println!("Recorded {} events", events.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;

pub use batch::{batch_post, BatchRunner, DelayRange, Pause, RecordingPause, TokioPause};
