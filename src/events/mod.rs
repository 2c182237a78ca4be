//! # Events Module
//!
//! Event-driven progress reporting, shared by the CLI and any embedding UI.
//!
//! ## Design
//! The core library emits events through channels, allowing any UI
//! (CLI, GUI, web) to subscribe and display progress. The decision log in
//! `ReconcileReport` stays the authoritative output; events are advisory.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Reconcile(ReconcileEvent::Matched { candidate, incumbent }) = event {
//!             println!("{} matches {}", candidate.display(), incumbent.display());
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
