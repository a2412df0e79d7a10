#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Session resolution and message exchange for a trip-planning conversation.
//!
//! # Key Features
//! - Attach to a supplied session, resume the latest open one, or create one
//! - Run-once guard against duplicate resolution
//! - Optimistic user turns with append-only failure reporting
//! - Booking-finalized signals extracted from tool results

mod coordinator;
mod events;
mod guard;
mod manager;
mod resolver;
mod session;

pub use coordinator::{SendCoordinator, SendOutcome};
pub use events::{ConversationEvent, FINALIZE_BOOKING, finalized_bookings};
pub use guard::{InitGuard, InitState, InitTicket};
pub use manager::{ConversationConfig, ConversationError, ConversationManager};
pub use resolver::{Resolution, SessionResolver, most_recent_open};
