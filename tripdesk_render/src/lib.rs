#![deny(
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

//! Display-side rendering of conversation content.
//!
//! Both entry points are total: any input, however malformed, produces a
//! renderable value. They run on the display path, where a failure would
//! blank the whole conversation.

pub mod markup;
pub mod tool_result;

pub use markup::{DetailLine, DisplayBlock, Span, render_markup, split_bold};
pub use tool_result::{
    FlightSummary, HotelSummary, MAX_LISTED, RenderedResult, ToolKind, format_tool_result,
};
