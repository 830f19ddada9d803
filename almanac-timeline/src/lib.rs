//! # almanac-timeline
//!
//! Client-side pagination for the diary timeline: the first page arrives
//! server-rendered, further pages are pulled from the pagination API as the
//! reader scrolls or asks for more.

pub mod controller;
pub mod fetch;
pub mod scroll;

pub use controller::{ControllerState, LoadOutcome, TimelineController};
pub use fetch::{FetchError, HttpPageFetcher, PageFetcher};
pub use scroll::{ScrollMetrics, TimelineOptions};
