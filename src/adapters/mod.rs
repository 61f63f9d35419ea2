//! Adapter implementations of the port traits.
//!
//! `live` talks to the real world, `recording` wraps a live adapter and
//! captures every call into a cassette, `replaying` serves calls back from a
//! cassette.

pub mod live;
pub mod recording;
pub mod replaying;
