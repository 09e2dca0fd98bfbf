//! Types shared with the protocol and rendering layers.

pub mod geometry;
