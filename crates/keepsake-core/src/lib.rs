//! Keepsake core
//!
//! Everything here is free of I/O: the allow-list gate, the daily picker,
//! markup rendering and the per-connection view state. The server crates feed
//! it snapshots and ship whatever it renders.

pub mod clock;
pub mod escape;
pub mod gate;
pub mod picker;
pub mod render;
pub mod session;
