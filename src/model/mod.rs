//! Transient data flowing through a dispatch call: actions in, envelopes out,
//! canonical items in between.

pub mod action;
pub mod envelope;
pub mod item;

pub use action::*;
pub use envelope::*;
pub use item::*;
