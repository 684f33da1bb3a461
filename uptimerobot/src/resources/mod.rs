//! Resource implementations

pub mod monitor;
pub mod psp;

pub use psp::PspResource;
