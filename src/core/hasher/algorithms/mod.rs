//! Fingerprint algorithm implementations.

mod average;
mod difference;
mod multires;

pub use average::AverageHasher;
pub use difference::DifferenceHasher;
pub use multires::{MultiresHasher, MultiresSignature};
