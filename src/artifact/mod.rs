//! Archive production for function code packages.
//!
//! - [`zip`] - deterministic single-entry zip writing (temp path + rename)
//! - [`digest`] - sha256 digests of produced archives

pub mod digest;
pub mod zip;
