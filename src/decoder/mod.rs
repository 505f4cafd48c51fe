//! Data Matrix decoding modules
//!
//! This module contains all the logic for turning a fitted region into text:
//! - Module sampling (jump tally over each data region)
//! - ECC200 module placement
//! - Reed-Solomon error correction
//! - Encodation scheme decoding (ASCII, C40, Text, X12, EDIFACT, Base256)

/// Encodation scheme decoder (codewords to bytes)
pub mod encodation;
/// Per-symbol buffers and the decode pipeline
pub mod message;
/// Module sampling into the mapping matrix
pub mod modules;
/// ECC200 module placement
pub mod placement;
/// Reed-Solomon error correction
pub mod reed_solomon;
