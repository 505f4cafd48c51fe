//! Data Matrix region detection
//!
//! This module contains all the logic for locating a symbol in an image:
//! - Scan grid (coarse-to-fine probe locations)
//! - Edge flow and trail blazing along the finder pattern
//! - Hough line fitting of the finder and calibration edges
//! - Corner fit, transforms and symbol size determination

/// Per-pixel flag arena shared by all region attempts
pub mod flags;
/// Edge flow (compass convolution) and edge seeding
pub mod flow;
/// Best-line fit over recorded trails
pub mod hough;
/// Orientation, corner fit and size determination
pub mod region;
/// Coarse-to-fine probe locations
pub mod scan;
/// Trail blazing and navigation
pub mod trail;
