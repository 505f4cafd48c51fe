//! Utility functions for image access and math
//!
//! - Grayscale conversion (RGB/RGBA to luminance) and channel planes
//! - Geometry (homogeneous transforms, rays)
//! - Pixel accessor used by the detector

/// Homogeneous transforms, vectors and rays
pub mod geometry;
/// Luminance conversion and channel planes
pub mod grayscale;
/// Multi-plane pixel accessor
pub mod image;
