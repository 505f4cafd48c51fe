use std::sync::OnceLock;
use std::time::Duration;

use crate::models::SizeRequest;

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

static TIMEOUT_MS: OnceLock<u64> = OnceLock::new();

/// Default decode timeout in milliseconds, 0 meaning none
pub(crate) fn default_timeout_ms() -> u64 {
    *TIMEOUT_MS.get_or_init(|| parse_env_u64("DMTX_TIMEOUT_MS", 0))
}

static SCAN_GAP: OnceLock<usize> = OnceLock::new();

/// Default smallest scan-grid extent in pixels
pub(crate) fn default_scan_gap() -> usize {
    *SCAN_GAP.get_or_init(|| parse_env_usize("DMTX_SCAN_GAP", 1).max(1))
}

/// Tuning knobs for a decode run
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    /// Which symbol sizes to try during size determination
    pub size_request: SizeRequest,
    /// Smallest scan-grid extent; larger values probe fewer pixels
    pub scan_gap: usize,
    /// Largest tolerated deviation of a corner from 90 degrees
    pub square_deviation_degrees: f64,
    /// Edge strength gate on a 0-100 scale
    pub edge_threshold: u32,
    /// Expected minimum finder edge length in pixels
    pub edge_min: Option<usize>,
    /// Expected maximum finder edge length in pixels
    pub edge_max: Option<usize>,
    /// Wall-clock limit checked between scan probes
    pub timeout: Option<Duration>,
    /// Byte emitted for FNC1 in ASCII mode (dropped when `None`)
    pub fnc1: Option<u8>,
    /// Upper bound on symbols returned by `decode_all`
    pub max_symbols: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        let timeout_ms = default_timeout_ms();
        Self {
            size_request: SizeRequest::ShapeAuto,
            scan_gap: default_scan_gap(),
            square_deviation_degrees: 50.0,
            edge_threshold: 10,
            edge_min: None,
            edge_max: None,
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            fnc1: None,
            max_symbols: 16,
        }
    }
}

impl DecodeOptions {
    /// Restrict size determination to `size_request`
    pub fn with_size_request(mut self, size_request: SizeRequest) -> Self {
        self.size_request = size_request;
        self
    }

    /// Set the smallest scan-grid extent (at least 1)
    pub fn with_scan_gap(mut self, scan_gap: usize) -> Self {
        self.scan_gap = scan_gap.max(1);
        self
    }

    /// Set the largest tolerated corner deviation from 90 degrees
    pub fn with_square_deviation(mut self, degrees: f64) -> Self {
        self.square_deviation_degrees = degrees;
        self
    }

    /// Set the edge strength gate, clamped to 100
    pub fn with_edge_threshold(mut self, threshold: u32) -> Self {
        self.edge_threshold = threshold.min(100);
        self
    }

    /// Set the expected finder edge length range
    pub fn with_edge_limits(mut self, edge_min: Option<usize>, edge_max: Option<usize>) -> Self {
        self.edge_min = edge_min;
        self.edge_max = edge_max;
        self
    }

    /// Set the wall-clock limit (`None` searches the whole grid)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Byte substituted for FNC1 codewords in ASCII mode
    pub fn with_fnc1(mut self, fnc1: Option<u8>) -> Self {
        self.fnc1 = fnc1;
        self
    }

    /// Cap the number of symbols `decode_all` returns
    pub fn with_max_symbols(mut self, max_symbols: usize) -> Self {
        self.max_symbols = max_symbols;
        self
    }

    /// Cosine threshold every fitted corner must exceed
    pub(crate) fn square_deviation_cos(&self) -> f64 {
        self.square_deviation_degrees.to_radians().cos()
    }

    /// Minimum flow magnitude for a scan probe to seed a trail
    pub(crate) fn edge_gate(&self) -> i32 {
        (self.edge_threshold as f64 * 7.65 + 0.5) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = DecodeOptions::default();
        assert_eq!(opts.size_request, SizeRequest::ShapeAuto);
        assert_eq!(opts.edge_gate(), 77);
        assert!((opts.square_deviation_cos() - 50f64.to_radians().cos()).abs() < 1e-12);
        assert!(opts.scan_gap >= 1);
    }

    #[test]
    fn test_builders() {
        let opts = DecodeOptions::default()
            .with_scan_gap(0)
            .with_edge_threshold(250)
            .with_fnc1(Some(0x1d));
        assert_eq!(opts.scan_gap, 1);
        assert_eq!(opts.edge_threshold, 100);
        assert_eq!(opts.fnc1, Some(0x1d));
    }
}
