//! Receiver configuration record.
//!
//! An immutable value constructed once at startup (from CLI flags, see
//! `scm-receiver`) and passed by reference into the receiver loop and its
//! components. No process-wide mutable configuration state exists.

/// Sample block size in complex samples (`B`).
pub const BLOCK_LEN: usize = 16384;

/// DFT size used by the preamble detector (`N_pre`).
pub const PREAMBLE_FFT_LEN: usize = 20480;

/// Sample rate the tuner is configured for, in Hz.
pub const SAMPLE_RATE: u32 = 2_048_000;

/// Default tuner center frequency, in Hz (900 MHz ISM band SCM channel).
pub const DEFAULT_CENTER_FREQ: u32 = 920_299_072;

/// Default tuner server endpoint.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:1234";

/// Samples per Manchester half-symbol (`SampleRate / DataRate`).
///
/// Deliberately non-integer (`2_048_000 / 32_768 = 62.5`); every index
/// derived from it must be computed in floating point and rounded with
/// `round_half_up` to bound cumulative drift across a packet.
pub const SYMBOL_LENGTH: f64 = 62.5;

/// Number of Manchester symbols in one SCM frame (96 bit decisions).
pub const FRAME_SYMBOLS: usize = 96;

/// Total samples spanned by one packet body, from preamble start to the
/// end of the frame: `FRAME_SYMBOLS * 2 * SYMBOL_LENGTH`.
pub const PACKET_LENGTH: f64 = FRAME_SYMBOLS as f64 * 2.0 * SYMBOL_LENGTH;

/// The fixed 21-bit preamble pattern prefixing every SCM frame.
pub const PREAMBLE_BITS: [u8; 21] = [
    1, 1, 1, 1, 1, 0, 0, 1, 0, 1, 0, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0,
];

/// Receiver runtime configuration, immutable after construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tuner server `host:port`.
    pub server_addr: String,
    /// Tuner center frequency, in Hz.
    pub center_freq: u32,
    /// Wall-clock run duration; `None` means unbounded.
    pub duration: Option<std::time::Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            center_freq: DEFAULT_CENTER_FREQ,
            duration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_addr, DEFAULT_SERVER_ADDR);
        assert_eq!(config.center_freq, DEFAULT_CENTER_FREQ);
        assert!(config.duration.is_none());
    }

    #[test]
    fn test_symbol_length_invariant() {
        assert_eq!(SAMPLE_RATE as f64 / SYMBOL_LENGTH, 32_768.0);
        assert!(PREAMBLE_FFT_LEN >= BLOCK_LEN);
    }
}
