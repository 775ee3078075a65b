use thiserror::Error;

/// Failures from [`crate::codec::decode`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid packet length: {0} bytes (expected {})", crate::codec::PACKET_SIZE)]
    InvalidLength(usize),
    #[error("invalid flags byte: {0:#04x}")]
    InvalidFlags(u8),
}

/// Failures from a single request/reply exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("no reply received within the deadline")]
    Timeout,
    #[error("reply sequence mismatch, no matching reply within the deadline")]
    Mismatch,
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup configuration errors. Fatal per the error taxonomy: no implicit clamping.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
