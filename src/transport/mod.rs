pub mod capture;
pub mod snapshot;

use std::time::Duration;
use thiserror::Error;

/// Register map a read is addressed to. Touch reports live in the
/// operational map; the sysinfo and config maps are never read here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Operational,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Operational => write!(f, "operational"),
        }
    }
}

/// Runtime parameters exposed through the controller's command interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    ScanType,
    Threshold,
}

impl Param {
    pub fn name(self) -> &'static str {
        match self {
            Param::ScanType => "scan_type",
            Param::Threshold => "threshold",
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("short read: {mode} offset={offset} len={len} available={available}")]
    ShortRead {
        mode: Mode,
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("no register snapshot loaded")]
    NoData,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("parameter {0:?} not supported")]
    Unsupported(Param),
}

/// Byte access to the controller's register map.
pub trait Transport {
    fn read(&mut self, mode: Mode, offset: usize, len: usize) -> Result<Vec<u8>, TransportError>;
}

/// Command path used by the configuration side (never by the decode path).
pub trait DeviceControl {
    fn request_exclusive(&mut self, timeout: Duration) -> Result<(), TransportError>;
    fn release_exclusive(&mut self) -> Result<(), TransportError>;
    fn get_param(&mut self, param: Param) -> Result<u32, TransportError>;
    fn set_param(&mut self, param: Param, value: u32) -> Result<(), TransportError>;
}
