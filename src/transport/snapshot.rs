use super::{DeviceControl, Mode, Param, Transport, TransportError};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_SCAN_TYPE: u32 = 0;
const DEFAULT_THRESHOLD: u32 = 200;

/// In-memory controller: serves operational-mode reads from the last loaded
/// register snapshot and keeps a parameter table for the command path.
#[derive(Debug, Clone)]
pub struct SnapshotTransport {
    snapshot: Option<Vec<u8>>,
    params: HashMap<Param, u32>,
    exclusive: bool,
    /// When set, `request_exclusive` fails with a timeout.
    pub busy: bool,
}

impl Default for SnapshotTransport {
    fn default() -> Self {
        let mut params = HashMap::new();
        params.insert(Param::ScanType, DEFAULT_SCAN_TYPE);
        params.insert(Param::Threshold, DEFAULT_THRESHOLD);
        Self {
            snapshot: None,
            params,
            exclusive: false,
            busy: false,
        }
    }
}

impl SnapshotTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, registers: Vec<u8>) {
        self.snapshot = Some(registers);
    }

    pub fn param(&self, param: Param) -> Option<u32> {
        self.params.get(&param).copied()
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }
}

impl Transport for SnapshotTransport {
    fn read(&mut self, mode: Mode, offset: usize, len: usize) -> Result<Vec<u8>, TransportError> {
        let data = self.snapshot.as_ref().ok_or(TransportError::NoData)?;
        let end = offset + len;
        if end > data.len() {
            return Err(TransportError::ShortRead {
                mode,
                offset,
                len,
                available: data.len().saturating_sub(offset),
            });
        }
        Ok(data[offset..end].to_vec())
    }
}

impl DeviceControl for SnapshotTransport {
    fn request_exclusive(&mut self, timeout: Duration) -> Result<(), TransportError> {
        if self.busy {
            return Err(TransportError::Timeout(timeout));
        }
        self.exclusive = true;
        Ok(())
    }

    fn release_exclusive(&mut self) -> Result<(), TransportError> {
        self.exclusive = false;
        Ok(())
    }

    fn get_param(&mut self, param: Param) -> Result<u32, TransportError> {
        self.params
            .get(&param)
            .copied()
            .ok_or(TransportError::Unsupported(param))
    }

    fn set_param(&mut self, param: Param, value: u32) -> Result<(), TransportError> {
        self.params.insert(param, value);
        Ok(())
    }
}
