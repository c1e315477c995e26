//! Leather-cover toggle.
//!
//! Writing `0` tells the driver a cover lies on the panel: hover contacts are
//! then dropped before classification, and the touch threshold is raised when
//! the controller runs a plain finger scan. Any other value removes the cover.

use crate::error::{Error, Result};
use crate::transport::{DeviceControl, Param};
use std::time::Duration;

pub const EXCLUSIVE_TIMEOUT: Duration = Duration::from_millis(200);

/// Scan type value for finger-only scanning.
const SCAN_TYPE_FINGER: u32 = 0;
pub const COVERED_THRESHOLD: u32 = 600;
pub const DEFAULT_THRESHOLD: u32 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverToggle {
    covered: bool,
    threshold_raised: bool,
}

impl CoverToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_covered(&self) -> bool {
        self.covered
    }

    pub fn threshold_raised(&self) -> bool {
        self.threshold_raised
    }

    pub fn show(&self) -> String {
        let value = if self.covered { "0" } else { "1" };
        value.to_string()
    }

    /// Apply a written value and return the number of bytes consumed.
    ///
    /// Exclusive access is always released once acquired; a release failure
    /// replaces any earlier error.
    pub fn store<C: DeviceControl + ?Sized>(&mut self, ctl: &mut C, text: &str) -> Result<usize> {
        ctl.request_exclusive(EXCLUSIVE_TIMEOUT)
            .map_err(Error::Exclusive)?;

        let applied = self.apply(ctl, text);

        if let Err(e) = ctl.release_exclusive() {
            tracing::error!("fail to release exclusive: {}", e);
            return Err(Error::Exclusive(e));
        }
        applied.map(|()| text.len())
    }

    fn apply<C: DeviceControl + ?Sized>(&mut self, ctl: &mut C, text: &str) -> Result<()> {
        let value: u64 = text
            .trim()
            .parse()
            .map_err(|_| Error::InvalidValue(text.to_string()))?;

        if value == 0 {
            self.covered = true;
            let scan_type = ctl.get_param(Param::ScanType).map_err(|source| Error::Param {
                param: Param::ScanType.name(),
                source,
            })?;
            if scan_type == SCAN_TYPE_FINGER {
                set_threshold(ctl, COVERED_THRESHOLD)?;
                self.threshold_raised = true;
            }
        } else {
            self.covered = false;
            if self.threshold_raised {
                set_threshold(ctl, DEFAULT_THRESHOLD)?;
                self.threshold_raised = false;
            }
        }
        tracing::debug!(covered = self.covered, raised = self.threshold_raised, "cover toggled");
        Ok(())
    }
}

fn set_threshold<C: DeviceControl + ?Sized>(ctl: &mut C, value: u32) -> Result<()> {
    ctl.set_param(Param::Threshold, value)
        .map_err(|source| Error::Param {
            param: Param::Threshold.name(),
            source,
        })
}
