use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contact counts above the larger family's ceiling mean the count byte was misread.
pub const TMA1036_MAX_TOUCHES: usize = 14;
pub const TMA4XX_MAX_TOUCHES: usize = 10;
pub const ABSOLUTE_MAX_TOUCHES: usize = if TMA1036_MAX_TOUCHES > TMA4XX_MAX_TOUCHES {
    TMA1036_MAX_TOUCHES
} else {
    TMA4XX_MAX_TOUCHES
};

/// Records longer than this carry major/minor/orientation.
pub const BASELINE_RECORD_SIZE: usize = 6;

/// Screen area left for the panel when virtual keys share the sensor.
pub const VKEYS_X: u32 = 720;
pub const VKEYS_Y: u32 = 1280;

/// Where one logical field lives inside a contact record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisField {
    pub ofs: usize,
    pub size: usize,
    pub bofs: u8,
    pub max: u32,
}

impl AxisField {
    pub const fn new(ofs: usize, size: usize, bofs: u8, max: u32) -> Self {
        Self {
            ofs,
            size,
            bofs,
            max,
        }
    }

    /// Field not present in this record layout.
    pub const fn absent() -> Self {
        Self::new(0, 0, 0, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub x: AxisField,
    pub y: AxisField,
    pub pressure: AxisField,
    pub track_id: AxisField,
    pub event: AxisField,
    pub object: AxisField,
    pub major: AxisField,
    pub minor: AxisField,
    pub orientation: AxisField,
}

/// System information block: header offsets and record geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysInfo {
    pub rep_ofs: usize,
    pub tt_stat_ofs: usize,
    pub record_size: usize,
    pub max_touches: usize,
    pub max_x: u32,
    pub max_y: u32,
    pub max_p: u32,
    pub fields: FieldLayout,
}

impl SysInfo {
    pub fn has_extended_fields(&self) -> bool {
        self.record_size > BASELINE_RECORD_SIZE
    }

    /// First byte after the touch status register.
    pub fn records_ofs(&self) -> usize {
        self.tt_stat_ofs + 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orientation {
    pub flip: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    pub report_on_large_area: bool,
    pub use_virtual_keys: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackIdRange {
    pub min: u32,
    pub max: u32,
}

impl TrackIdRange {
    pub fn contains(&self, id: u32) -> bool {
        id >= self.min && id <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub sysinfo: SysInfo,
    pub orientation: Orientation,
    pub track_ids: TrackIdRange,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::tma4xx()
    }
}

impl DeviceConfig {
    /// Gen4 TMA4xx: 10-byte records with size and orientation.
    pub fn tma4xx() -> Self {
        Self {
            sysinfo: SysInfo {
                rep_ofs: 2,
                tt_stat_ofs: 4,
                record_size: 10,
                max_touches: TMA4XX_MAX_TOUCHES,
                max_x: 720,
                max_y: 1280,
                max_p: 255,
                fields: FieldLayout {
                    object: AxisField::new(0, 1, 0, 0x08),
                    x: AxisField::new(1, 2, 0, 0x1_0000),
                    y: AxisField::new(3, 2, 0, 0x1_0000),
                    pressure: AxisField::new(5, 1, 0, 0x100),
                    track_id: AxisField::new(6, 1, 0, 0x20),
                    event: AxisField::new(6, 1, 5, 0x04),
                    major: AxisField::new(7, 1, 0, 0x100),
                    minor: AxisField::new(8, 1, 0, 0x100),
                    orientation: AxisField::new(9, 1, 0, 0x100),
                },
            },
            orientation: Orientation::default(),
            track_ids: TrackIdRange { min: 0, max: 14 },
        }
    }

    /// TMA1036: 6-byte records, object type packed above the 12-bit X.
    pub fn tma1036() -> Self {
        Self {
            sysinfo: SysInfo {
                rep_ofs: 2,
                tt_stat_ofs: 4,
                record_size: BASELINE_RECORD_SIZE,
                max_touches: TMA1036_MAX_TOUCHES,
                max_x: 1024,
                max_y: 600,
                max_p: 255,
                fields: FieldLayout {
                    x: AxisField::new(0, 2, 0, 0x1000),
                    object: AxisField::new(0, 1, 6, 0x04),
                    y: AxisField::new(2, 2, 0, 0x1000),
                    pressure: AxisField::new(4, 1, 0, 0x100),
                    track_id: AxisField::new(5, 1, 0, 0x20),
                    event: AxisField::new(5, 1, 5, 0x04),
                    major: AxisField::absent(),
                    minor: AxisField::absent(),
                    orientation: AxisField::absent(),
                },
            },
            orientation: Orientation::default(),
            track_ids: TrackIdRange { min: 0, max: 14 },
        }
    }

    /// Layer a TOML file and `GLOVEFILTER_*` variables over `base`.
    pub fn from_file(base: &DeviceConfig, path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(base)?)
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("GLOVEFILTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Inclusive (max_x, max_y) advertised to the sink after flip.
    pub fn axis_ranges(&self) -> (u32, u32) {
        let (max_x, max_y) = if self.orientation.use_virtual_keys {
            (VKEYS_X, VKEYS_Y)
        } else {
            (self.sysinfo.max_x, self.sysinfo.max_y)
        };
        if self.orientation.flip {
            (max_y.saturating_sub(1), max_x.saturating_sub(1))
        } else {
            (max_x.saturating_sub(1), max_y.saturating_sub(1))
        }
    }

    /// Number of zero-based reporting slots.
    pub fn slot_count(&self) -> usize {
        self.track_ids.max.saturating_sub(self.track_ids.min) as usize + 1
    }
}
