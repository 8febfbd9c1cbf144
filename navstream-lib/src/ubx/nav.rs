use serde::{Deserialize, Serialize};

use super::{le_i32, le_u16, le_u32};

/// Quality of a navigation solution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixType {
    NoFix,
    DeadReckoning,
    Fix2D,
    Fix3D,
    GnssDeadReckoning,
    TimeOnly,
    Other(u8),
}

impl From<u8> for FixType {
    fn from(value: u8) -> Self {
        match value {
            0 => FixType::NoFix,
            1 => FixType::DeadReckoning,
            2 => FixType::Fix2D,
            3 => FixType::Fix3D,
            4 => FixType::GnssDeadReckoning,
            5 => FixType::TimeOnly,
            x => FixType::Other(x),
        }
    }
}

fn degrees(raw: i32, divisor: f64) -> f64 {
    f64::from(raw) / divisor
}

fn metres(raw_mm: i32) -> f64 {
    f64::from(raw_mm) / 1e3
}

/// Position, velocity and time solution (NAV-PVT).
///
/// All values are kept as received; use the accessor methods for scaled values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NavPvt {
    /// GPS time of week (ms)
    pub itow: u32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    /// Validity flags
    pub valid: u8,
    /// Time accuracy estimate (ns)
    pub t_acc: u32,
    /// Fraction of second (ns)
    pub nano: i32,
    pub fix_type: u8,
    pub flags: u8,
    pub flags2: u8,
    pub num_sv: u8,
    /// Longitude (1e-7 deg)
    pub lon: i32,
    /// Latitude (1e-7 deg)
    pub lat: i32,
    /// Height above ellipsoid (mm)
    pub height: i32,
    /// Height above mean sea level (mm)
    pub h_msl: i32,
    /// Horizontal accuracy (mm)
    pub h_acc: u32,
    /// Vertical accuracy (mm)
    pub v_acc: u32,
    /// NED north velocity (mm/s)
    pub vel_n: i32,
    /// NED east velocity (mm/s)
    pub vel_e: i32,
    /// NED down velocity (mm/s)
    pub vel_d: i32,
    /// Ground speed (mm/s)
    pub g_speed: i32,
    /// Heading of motion (1e-5 deg)
    pub heading: i32,
    /// Speed accuracy (mm/s)
    pub s_acc: u32,
    /// Heading accuracy (1e-5 deg)
    pub head_acc: u32,
    /// Position DOP (0.01)
    pub p_dop: u16,
    pub flags3: u8,
    pub reserved: [u8; 5],
}

impl NavPvt {
    pub const LEN: usize = 84;

    /// Decode from payload bytes. Returns `None` if there are fewer than
    /// [NavPvt::LEN] bytes. Any bytes beyond that are ignored.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        Some(NavPvt {
            itow: le_u32(dat, 0),
            year: le_u16(dat, 4),
            month: dat[6],
            day: dat[7],
            hour: dat[8],
            min: dat[9],
            sec: dat[10],
            valid: dat[11],
            t_acc: le_u32(dat, 12),
            nano: le_i32(dat, 16),
            fix_type: dat[20],
            flags: dat[21],
            flags2: dat[22],
            num_sv: dat[23],
            lon: le_i32(dat, 24),
            lat: le_i32(dat, 28),
            height: le_i32(dat, 32),
            h_msl: le_i32(dat, 36),
            h_acc: le_u32(dat, 40),
            v_acc: le_u32(dat, 44),
            vel_n: le_i32(dat, 48),
            vel_e: le_i32(dat, 52),
            vel_d: le_i32(dat, 56),
            g_speed: le_i32(dat, 60),
            heading: le_i32(dat, 64),
            s_acc: le_u32(dat, 68),
            head_acc: le_u32(dat, 72),
            p_dop: le_u16(dat, 76),
            flags3: dat[78],
            reserved: [dat[79], dat[80], dat[81], dat[82], dat[83]],
        })
    }

    #[must_use]
    pub fn fix(&self) -> FixType {
        FixType::from(self.fix_type)
    }

    /// True when the receiver reports a valid fix (`gnssFixOK`).
    #[must_use]
    pub fn fix_ok(&self) -> bool {
        self.flags & 0x01 == 0x01
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        degrees(self.lat, 1e7)
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        degrees(self.lon, 1e7)
    }

    #[must_use]
    pub fn height_m(&self) -> f64 {
        metres(self.height)
    }

    #[must_use]
    pub fn h_msl_m(&self) -> f64 {
        metres(self.h_msl)
    }

    #[must_use]
    pub fn h_acc_m(&self) -> f64 {
        f64::from(self.h_acc) / 1e3
    }

    #[must_use]
    pub fn v_acc_m(&self) -> f64 {
        f64::from(self.v_acc) / 1e3
    }

    #[must_use]
    pub fn ground_speed_mps(&self) -> f64 {
        metres(self.g_speed)
    }

    #[must_use]
    pub fn heading_deg(&self) -> f64 {
        degrees(self.heading, 1e5)
    }

    #[must_use]
    pub fn pdop(&self) -> f64 {
        f64::from(self.p_dop) / 100.0
    }
}

/// Receiver navigation status (NAV-STATUS).
///
/// Only the leading fields are decoded; time to first fix and time since startup
/// are not.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NavStatus {
    /// GPS time of week (ms)
    pub itow: u32,
    pub fix_type: u8,
    pub flags: u8,
    pub fix_stat: u8,
    pub flags2: u8,
}

impl NavStatus {
    pub const LEN: usize = 16;

    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        Some(NavStatus {
            itow: le_u32(dat, 0),
            fix_type: dat[4],
            flags: dat[5],
            fix_stat: dat[6],
            flags2: dat[7],
        })
    }

    #[must_use]
    pub fn fix(&self) -> FixType {
        FixType::from(self.fix_type)
    }
}

/// Geodetic position solution (NAV-POSLLH).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NavPosllh {
    /// GPS time of week (ms)
    pub itow: u32,
    /// Longitude (1e-7 deg)
    pub lon: i32,
    /// Latitude (1e-7 deg)
    pub lat: i32,
    /// Height above ellipsoid (mm)
    pub height: i32,
    /// Height above mean sea level (mm)
    pub h_msl: i32,
    /// Horizontal accuracy (mm)
    pub h_acc: u32,
    /// Vertical accuracy (mm)
    pub v_acc: u32,
}

impl NavPosllh {
    pub const LEN: usize = 28;

    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        Some(NavPosllh {
            itow: le_u32(dat, 0),
            lon: le_i32(dat, 4),
            lat: le_i32(dat, 8),
            height: le_i32(dat, 12),
            h_msl: le_i32(dat, 16),
            h_acc: le_u32(dat, 20),
            v_acc: le_u32(dat, 24),
        })
    }

    /// Encode into the 28 byte payload layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut dat = Vec::with_capacity(Self::LEN);
        dat.extend_from_slice(&self.itow.to_le_bytes());
        dat.extend_from_slice(&self.lon.to_le_bytes());
        dat.extend_from_slice(&self.lat.to_le_bytes());
        dat.extend_from_slice(&self.height.to_le_bytes());
        dat.extend_from_slice(&self.h_msl.to_le_bytes());
        dat.extend_from_slice(&self.h_acc.to_le_bytes());
        dat.extend_from_slice(&self.v_acc.to_le_bytes());
        dat
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        degrees(self.lat, 1e7)
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        degrees(self.lon, 1e7)
    }

    #[must_use]
    pub fn height_m(&self) -> f64 {
        metres(self.height)
    }

    #[must_use]
    pub fn h_msl_m(&self) -> f64 {
        metres(self.h_msl)
    }

    #[must_use]
    pub fn h_acc_m(&self) -> f64 {
        f64::from(self.h_acc) / 1e3
    }

    #[must_use]
    pub fn v_acc_m(&self) -> f64 {
        f64::from(self.v_acc) / 1e3
    }
}
