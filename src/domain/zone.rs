use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Campus zone with its own telemetry stream.
///
/// This enumeration is the single source of truth for the zone set: the
/// simulator iterates it to produce rows, and every fitted per-zone model is
/// keyed by it. Variant order is the reporting order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Zone {
    #[serde(rename = "Hostel A - Floor 1")]
    #[strum(serialize = "Hostel A - Floor 1")]
    HostelAFloor1,
    #[serde(rename = "Hostel A - Floor 2")]
    #[strum(serialize = "Hostel A - Floor 2")]
    HostelAFloor2,
    #[serde(rename = "Hostel B - Floor 1")]
    #[strum(serialize = "Hostel B - Floor 1")]
    HostelBFloor1,
    #[serde(rename = "Lab - Electronics")]
    #[strum(serialize = "Lab - Electronics")]
    LabElectronics,
    #[serde(rename = "Lab - Computer Sci")]
    #[strum(serialize = "Lab - Computer Sci")]
    LabComputerSci,
    #[serde(rename = "Main Building")]
    #[strum(serialize = "Main Building")]
    MainBuilding,
    #[serde(rename = "Gym")]
    #[strum(serialize = "Gym")]
    Gym,
}

/// Usage category that decides the weekend modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// Hostels: occupancy rises at weekends
    Residential,
    /// Labs and the main building: mostly idle at weekends
    Academic,
    Athletic,
}

impl ZoneKind {
    /// Multiplier applied to simulated demand on Saturday and Sunday
    pub fn weekend_multiplier(&self) -> f64 {
        match self {
            ZoneKind::Residential => 1.15,
            ZoneKind::Academic => 0.35,
            ZoneKind::Athletic => 1.0,
        }
    }
}

/// Static demand profile of a zone, used only by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneProfile {
    /// Base hourly demand (kWh)
    pub base_kwh: f64,
    /// Demand at the centre of the peak window relative to base
    pub peak_multiplier: f64,
    /// First hour of the peak window (inclusive)
    pub peak_start: u32,
    /// Last hour of the peak window (inclusive)
    pub peak_end: u32,
    /// Noise standard deviation as a fraction of the current value
    pub noise: f64,
}

impl ZoneProfile {
    pub fn in_peak(&self, hour: u32) -> bool {
        (self.peak_start..=self.peak_end).contains(&hour)
    }

    pub fn peak_midpoint(&self) -> f64 {
        (self.peak_start + self.peak_end) as f64 / 2.0
    }

    /// Half the width of the peak window
    pub fn peak_spread(&self) -> f64 {
        (self.peak_end - self.peak_start) as f64 / 2.0
    }
}

impl Zone {
    /// Display name, e.g. `"Lab - Electronics"`
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn kind(self) -> ZoneKind {
        match self {
            Zone::HostelAFloor1 | Zone::HostelAFloor2 | Zone::HostelBFloor1 => {
                ZoneKind::Residential
            }
            Zone::LabElectronics | Zone::LabComputerSci | Zone::MainBuilding => {
                ZoneKind::Academic
            }
            Zone::Gym => ZoneKind::Athletic,
        }
    }

    pub fn profile(self) -> ZoneProfile {
        let (base_kwh, peak_multiplier, (peak_start, peak_end), noise) = match self {
            Zone::HostelAFloor1 => (5.5, 2.2, (18, 23), 0.15),
            Zone::HostelAFloor2 => (5.0, 2.0, (18, 23), 0.12),
            Zone::HostelBFloor1 => (6.0, 2.5, (18, 23), 0.18),
            Zone::LabElectronics => (8.0, 3.0, (9, 17), 0.10),
            Zone::LabComputerSci => (12.0, 2.8, (9, 21), 0.12),
            Zone::MainBuilding => (18.0, 2.0, (8, 18), 0.08),
            Zone::Gym => (4.0, 2.5, (6, 21), 0.20),
        };

        ZoneProfile {
            base_kwh,
            peak_multiplier,
            peak_start,
            peak_end,
            noise,
        }
    }

    /// Case-insensitive substring match against the display name
    pub fn matches(self, needle: &str) -> bool {
        self.name()
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}
