//! Mapping from announced feature names to metric families.

/// The set of device features this exporter understands.
///
/// Feature names arriving on the bus are free-form strings; everything is
/// canonicalized to lower case and mapped into this closed enumeration.
/// Names that map to [`SensorKind::Ignored`] are never registered and never
/// subscribed, which makes the filter list authoritative and testable in
/// isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Temperature,
    RelativeHumidity,
    ContactState,
    CurrentPower,
    PowerProduced,
    EnergyUsed,
    EnergyProduced,
    BatteryLevel,
    FilterChange,
    Voltage,
    Ampere,
    /// Per-phase voltage, phase index 1..=3.
    PhaseVoltage(u8),
    /// Per-phase current draw, phase index 1..=3.
    PhaseAmpere(u8),
    Precipitation,
    AirPressure,
    WindSpeed,
    WindDirection,
    GlobalRadiation,
    Pm25,
    AirQuality,
    WaterLevel,
    /// Any feature name the exporter does not understand.
    Ignored,
}

/// Electrical phase indices carried by the per-phase power features.
pub const PHASES: [u8; 3] = [1, 2, 3];

impl SensorKind {
    /// Map an announced feature name to its kind.
    ///
    /// Matching is case-insensitive; unknown names map to `Ignored` rather
    /// than falling through silently.
    pub fn from_feature(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "currenttemperature" => SensorKind::Temperature,
            "currentrelativehumidity" => SensorKind::RelativeHumidity,
            "contactsensorstate" => SensorKind::ContactState,
            "currentpower" => SensorKind::CurrentPower,
            "currentpowerproduced" => SensorKind::PowerProduced,
            "energyused" => SensorKind::EnergyUsed,
            "energyproduced" => SensorKind::EnergyProduced,
            "batterylevel" => SensorKind::BatteryLevel,
            "filterchangeindication" => SensorKind::FilterChange,
            "currentvoltage" => SensorKind::Voltage,
            "currentampere" => SensorKind::Ampere,
            "phase1voltage" => SensorKind::PhaseVoltage(1),
            "phase2voltage" => SensorKind::PhaseVoltage(2),
            "phase3voltage" => SensorKind::PhaseVoltage(3),
            "phase1current" => SensorKind::PhaseAmpere(1),
            "phase2current" => SensorKind::PhaseAmpere(2),
            "phase3current" => SensorKind::PhaseAmpere(3),
            "precipitation" => SensorKind::Precipitation,
            "airpressure" => SensorKind::AirPressure,
            "windspeed" => SensorKind::WindSpeed,
            "winddirection" => SensorKind::WindDirection,
            "globalradiation" => SensorKind::GlobalRadiation,
            "pm2_5density" => SensorKind::Pm25,
            "airquality" => SensorKind::AirQuality,
            "waterlevel" => SensorKind::WaterLevel,
            _ => SensorKind::Ignored,
        }
    }

    /// Whether the exporter tracks this feature at all.
    pub fn is_interesting(&self) -> bool {
        !matches!(self, SensorKind::Ignored)
    }

    /// Canonical lower-cased feature name, for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "currenttemperature",
            SensorKind::RelativeHumidity => "currentrelativehumidity",
            SensorKind::ContactState => "contactsensorstate",
            SensorKind::CurrentPower => "currentpower",
            SensorKind::PowerProduced => "currentpowerproduced",
            SensorKind::EnergyUsed => "energyused",
            SensorKind::EnergyProduced => "energyproduced",
            SensorKind::BatteryLevel => "batterylevel",
            SensorKind::FilterChange => "filterchangeindication",
            SensorKind::Voltage => "currentvoltage",
            SensorKind::Ampere => "currentampere",
            SensorKind::PhaseVoltage(1) => "phase1voltage",
            SensorKind::PhaseVoltage(2) => "phase2voltage",
            SensorKind::PhaseVoltage(_) => "phase3voltage",
            SensorKind::PhaseAmpere(1) => "phase1current",
            SensorKind::PhaseAmpere(2) => "phase2current",
            SensorKind::PhaseAmpere(_) => "phase3current",
            SensorKind::Precipitation => "precipitation",
            SensorKind::AirPressure => "airpressure",
            SensorKind::WindSpeed => "windspeed",
            SensorKind::WindDirection => "winddirection",
            SensorKind::GlobalRadiation => "globalradiation",
            SensorKind::Pm25 => "pm2_5density",
            SensorKind::AirQuality => "airquality",
            SensorKind::WaterLevel => "waterlevel",
            SensorKind::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_features() {
        assert_eq!(
            SensorKind::from_feature("currentTemperature"),
            SensorKind::Temperature
        );
        assert_eq!(
            SensorKind::from_feature("currentRelativeHumidity"),
            SensorKind::RelativeHumidity
        );
        assert_eq!(
            SensorKind::from_feature("contactSensorState"),
            SensorKind::ContactState
        );
        assert_eq!(SensorKind::from_feature("energyUsed"), SensorKind::EnergyUsed);
        assert_eq!(
            SensorKind::from_feature("filterChangeIndication"),
            SensorKind::FilterChange
        );
        assert_eq!(SensorKind::from_feature("pm2_5Density"), SensorKind::Pm25);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            SensorKind::from_feature("CURRENTTEMPERATURE"),
            SensorKind::Temperature
        );
        assert_eq!(
            SensorKind::from_feature("BatteryLevel"),
            SensorKind::BatteryLevel
        );
    }

    #[test]
    fn test_phase_features() {
        assert_eq!(
            SensorKind::from_feature("phase1Voltage"),
            SensorKind::PhaseVoltage(1)
        );
        assert_eq!(
            SensorKind::from_feature("phase3Current"),
            SensorKind::PhaseAmpere(3)
        );
        // There is no phase 4 on this bus
        assert_eq!(SensorKind::from_feature("phase4Voltage"), SensorKind::Ignored);
    }

    #[test]
    fn test_unknown_maps_to_ignored() {
        assert_eq!(SensorKind::from_feature("on"), SensorKind::Ignored);
        assert_eq!(SensorKind::from_feature("brightness"), SensorKind::Ignored);
        assert_eq!(SensorKind::from_feature(""), SensorKind::Ignored);
        assert!(!SensorKind::from_feature("on").is_interesting());
    }

    #[test]
    fn test_canonical_round_trip() {
        for name in [
            "currenttemperature",
            "currentrelativehumidity",
            "contactsensorstate",
            "currentpower",
            "energyused",
            "batterylevel",
            "phase2voltage",
            "waterlevel",
        ] {
            let kind = SensorKind::from_feature(name);
            assert!(kind.is_interesting());
            assert_eq!(kind.as_str(), name);
        }
    }
}
