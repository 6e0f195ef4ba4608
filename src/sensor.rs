use std::collections::BTreeMap;

pub const SENSOR_NAME_M3: &str = "Gazpar m3";
pub const SENSOR_NAME_KWH: &str = "Gazpar kwh";

/// Attribute carrying the GRDF gas-day label on the cubic meter sensor
pub const ATTR_JOURNEE_GAZIERE: &str = "Journee gaziere";

const SENSOR_ICON: &str = "mdi:fire";
const STATE_CLASS_TOTAL_INCREASING: &str = "total_increasing";

/// Everything the host needs to publish a sensor's state
pub trait SensorEntity: Send + Sync {
    fn name(&self) -> &str;
    fn state(&self) -> Option<f64>;
    fn unit_of_measurement(&self) -> &str;
    fn device_class(&self) -> &str;
    fn state_class(&self) -> &str;
    fn icon(&self) -> &str;
    fn extra_state_attributes(&self) -> &BTreeMap<String, String>;

    /// Home Assistant entity id, `Gazpar m3` becomes `sensor.gazpar_m3`
    fn entity_id(&self) -> String {
        let slug: String = self
            .name()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("sensor.{slug}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    VolumeCubicMeters,
    EnergyKiloWattHour,
}

impl SensorKind {
    /// Display name, also the discriminator seen by the host
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::VolumeCubicMeters => SENSOR_NAME_M3,
            SensorKind::EnergyKiloWattHour => SENSOR_NAME_KWH,
        }
    }

    /// Unit of measurement
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::VolumeCubicMeters => "m³",
            SensorKind::EnergyKiloWattHour => "kWh",
        }
    }

    /// Home Assistant device class
    pub fn device_class(&self) -> &'static str {
        match self {
            SensorKind::VolumeCubicMeters => "gas",
            SensorKind::EnergyKiloWattHour => "energy",
        }
    }
}

/// Last known value of one Gazpar index
#[derive(Debug, Clone, PartialEq)]
pub struct GazparSensor {
    kind: SensorKind,
    measure: Option<f64>,
    extra_state_attributes: BTreeMap<String, String>,
}

impl GazparSensor {
    /// Creates a sensor with no measure yet
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            measure: None,
            extra_state_attributes: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Overwrites the measure unconditionally
    pub fn set_data(&mut self, measure: f64) {
        self.measure = Some(measure);
    }

    /// Replaces the extra attributes with the gas-day label.
    /// Ignored until a measure has been set.
    pub fn set_attributes(&mut self, journee_gaziere: &str) {
        if self.measure.is_none() {
            return;
        }
        let mut attrs = BTreeMap::new();
        attrs.insert(
            ATTR_JOURNEE_GAZIERE.to_string(),
            journee_gaziere.to_string(),
        );
        self.extra_state_attributes = attrs;
    }
}

impl SensorEntity for GazparSensor {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn state(&self) -> Option<f64> {
        self.measure
    }

    fn unit_of_measurement(&self) -> &str {
        self.kind.unit()
    }

    fn device_class(&self) -> &str {
        self.kind.device_class()
    }

    fn state_class(&self) -> &str {
        STATE_CLASS_TOTAL_INCREASING
    }

    fn icon(&self) -> &str {
        SENSOR_ICON
    }

    fn extra_state_attributes(&self) -> &BTreeMap<String, String> {
        &self.extra_state_attributes
    }
}
