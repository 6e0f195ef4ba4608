//! Gazpar Sensor Library
//!
//! Polls the GRDF Gazpar customer API for a gas delivery point and republishes
//! its cubic meter and kilowatt-hour indexes as Home Assistant sensors.

pub mod account;
pub mod config;
pub mod gazpar_client;
pub mod home_assistant;
pub mod sensor;

// Re-export commonly used types for easier access
pub use account::{setup_platform, GazparAccount};
pub use config::{Config, Credentials, Schedule};
pub use gazpar_client::{Consumption, ConsumptionSource, GazparClient};
pub use home_assistant::{HomeAssistantAPI, StatePublisher};
pub use sensor::{GazparSensor, SensorEntity, SensorKind};
