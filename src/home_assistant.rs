use crate::sensor::SensorEntity;
use anyhow::Context;
use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Pushes sensor states to the host platform
#[async_trait]
pub trait StatePublisher: Send + Sync {
    async fn publish_state(&self, entity: &dyn SensorEntity) -> anyhow::Result<()>;
}

pub struct HomeAssistantAPI {
    endpoint_url: String,
    auth_token: String,
    client: reqwest::Client,
}

impl HomeAssistantAPI {
    /// Creates a client for the instance at `endpoint_url` using a long-lived access token
    pub fn new(endpoint_url: &str, auth_token: &str) -> Self {
        Self {
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Writes a state through `POST /api/states/<entity_id>`
    pub async fn write_state(
        &self,
        entity_id: &str,
        update: &HAStateUpdate,
    ) -> Result<HASensor, anyhow::Error> {
        if self.endpoint_url.is_empty() {
            anyhow::bail!("No HA connection");
        }
        let result = self
            .client
            .post(format!("{}/api/states/{}", self.endpoint_url, entity_id))
            .bearer_auth(&self.auth_token)
            .json(update)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl StatePublisher for HomeAssistantAPI {
    async fn publish_state(&self, entity: &dyn SensorEntity) -> anyhow::Result<()> {
        let entity_id = entity.entity_id();
        let update = HAStateUpdate::from_entity(entity);
        let stored = self
            .write_state(&entity_id, &update)
            .await
            .with_context(|| format!("Failed to publish state of {entity_id}"))?;
        debug!(
            "Published {} = {} (last updated {})",
            stored.entity_id, stored.state, stored.last_updated
        );
        Ok(())
    }
}

/// Body of `POST /api/states/<entity_id>`
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HAStateUpdate {
    pub state: String,
    pub attributes: Map<String, Value>,
}

impl HAStateUpdate {
    pub fn from_entity(entity: &dyn SensorEntity) -> Self {
        let state = match entity.state() {
            Some(value) => value.to_string(),
            None => "unknown".to_string(),
        };

        let mut attributes = Map::new();
        for (key, value) in entity.extra_state_attributes() {
            attributes.insert(key.clone(), Value::from(value.as_str()));
        }
        attributes.insert("friendly_name".into(), entity.name().into());
        attributes.insert(
            "unit_of_measurement".into(),
            entity.unit_of_measurement().into(),
        );
        attributes.insert("device_class".into(), entity.device_class().into());
        attributes.insert("state_class".into(), entity.state_class().into());
        attributes.insert("icon".into(), entity.icon().into());

        Self { state, attributes }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HASensor {
    #[serde(rename = "entity_id")]
    pub entity_id: String,
    pub state: String,
    #[serde(rename = "last_changed", default)]
    pub last_changed: String,
    #[serde(rename = "last_reported", default)]
    pub last_reported: String,
    #[serde(rename = "last_updated", default)]
    pub last_updated: String,
}

#[cfg(test)]
mod test_ha_wrapper {
    use super::*;
    use crate::sensor::{GazparSensor, SensorKind};
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_state_update_for_unset_sensor() {
        let sensor = GazparSensor::new(SensorKind::EnergyKiloWattHour);
        let update = HAStateUpdate::from_entity(&sensor);

        assert_eq!(update.state, "unknown");
        assert_eq!(update.attributes["friendly_name"], "Gazpar kwh");
        assert_eq!(update.attributes["unit_of_measurement"], "kWh");
        assert_eq!(update.attributes["device_class"], "energy");
        assert_eq!(update.attributes["state_class"], "total_increasing");
        assert_eq!(update.attributes["icon"], "mdi:fire");
        assert!(update.attributes.get("Journee gaziere").is_none());
    }

    #[test]
    fn test_state_update_carries_extra_attributes() {
        let mut sensor = GazparSensor::new(SensorKind::VolumeCubicMeters);
        sensor.set_data(1234.5);
        sensor.set_attributes("2024-03-01");
        let update = HAStateUpdate::from_entity(&sensor);

        assert_eq!(update.state, "1234.5");
        assert_eq!(update.attributes["Journee gaziere"], "2024-03-01");
        assert_eq!(update.attributes["unit_of_measurement"], "m³");
    }

    #[tokio::test]
    async fn test_publish_state() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/api/states/sensor.gazpar_m3")
            .match_header("Authorization", "Bearer test_token")
            .match_body(Matcher::PartialJson(json!({
                "state": "10",
                "attributes": {
                    "friendly_name": "Gazpar m3",
                    "device_class": "gas",
                    "Journee gaziere": "2024-01-01"
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"
                {
                    "entity_id": "sensor.gazpar_m3",
                    "state": "10",
                    "attributes": {},
                    "last_changed": "2024-01-01T12:00:00Z",
                    "last_reported": "2024-01-01T12:00:00Z",
                    "last_updated": "2024-01-01T12:00:00Z"
                }
            "#,
            )
            .create_async()
            .await;

        let mut sensor = GazparSensor::new(SensorKind::VolumeCubicMeters);
        sensor.set_data(10.0);
        sensor.set_attributes("2024-01-01");

        let api = HomeAssistantAPI::new(&server.url(), "test_token");
        api.publish_state(&sensor).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_state_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/states/sensor.gazpar_kwh")
            .with_status(401)
            .create_async()
            .await;

        let api = HomeAssistantAPI::new(&server.url(), "bad_token");
        let sensor = GazparSensor::new(SensorKind::EnergyKiloWattHour);
        let result = api.publish_state(&sensor).await;

        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Failed to publish state of sensor.gazpar_kwh"
        );
    }

    #[tokio::test]
    async fn test_home_assistant_api_no_connection() {
        let api = HomeAssistantAPI::new("", "");
        let result = api
            .write_state("sensor.gazpar_m3", &HAStateUpdate::default())
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "No HA connection");
    }
}
