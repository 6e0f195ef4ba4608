use crate::config::Credentials;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const LOGIN_PATH: &str = "/sofit-account-api/api/v1/auth";
const CONSUMPTION_PATH: &str = "/api/e-conso/pce/consommation/informatives";
const AUTHORIZE_URL: &str = "https://sofa-connexion.grdf.fr:443/openam/oauth2/externeGrdf/authorize";
const HISTORY_DAYS: i64 = 30;

/// One consumption reading for the account's PCE
#[derive(Debug, Clone, PartialEq)]
pub struct Consumption {
    pub index_m3: f64,
    pub index_kwh: f64,
    pub journee_gaziere: String,
}

/// Source of Gazpar consumption indexes
#[async_trait]
pub trait ConsumptionSource: Send + Sync {
    async fn get_consumption(&self, credentials: &Credentials) -> anyhow::Result<Consumption>;
}

/// Client for the GRDF customer space API
pub struct GazparClient {
    login_url: String,
    api_url: String,
}

impl GazparClient {
    /// Creates a client for the given login and API base URLs
    pub fn new(login_url: &str, api_url: &str) -> Self {
        Self {
            login_url: login_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Opens an authenticated session on `client`
    async fn login(&self, client: &reqwest::Client, credentials: &Credentials) -> anyhow::Result<()> {
        let form = [
            ("email", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("capp", "meg"),
            ("goto", AUTHORIZE_URL),
        ];
        let response: LoginResponse = client
            .post(format!("{}{}", self.login_url, LOGIN_PATH))
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Unreadable GRDF login response")?;

        if response.state != "SUCCESS" {
            anyhow::bail!(
                "GRDF authentication failed for {} ({}: {})",
                credentials.username,
                response.state,
                response.error.unwrap_or_default()
            );
        }
        Ok(())
    }

    async fn read_releves(
        &self,
        client: &reqwest::Client,
        pce: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<Releve>> {
        let date_debut = from.format("%Y-%m-%d").to_string();
        let date_fin = to.format("%Y-%m-%d").to_string();
        let mut by_pce: HashMap<String, PceConsumption> = client
            .get(format!("{}{}", self.api_url, CONSUMPTION_PATH))
            .query(&[
                ("dateDebut", date_debut.as_str()),
                ("dateFin", date_fin.as_str()),
                ("pceList[]", pce),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Unreadable GRDF consumption response")?;

        let pce_consumption = by_pce
            .remove(pce)
            .with_context(|| format!("No consumption data returned for PCE {pce}"))?;
        Ok(pce_consumption.releves)
    }
}

#[async_trait]
impl ConsumptionSource for GazparClient {
    async fn get_consumption(&self, credentials: &Credentials) -> anyhow::Result<Consumption> {
        // New cookie session on every fetch
        let client = reqwest::Client::builder().cookie_store(true).build()?;

        self.login(&client, credentials).await?;

        let today = Local::now().date_naive();
        let from = today - Duration::days(HISTORY_DAYS);
        let releves = self
            .read_releves(&client, &credentials.pce, from, today)
            .await?;
        debug!("Received {} GRDF readings for {}", releves.len(), credentials.pce);

        latest_consumption(&releves)
    }
}

/// Picks the most recent reading carrying an end index
pub fn latest_consumption(releves: &[Releve]) -> anyhow::Result<Consumption> {
    let releve = releves
        .iter()
        .filter(|r| r.index_fin.is_some())
        .max_by(|a, b| a.journee_gaziere.cmp(&b.journee_gaziere))
        .context("No GRDF reading with an end index")?;

    let index_m3 = releve.index_fin.unwrap_or_default();
    let coeff = releve.coeff_conversion.with_context(|| {
        format!(
            "Missing conversion coefficient for gas day {}",
            releve.journee_gaziere
        )
    })?;

    Ok(Consumption {
        index_m3,
        index_kwh: (index_m3 * coeff).round(),
        journee_gaziere: releve.journee_gaziere.clone(),
    })
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    state: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PceConsumption {
    #[serde(default)]
    releves: Vec<Releve>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Releve {
    pub journee_gaziere: String,
    #[serde(default)]
    pub index_debut: Option<f64>,
    #[serde(default)]
    pub index_fin: Option<f64>,
    #[serde(default)]
    pub volume_brut_consomme: Option<f64>,
    #[serde(default)]
    pub energie_consomme: Option<f64>,
    #[serde(default)]
    pub coeff_conversion: Option<f64>,
}
