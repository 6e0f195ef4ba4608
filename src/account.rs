use crate::config::{Credentials, Schedule};
use crate::gazpar_client::ConsumptionSource;
use crate::home_assistant::StatePublisher;
use crate::sensor::{GazparSensor, SensorEntity, SensorKind};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Registers the Gazpar sensors with the host and starts polling.
/// Returns `None` (after logging) if the sensors could not be registered.
pub async fn setup_platform<S, P>(
    publisher: P,
    source: S,
    credentials: Credentials,
    schedule: Schedule,
) -> Option<JoinHandle<()>>
where
    S: ConsumptionSource + 'static,
    P: StatePublisher + 'static,
{
    debug!("Initializing Gazpar platform...");

    let account = GazparAccount::new(publisher, source, credentials, schedule);
    if let Err(e) = account.register_sensors().await {
        error!("Gazpar platform initialization has failed: {e:?}");
        return None;
    }

    info!(
        "Gazpar platform initialized for {}, polling every {:?}",
        account.username(),
        schedule.interval
    );
    Some(account.spawn())
}

/// Owns the Gazpar sensors of one GRDF account and keeps them up to date
pub struct GazparAccount<S, P> {
    credentials: Credentials,
    schedule: Schedule,
    source: S,
    publisher: P,
    sensors: Vec<GazparSensor>,
}

impl<S, P> GazparAccount<S, P>
where
    S: ConsumptionSource + 'static,
    P: StatePublisher + 'static,
{
    /// Creates the account with one unset sensor per measurement kind
    pub fn new(publisher: P, source: S, credentials: Credentials, schedule: Schedule) -> Self {
        let sensors = vec![
            GazparSensor::new(SensorKind::EnergyKiloWattHour),
            GazparSensor::new(SensorKind::VolumeCubicMeters),
        ];
        Self {
            credentials,
            schedule,
            source,
            publisher,
            sensors,
        }
    }

    /// GRDF login of this account
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// All sensors owned by the account
    pub fn sensors(&self) -> &[GazparSensor] {
        &self.sensors
    }

    /// The sensor holding readings of the given kind
    pub fn sensor(&self, kind: SensorKind) -> Option<&GazparSensor> {
        self.sensors.iter().find(|s| s.kind() == kind)
    }

    /// Publishes the initial (unknown) state of every sensor
    pub async fn register_sensors(&self) -> anyhow::Result<()> {
        for sensor in &self.sensors {
            self.publisher.publish_state(sensor).await?;
        }
        Ok(())
    }

    /// Spawns the polling loop in its own task
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Main execution loop: one fetch after the initial delay, then one per period
    async fn run(&mut self) {
        let start = Instant::now();
        let period = self.schedule.scan_period();

        sleep(self.schedule.initial_delay).await;
        self.update_gazpar_data(Instant::now()).await;

        // Initial delay used up the first period: restart it from the initial fetch
        let mut first_tick = start + period;
        let now = Instant::now();
        if first_tick <= now {
            first_tick = now + period;
        }
        let mut scan_interval = interval_at(first_tick, period);
        scan_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let event_time = scan_interval.tick().await;
            self.update_gazpar_data(event_time).await;
        }
    }

    /// Fetches fresh indexes and publishes them. Failures are logged and the
    /// previous readings are kept until the next tick.
    pub async fn update_gazpar_data(&mut self, event_time: Instant) {
        debug!("Querying Gazpar library for new data (tick {event_time:?})...");

        let consumption = match self.source.get_consumption(&self.credentials).await {
            Ok(consumption) => consumption,
            Err(e) => {
                error!("Failed to query Gazpar library: {e:?}");
                return;
            }
        };

        for sensor in self.sensors.iter_mut() {
            match sensor.kind() {
                SensorKind::VolumeCubicMeters => {
                    sensor.set_data(consumption.index_m3);
                    sensor.set_attributes(&consumption.journee_gaziere);
                }
                SensorKind::EnergyKiloWattHour => sensor.set_data(consumption.index_kwh),
            }
        }

        for sensor in &self.sensors {
            if let Err(e) = self.publisher.publish_state(sensor).await {
                error!("Failed to publish {}: {e:?}", sensor.name());
            }
        }
        debug!(
            "Gazpar data updated: {} m³, {} kWh, gas day {}",
            consumption.index_m3, consumption.index_kwh, consumption.journee_gaziere
        );
    }
}
