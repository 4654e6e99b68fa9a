pub mod client;

use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::HassServer;
use crate::error::{ApiError, ApiResult};
use crate::lightstate::CircadianReading;

use self::client::{HassClient, HassState};

/// Synchronous view of the latest circadian reading.
pub trait ColorSource: Send + Sync {
    fn current(&self) -> Option<CircadianReading>;
}

/// Reader side of the circadian sensor. Cheap to clone, always returns the
/// most recently published reading.
#[derive(Clone, Debug)]
pub struct CircadianSensor {
    rx: watch::Receiver<Option<CircadianReading>>,
}

impl CircadianSensor {
    #[must_use]
    pub fn channel() -> (watch::Sender<Option<CircadianReading>>, Self) {
        let (tx, rx) = watch::channel(None);
        (tx, Self { rx })
    }
}

impl ColorSource for CircadianSensor {
    fn current(&self) -> Option<CircadianReading> {
        *self.rx.borrow()
    }
}

/// Interpret a sensor state: the state itself is the percentage, and the
/// `xy_color` attribute holds the color.
pub fn parse_reading(state: &HassState) -> ApiResult<CircadianReading> {
    let invalid = |msg: &str| ApiError::InvalidReading(state.entity_id.clone(), msg.to_string());

    let percent: f64 = state
        .state
        .trim()
        .parse()
        .map_err(|_| invalid(&format!("state {:?} is not a number", state.state)))?;
    if !percent.is_finite() {
        return Err(invalid(&format!("state {:?} is not a finite number", state.state)));
    }

    let xy = state
        .attributes
        .get("xy_color")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing xy_color attribute"))?;

    let [x, y] = xy.as_slice() else {
        return Err(invalid("xy_color must have two coordinates"));
    };

    let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) else {
        return Err(invalid("xy_color coordinates must be numbers"));
    };

    Ok(CircadianReading {
        percent,
        xy: [x, y],
    })
}

/// Publish the outcome of one sensor read.
///
/// A failed read or an invalid state clears the published reading, so
/// bridges are never driven from an outdated curve value.
pub fn publish_reading(
    tx: &watch::Sender<Option<CircadianReading>>,
    state: ApiResult<HassState>,
) -> ApiResult<CircadianReading> {
    let res = state.and_then(|st| parse_reading(&st));
    tx.send_replace(res.as_ref().ok().copied());
    res
}

/// Polls the circadian sensor in Home Assistant, and publishes every valid
/// reading to a [`CircadianSensor`].
pub struct HassSensorPoller {
    server: HassServer,
    client: HassClient,
    tx: watch::Sender<Option<CircadianReading>>,
}

impl HassSensorPoller {
    pub fn new(server: HassServer, tx: watch::Sender<Option<CircadianReading>>) -> ApiResult<Self> {
        let mut client = HassClient::new(&server)?;
        client.load_token_from_env(&server)?;
        Ok(Self { server, client, tx })
    }

    pub async fn poll_once(&self) -> ApiResult<CircadianReading> {
        let state = self.client.get_state(&self.server.sensor).await;
        publish_reading(&self.tx, state)
    }

    pub async fn run(self) -> ApiResult<()> {
        let period = Duration::from_secs(u64::from(self.server.poll_interval_secs.get()));
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "[hass] Polling {} every {}s",
            self.server.sensor,
            period.as_secs()
        );

        loop {
            tick.tick().await;
            match self.poll_once().await {
                Ok(reading) => log::trace!("[hass] New circadian reading: {reading:?}"),
                Err(err) => log::debug!(
                    "[hass] Failed to read {}, clearing reading: {err}",
                    self.server.sensor
                ),
            }
        }
    }
}
