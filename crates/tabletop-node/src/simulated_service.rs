use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tabletop_pickplace::service::{
    PickPlaceRequest, PickPlaceResponse, PickPlaceService, ServiceError,
};

/// Behaviour of the simulated service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedServiceConfig {
    /// Duration of one pick and place, in seconds.
    pub latency_secs: f64,
    /// Time after startup before the service accepts requests, in seconds.
    pub availability_delay_secs: f64,
    /// Objects whose pick always fails.
    pub fail_objects: Vec<String>,
}

impl Default for SimulatedServiceConfig {
    fn default() -> Self {
        Self {
            latency_secs: 0.5,
            availability_delay_secs: 0.0,
            fail_objects: Vec::new(),
        }
    }
}

/// A pick-place service that only takes time, for dry runs without a robot.
#[derive(Debug, Clone)]
pub struct SimulatedPickPlaceService {
    config: SimulatedServiceConfig,
    started: Instant,
}

impl SimulatedPickPlaceService {
    /// Create the service. The availability delay starts now.
    pub fn new(config: SimulatedServiceConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

impl PickPlaceService for SimulatedPickPlaceService {
    async fn wait_until_available(&self) -> Result<(), ServiceError> {
        let ready_at = self.started + secs(self.config.availability_delay_secs);
        let now = Instant::now();
        if ready_at > now {
            log::debug!("waiting {:?} for the pick-place service", ready_at - now);
            tokio::time::sleep(ready_at - now).await;
        }
        Ok(())
    }

    async fn pick_place(
        &self,
        request: PickPlaceRequest,
    ) -> Result<PickPlaceResponse, ServiceError> {
        let p = request.pick_pose.position;
        let q = request.place_pose.position;
        log::info!(
            "simulating {} arm: {} from ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            request.arm,
            request.object_name,
            p.x,
            p.y,
            p.z,
            q.x,
            q.y,
            q.z
        );
        tokio::time::sleep(secs(self.config.latency_secs)).await;
        Ok(PickPlaceResponse {
            success: !self.config.fail_objects.contains(&request.object_name),
        })
    }
}
