use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabletop_perception::publisher::{CloudTopic, ScenePublisher};
use tabletop_perception::scene::Scene;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigIssue, PickPlaceParams};
use crate::obstacle::{build_obstacles, ObstaclePolicy, PassCursor};
use crate::record::{write_records, PickRecord, RecordError, RecordStatus};
use crate::service::{PickPlaceRequest, PickPlaceResponse, PickPlaceService, ServiceError};
use crate::task::{resolve, MatchPolicy, PickTask, ResolveError};

/// Settings of a pick pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Identifier of the test scene sent with every request.
    pub scene_id: u32,
    /// World joint angles commanded before the first pick, in radians.
    pub homing_angles: Vec<f64>,
    /// Wait after each homing command, in seconds.
    pub dwell_secs: f64,
    /// Bound on waiting for and calling the service, in seconds.
    pub service_timeout_secs: f64,
    /// Detection chosen among equally labelled ones.
    pub match_policy: MatchPolicy,
    /// Detections kept in the obstacle map.
    pub obstacle_policy: ObstaclePolicy,
    /// Where the records of a pass are written.
    pub output_path: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scene_id: 1,
            homing_angles: vec![-FRAC_PI_2, FRAC_PI_2, 0.0],
            dwell_secs: 16.0,
            service_timeout_secs: 60.0,
            match_policy: MatchPolicy::default(),
            obstacle_policy: ObstaclePolicy::default(),
            output_path: None,
        }
    }
}

/// Where the orchestrator is in a pass. `entry` is the pick list index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Sweeping the base to build the collision map.
    Homing,
    /// Waiting for a scene.
    Scanning,
    /// Looking for the entry's object among the detections.
    Matching {
        /// Pick list index.
        entry: usize,
    },
    /// The entry cannot be dispatched.
    Idle {
        /// Pick list index.
        entry: usize,
    },
    /// Publishing the obstacle map.
    Dispatching {
        /// Pick list index.
        entry: usize,
    },
    /// Waiting for the manipulation service.
    AwaitingResponse {
        /// Pick list index.
        entry: usize,
    },
    /// The entry finished successfully.
    Recorded {
        /// Pick list index.
        entry: usize,
    },
    /// The entry failed.
    Failed {
        /// Pick list index.
        entry: usize,
    },
    /// The pass is over.
    Done,
}

/// Summary of one pass.
#[derive(Debug)]
pub struct PassReport {
    /// One record per pick list entry, in pick list order.
    pub records: Vec<PickRecord>,
    /// Pick list entries whose group cannot be served.
    pub issues: Vec<ConfigIssue>,
    /// Whether the pass was cancelled.
    pub cancelled: bool,
    /// Error raised while persisting the records.
    pub write_error: Option<RecordError>,
    /// States entered during the pass, in order.
    pub transitions: Vec<OrchestratorState>,
}

impl PassReport {
    /// Number of records with the given status.
    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// Drives the robot through a pick list for one scene.
pub struct Orchestrator<S> {
    config: OrchestratorConfig,
    params: PickPlaceParams,
    service: S,
    publisher: Arc<dyn ScenePublisher>,
    state: OrchestratorState,
    transitions: Vec<OrchestratorState>,
}

impl<S: PickPlaceService> Orchestrator<S> {
    /// Create an orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        params: PickPlaceParams,
        service: S,
        publisher: Arc<dyn ScenePublisher>,
    ) -> Self {
        Self {
            config,
            params,
            service,
            publisher,
            state: OrchestratorState::Scanning,
            transitions: Vec::new(),
        }
    }

    /// The current state.
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// The pick-place parameters.
    pub fn params(&self) -> &PickPlaceParams {
        &self.params
    }

    fn transition(&mut self, state: OrchestratorState) {
        log::debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
        self.transitions.push(state);
    }

    /// Sweep the base through the homing angles. Returns false when cancelled.
    async fn home(&mut self, cancel: &CancellationToken) -> bool {
        self.transition(OrchestratorState::Homing);
        let dwell = Duration::from_secs_f64(self.config.dwell_secs.max(0.0));
        for angle in &self.config.homing_angles {
            self.publisher.publish_world_joint(*angle);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(dwell) => {}
            }
        }
        true
    }

    async fn call_service(
        &self,
        request: PickPlaceRequest,
    ) -> Result<PickPlaceResponse, ServiceError> {
        let timeout = Duration::from_secs_f64(self.config.service_timeout_secs.max(0.0));
        let call = async {
            self.service.wait_until_available().await?;
            self.service.pick_place(request).await
        };
        tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(ServiceError::Timeout(timeout)))
    }

    fn record(&self, task: &PickTask, status: RecordStatus, reason: Option<String>) -> PickRecord {
        PickRecord {
            test_scene_num: self.config.scene_id,
            arm_name: task.arm,
            object_name: task.object_name.clone(),
            pick_pose: task.pick_pose,
            place_pose: task.place_pose,
            status,
            reason,
        }
    }

    /// Run one pass over the pick list against `scene`.
    ///
    /// Every entry yields exactly one record, whatever happens to it. Cancellation stops
    /// homing immediately; an in-flight request finishes or times out, and the remaining
    /// entries are recorded as cancelled.
    pub async fn run_pass(&mut self, scene: &Scene, cancel: &CancellationToken) -> PassReport {
        let issues = self.params.validate();
        for issue in &issues {
            log::warn!("{issue}");
        }

        let entries = self.params.pick_list.object_list.clone();
        let num_steps = entries.len();
        let mut records = Vec::with_capacity(num_steps);
        let mut dispatched = Vec::new();
        self.transitions.clear();
        let mut cancelled = !self.home(cancel).await;
        if !cancelled {
            self.transition(OrchestratorState::Scanning);
        }

        for (step, entry) in entries.iter().enumerate() {
            let task = resolve(
                entry,
                &scene.detections,
                &self.params,
                self.config.match_policy,
            );

            if cancelled || cancel.is_cancelled() {
                cancelled = true;
                records.push(self.record(&task, RecordStatus::Cancelled, None));
                continue;
            }

            self.transition(OrchestratorState::Matching { entry: step });
            let request = match task.request(self.config.scene_id) {
                Ok(request) => request,
                Err(e) => {
                    self.transition(OrchestratorState::Idle { entry: step });
                    log::warn!("{}: {e}, skipping", entry.name);
                    let status = match e {
                        ResolveError::Unmatched(_) => RecordStatus::Unmatched,
                        ResolveError::NoDropbox(_) | ResolveError::NoArm(_) => {
                            RecordStatus::Unresolved
                        }
                    };
                    records.push(self.record(&task, status, Some(e.to_string())));
                    continue;
                }
            };

            self.transition(OrchestratorState::Dispatching { entry: step });
            let remaining = self.config.obstacle_policy.remaining(
                &scene.detections,
                PassCursor {
                    step,
                    num_steps,
                    dispatched: &dispatched,
                    target: task.target,
                },
            );
            let obstacles = build_obstacles(&scene.surface, &remaining);
            log::debug!(
                "{}: obstacle map with {} objects, {} points",
                entry.name,
                remaining.len(),
                obstacles.len()
            );
            self.publisher.publish_cloud(CloudTopic::Obstacles, &obstacles);
            dispatched.extend(task.target);

            self.transition(OrchestratorState::AwaitingResponse { entry: step });
            let arm = request.arm;
            let record = match self.call_service(request).await {
                Ok(PickPlaceResponse { success: true }) => {
                    self.transition(OrchestratorState::Recorded { entry: step });
                    log::info!("{} picked with the {arm} arm", entry.name);
                    self.record(&task, RecordStatus::Succeeded, None)
                }
                Ok(PickPlaceResponse { success: false }) => {
                    self.transition(OrchestratorState::Failed { entry: step });
                    log::warn!("{}: pick-place reported failure", entry.name);
                    let reason = Some("service reported failure".to_string());
                    self.record(&task, RecordStatus::Failed, reason)
                }
                Err(e) => {
                    self.transition(OrchestratorState::Failed { entry: step });
                    log::warn!("{}: {e}", entry.name);
                    self.record(&task, RecordStatus::Failed, Some(e.to_string()))
                }
            };
            records.push(record);
        }

        let write_error = match &self.config.output_path {
            Some(path) => match write_records(path, &records) {
                Ok(()) => {
                    log::info!("wrote {} records to {}", records.len(), path.display());
                    None
                }
                Err(e) => {
                    log::error!("failed to write {}: {e}", path.display());
                    Some(e)
                }
            },
            None => None,
        };

        self.transition(OrchestratorState::Done);
        let report = PassReport {
            records,
            issues,
            cancelled,
            write_error,
            transitions: std::mem::take(&mut self.transitions),
        };
        log::info!(
            "pass over scene {} done: {} succeeded, {} failed, {} unmatched, {} unresolved, {} cancelled",
            scene.frame,
            report.count(RecordStatus::Succeeded),
            report.count(RecordStatus::Failed),
            report.count(RecordStatus::Unmatched),
            report.count(RecordStatus::Unresolved),
            report.count(RecordStatus::Cancelled),
        );
        report
    }
}
