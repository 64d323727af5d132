use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use approx::assert_relative_eq;
use tabletop_3d::pointcloud::PointCloud;
use tabletop_3d::segmentation::Plane;
use tabletop_perception::publisher::{CloudTopic, ScenePublisher};
use tabletop_perception::scene::{DetectedObject, LabelMarker, Scene};
use tabletop_pickplace::config::{
    DropboxConfig, DropboxEntry, PickList, PickListEntry, PickPlaceParams,
};
use tabletop_pickplace::obstacle::ObstaclePolicy;
use tabletop_pickplace::orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorState};
use tabletop_pickplace::pose::Point;
use tabletop_pickplace::record::{read_records, RecordStatus};
use tabletop_pickplace::service::{
    Arm, PickPlaceRequest, PickPlaceResponse, PickPlaceService, ServiceError,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingPublisher {
    obstacles: Mutex<Vec<usize>>,
    joints: Mutex<Vec<f64>>,
}

impl ScenePublisher for RecordingPublisher {
    fn publish_cloud(&self, topic: CloudTopic, cloud: &PointCloud) {
        if topic == CloudTopic::Obstacles {
            self.obstacles.lock().unwrap().push(cloud.len());
        }
    }

    fn publish_marker(&self, _marker: &LabelMarker) {}

    fn publish_detections(&self, _detections: &[DetectedObject]) {}

    fn publish_world_joint(&self, angle: f64) {
        self.joints.lock().unwrap().push(angle);
    }
}

/// Fails the first `unavailable` availability checks, then answers every request.
#[derive(Default)]
struct ScriptedService {
    unavailable: AtomicUsize,
    reject: Vec<String>,
    latency: Duration,
    requests: Mutex<Vec<PickPlaceRequest>>,
}

impl PickPlaceService for ScriptedService {
    async fn wait_until_available(&self) -> Result<(), ServiceError> {
        let down = self
            .unavailable
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if down {
            Err(ServiceError::Unavailable("pick_place_routine".into()))
        } else {
            Ok(())
        }
    }

    async fn pick_place(
        &self,
        request: PickPlaceRequest,
    ) -> Result<PickPlaceResponse, ServiceError> {
        let success = !self.reject.contains(&request.object_name);
        self.requests.lock().unwrap().push(request);
        tokio::time::sleep(self.latency).await;
        Ok(PickPlaceResponse { success })
    }
}

fn detection(id: usize, label: &str, centroid: [f64; 3], size: usize) -> DetectedObject {
    DetectedObject {
        id,
        label: label.into(),
        cloud: PointCloud::from_points(vec![centroid; size]),
        centroid,
    }
}

fn scene(detections: Vec<DetectedObject>) -> Scene {
    Scene {
        frame: 0,
        surface: PointCloud::from_points(vec![[0.5, 0.0, 0.7]; 100]),
        objects: PointCloud::default(),
        plane: Plane {
            coefficients: [0.0, 0.0, 1.0, -0.7],
        },
        detections,
        markers: Vec::new(),
    }
}

fn params(entries: &[(&str, &str)]) -> PickPlaceParams {
    let pick_list = PickList {
        object_list: entries
            .iter()
            .map(|(name, group)| PickListEntry {
                name: name.to_string(),
                group: group.to_string(),
            })
            .collect(),
    };
    let dropbox = DropboxConfig {
        dropbox: vec![
            DropboxEntry {
                name: "left".into(),
                group: "red".into(),
                position: [2.0, 2.0, 2.0],
            },
            DropboxEntry {
                name: "right".into(),
                group: "green".into(),
                position: [3.0, 3.0, 3.0],
            },
        ],
        arms: BTreeMap::from([("red".into(), Arm::Left), ("green".into(), Arm::Right)]),
    };
    PickPlaceParams::new(pick_list, dropbox).unwrap()
}

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        dwell_secs: 0.0,
        service_timeout_secs: 5.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn resolves_soap_and_glue() {
    use OrchestratorState::*;

    let publisher = Arc::new(RecordingPublisher::default());
    let mut orchestrator = Orchestrator::new(
        fast_config(),
        params(&[("soap", "red"), ("glue", "green")]),
        ScriptedService::default(),
        publisher.clone(),
    );
    let scene = scene(vec![
        detection(0, "glue", [1.0, 0.0, 0.0], 10),
        detection(1, "soap", [0.0, 1.0, 0.0], 10),
    ]);

    let report = orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    assert_eq!(orchestrator.state(), OrchestratorState::Done);
    assert_eq!(report.records.len(), 2);

    let soap = &report.records[0];
    assert_eq!(soap.status, RecordStatus::Succeeded);
    assert_eq!(soap.arm_name, Some(Arm::Left));
    assert_eq!(soap.pick_pose.map(|p| p.position), Some(Point::from([0.0, 1.0, 0.0])));
    assert_eq!(soap.place_pose.map(|p| p.position), Some(Point::from([2.0, 2.0, 2.0])));

    let glue = &report.records[1];
    assert_eq!(glue.status, RecordStatus::Succeeded);
    assert_eq!(glue.arm_name, Some(Arm::Right));
    assert_eq!(glue.pick_pose.map(|p| p.position), Some(Point::from([1.0, 0.0, 0.0])));
    assert_eq!(glue.place_pose.map(|p| p.position), Some(Point::from([3.0, 3.0, 3.0])));

    assert_eq!(
        report.transitions,
        vec![
            Homing,
            Scanning,
            Matching { entry: 0 },
            Dispatching { entry: 0 },
            AwaitingResponse { entry: 0 },
            Recorded { entry: 0 },
            Matching { entry: 1 },
            Dispatching { entry: 1 },
            AwaitingResponse { entry: 1 },
            Recorded { entry: 1 },
            Done,
        ]
    );

    let joints = publisher.joints.lock().unwrap().clone();
    assert_eq!(joints.len(), 3);
    assert_relative_eq!(joints[0], -std::f64::consts::FRAC_PI_2);
    assert_relative_eq!(joints[1], std::f64::consts::FRAC_PI_2);
    assert_relative_eq!(joints[2], 0.0);
}

#[tokio::test]
async fn unavailable_service_fails_only_that_entry() {
    let service = ScriptedService {
        unavailable: AtomicUsize::new(1),
        ..Default::default()
    };
    let mut orchestrator = Orchestrator::new(
        fast_config(),
        params(&[("soap", "red"), ("glue", "green")]),
        service,
        Arc::new(RecordingPublisher::default()),
    );
    let scene = scene(vec![
        detection(0, "soap", [0.0, 1.0, 0.0], 10),
        detection(1, "glue", [1.0, 0.0, 0.0], 10),
    ]);

    let report = orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    let statuses = report.records.iter().map(|r| r.status).collect::<Vec<_>>();
    assert_eq!(statuses, vec![RecordStatus::Failed, RecordStatus::Succeeded]);
    assert!(report.records[0]
        .reason
        .as_deref()
        .is_some_and(|r| r.contains("unavailable")));
}

#[tokio::test]
async fn unmatched_entry_still_yields_a_record() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut orchestrator = Orchestrator::new(
        fast_config(),
        params(&[("soap", "red"), ("book", "green"), ("glue", "green")]),
        ScriptedService {
            reject: vec!["glue".into()],
            ..Default::default()
        },
        publisher.clone(),
    );
    let scene = scene(vec![
        detection(0, "soap", [0.0, 1.0, 0.0], 10),
        detection(1, "glue", [1.0, 0.0, 0.0], 10),
    ]);

    let report = orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    let statuses = report.records.iter().map(|r| r.status).collect::<Vec<_>>();
    assert_eq!(
        statuses,
        vec![
            RecordStatus::Succeeded,
            RecordStatus::Unmatched,
            RecordStatus::Failed
        ]
    );
    assert_eq!(report.records[1].pick_pose, None);
    assert_eq!(
        report.transitions[..3],
        [
            OrchestratorState::Homing,
            OrchestratorState::Scanning,
            OrchestratorState::Matching { entry: 0 },
        ]
    );
    assert!(report.transitions.contains(&OrchestratorState::Idle { entry: 1 }));
    assert!(report.transitions.contains(&OrchestratorState::Failed { entry: 2 }));
    // the unmatched entry publishes no obstacle map
    assert_eq!(publisher.obstacles.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_group_is_unresolved() {
    let mut orchestrator = Orchestrator::new(
        fast_config(),
        params(&[("soap", "blue")]),
        ScriptedService::default(),
        Arc::new(RecordingPublisher::default()),
    );
    let scene = scene(vec![detection(0, "soap", [0.0, 1.0, 0.0], 10)]);

    let report = orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.records[0].status, RecordStatus::Unresolved);
    assert!(report.records[0].pick_pose.is_some());
    assert_eq!(report.records[0].arm_name, None);
}

#[tokio::test]
async fn obstacle_map_shrinks_in_detection_order() {
    let publisher = Arc::new(RecordingPublisher::default());
    let service = ScriptedService::default();
    let mut orchestrator = Orchestrator::new(
        fast_config(),
        params(&[("a", "red"), ("b", "green"), ("c", "red")]),
        service,
        publisher.clone(),
    );
    let scene = scene(vec![
        detection(0, "a", [0.0, 0.0, 0.8], 10),
        detection(1, "b", [0.1, 0.0, 0.8], 20),
        detection(2, "c", [0.2, 0.0, 0.8], 30),
    ]);

    orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    let object_points = publisher
        .obstacles
        .lock()
        .unwrap()
        .iter()
        .map(|n| n - 100)
        .collect::<Vec<_>>();
    assert_eq!(object_points, vec![50, 30, 0]);
}

#[tokio::test]
async fn pending_targets_keep_earlier_detections() {
    let publisher = Arc::new(RecordingPublisher::default());
    let config = OrchestratorConfig {
        obstacle_policy: ObstaclePolicy::PendingTargets,
        ..fast_config()
    };
    let mut orchestrator = Orchestrator::new(
        config,
        params(&[("c", "red"), ("a", "green")]),
        ScriptedService::default(),
        publisher.clone(),
    );
    let scene = scene(vec![
        detection(0, "a", [0.0, 0.0, 0.8], 10),
        detection(1, "b", [0.1, 0.0, 0.8], 20),
        detection(2, "c", [0.2, 0.0, 0.8], 30),
    ]);

    orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    let object_points = publisher
        .obstacles
        .lock()
        .unwrap()
        .iter()
        .map(|n| n - 100)
        .collect::<Vec<_>>();
    // picking c leaves a and b, then picking a leaves b
    assert_eq!(object_points, vec![30, 20]);
}

#[tokio::test]
async fn slow_service_times_out() {
    let config = OrchestratorConfig {
        service_timeout_secs: 0.05,
        ..fast_config()
    };
    let mut orchestrator = Orchestrator::new(
        config,
        params(&[("soap", "red")]),
        ScriptedService {
            latency: Duration::from_secs(5),
            ..Default::default()
        },
        Arc::new(RecordingPublisher::default()),
    );
    let scene = scene(vec![detection(0, "soap", [0.0, 1.0, 0.0], 10)]);

    let report = orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    assert_eq!(report.records[0].status, RecordStatus::Failed);
    assert!(report.records[0]
        .reason
        .as_deref()
        .is_some_and(|r| r.contains("did not answer")));
}

#[tokio::test]
async fn cancelled_pass_records_every_entry_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output_1.yaml");
    let config = OrchestratorConfig {
        dwell_secs: 60.0,
        output_path: Some(output.clone()),
        ..fast_config()
    };
    let service = ScriptedService::default();
    let mut orchestrator = Orchestrator::new(
        config,
        params(&[("soap", "red"), ("glue", "green")]),
        service,
        Arc::new(RecordingPublisher::default()),
    );
    let scene = scene(vec![detection(0, "soap", [0.0, 1.0, 0.0], 10)]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = orchestrator.run_pass(&scene, &cancel).await;
    assert!(report.cancelled);
    assert_eq!(
        report.transitions,
        vec![OrchestratorState::Homing, OrchestratorState::Done]
    );
    assert!(report.write_error.is_none());
    assert_eq!(report.count(RecordStatus::Cancelled), 2);

    let written = read_records(&output).unwrap();
    assert_eq!(written, report.records);
    assert_eq!(written[0].object_name, "soap");
}

#[tokio::test]
async fn write_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = OrchestratorConfig {
        output_path: Some(dir.path().join("missing").join("output.yaml")),
        ..fast_config()
    };
    let mut orchestrator = Orchestrator::new(
        config,
        params(&[("soap", "red")]),
        ScriptedService::default(),
        Arc::new(RecordingPublisher::default()),
    );
    let scene = scene(vec![detection(0, "soap", [0.0, 1.0, 0.0], 10)]);

    let report = orchestrator.run_pass(&scene, &CancellationToken::new()).await;
    assert_eq!(report.records.len(), 1);
    assert!(report.write_error.is_some());
}
