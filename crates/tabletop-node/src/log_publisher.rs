use tabletop_3d::pointcloud::PointCloud;
use tabletop_perception::publisher::{CloudTopic, ScenePublisher};
use tabletop_perception::scene::{DetectedObject, LabelMarker};

/// Writes a one line summary of everything published to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

impl ScenePublisher for LogPublisher {
    fn publish_cloud(&self, topic: CloudTopic, cloud: &PointCloud) {
        log::debug!("[{topic}] {} points", cloud.len());
    }

    fn publish_marker(&self, marker: &LabelMarker) {
        let [x, y, z] = marker.position;
        log::debug!("[label] {} at ({x:.3}, {y:.3}, {z:.3})", marker.text);
    }

    fn publish_detections(&self, detections: &[DetectedObject]) {
        for d in detections {
            let [x, y, z] = d.centroid;
            log::info!(
                "[detections] #{} {} at ({x:.3}, {y:.3}, {z:.3}), {} points",
                d.id,
                d.label,
                d.cloud.len()
            );
        }
    }

    fn publish_world_joint(&self, angle: f64) {
        log::info!("[world_joint] {:.1} deg", angle.to_degrees());
    }
}
