use rerun::{Color, Points3D, Position3D, RecordingStream, TextLog};
use tabletop_3d::pointcloud::PointCloud;
use tabletop_perception::publisher::{CloudTopic, ScenePublisher};
use tabletop_perception::scene::{DetectedObject, LabelMarker};

/// Streams clouds, labels and commands to a rerun viewer.
pub struct RerunPublisher {
    rec: RecordingStream,
}

impl RerunPublisher {
    /// Publish into an existing recording stream.
    pub fn new(rec: RecordingStream) -> Self {
        Self { rec }
    }

    fn log_result<E: std::fmt::Display>(&self, what: &str, result: Result<(), E>) {
        if let Err(e) = result {
            log::warn!("failed to log {what} to rerun: {e}");
        }
    }
}

fn position(p: &[f64; 3]) -> Position3D {
    Position3D::new(p[0] as f32, p[1] as f32, p[2] as f32)
}

impl ScenePublisher for RerunPublisher {
    fn publish_cloud(&self, topic: CloudTopic, cloud: &PointCloud) {
        let points = cloud.points().iter().map(position).collect::<Vec<_>>();
        let colors = match cloud.colors() {
            Some(colors) => colors
                .iter()
                .map(|c| Color::from_rgb(c[0], c[1], c[2]))
                .collect::<Vec<_>>(),
            None => vec![Color::from_rgb(90, 145, 199); points.len()],
        };

        let result = self.rec.log(
            format!("world/{topic}"),
            &Points3D::new(points).with_colors(colors),
        );
        self.log_result(topic.as_str(), result);
    }

    fn publish_marker(&self, marker: &LabelMarker) {
        let result = self.rec.log(
            format!("world/labels/{}", marker.id),
            &Points3D::new([position(&marker.position)]).with_labels([marker.text.clone()]),
        );
        self.log_result("label", result);
    }

    fn publish_detections(&self, detections: &[DetectedObject]) {
        let labels = detections
            .iter()
            .map(|d| d.label.as_str())
            .collect::<Vec<_>>();
        let result = self.rec.log(
            "log/detections",
            &TextLog::new(format!("{} objects: {}", detections.len(), labels.join(", "))),
        );
        self.log_result("detections", result);
    }

    fn publish_world_joint(&self, angle: f64) {
        let result = self.rec.log(
            "log/world_joint",
            &TextLog::new(format!("world joint -> {angle:.3} rad")),
        );
        self.log_result("world joint", result);
    }
}
