use std::sync::Arc;

use tabletop_3d::pointcloud::PointCloud;
use tabletop_features::classifier::ObjectClassifier;

use crate::cluster::Clusterer;
use crate::config::PerceptionConfig;
use crate::preprocess::Preprocessor;
use crate::publisher::{CloudTopic, ScenePublisher};
use crate::scene::{DetectedObject, LabelMarker, Scene};
use crate::segment::Segmenter;
use crate::PerceptionError;

/// The perception context: every stage, built once and shared read only.
///
/// A frame goes through cleaning, segmentation, clustering and classification. The object
/// cloud, the table, the colored clusters, one marker per object and the detection list are
/// published on the way.
pub struct Perception {
    preprocessor: Preprocessor,
    segmenter: Segmenter,
    clusterer: Clusterer,
    classifier: Arc<ObjectClassifier>,
    publisher: Arc<dyn ScenePublisher>,
    marker_offset: f64,
}

impl Perception {
    /// Build the pipeline.
    pub fn new(
        config: &PerceptionConfig,
        classifier: Arc<ObjectClassifier>,
        publisher: Arc<dyn ScenePublisher>,
    ) -> Result<Self, PerceptionError> {
        Ok(Self {
            preprocessor: Preprocessor::new(config.preprocess.clone())?,
            segmenter: Segmenter::new(config.segment.clone()),
            clusterer: Clusterer::new(config.cluster.clone()),
            classifier,
            publisher,
            marker_offset: config.marker_offset,
        })
    }

    /// Process one frame.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptionError::Segment`] when no support surface could be extracted.
    /// Clusters that cannot be classified are logged and left out of the scene.
    pub fn process(&self, frame: u64, cloud: &PointCloud) -> Result<Scene, PerceptionError> {
        let cleaned = self.preprocessor.clean(cloud);
        let segmented = self.segmenter.segment(&cleaned)?;
        let clusters = self.clusterer.cluster(&segmented.objects);

        self.publisher.publish_cloud(CloudTopic::Objects, &segmented.objects);
        self.publisher.publish_cloud(CloudTopic::Table, &segmented.surface);
        self.publisher.publish_cloud(
            CloudTopic::Clusters,
            &self.clusterer.colorize(&segmented.objects, &clusters),
        );

        let mut detections = Vec::with_capacity(clusters.len());
        let mut markers = Vec::with_capacity(clusters.len());

        for (index, cluster) in clusters.iter().enumerate() {
            let cloud = segmented.objects.extract(cluster, false);
            let (Some(first), Some(centroid)) = (cloud.points().first().copied(), cloud.centroid())
            else {
                continue;
            };

            let label = match self.classifier.classify(&cloud) {
                Ok(label) => label,
                Err(e) => {
                    log::warn!("frame {frame}: skipping cluster {index}: {e}");
                    continue;
                }
            };

            let id = detections.len();
            let marker = LabelMarker {
                id,
                text: label.clone(),
                position: [first[0], first[1], first[2] + self.marker_offset],
            };
            self.publisher.publish_marker(&marker);
            markers.push(marker);

            detections.push(DetectedObject {
                id,
                label,
                cloud,
                centroid,
            });
        }

        let scene = Scene {
            frame,
            surface: segmented.surface,
            objects: segmented.objects,
            plane: segmented.plane,
            detections,
            markers,
        };

        log::info!(
            "frame {frame}: detected {} objects: {:?}",
            scene.detections.len(),
            scene.labels()
        );
        self.publisher.publish_detections(&scene.detections);

        Ok(scene)
    }
}
