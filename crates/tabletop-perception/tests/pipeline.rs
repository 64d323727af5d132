use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use tabletop_3d::normals::KnnNormalEstimator;
use tabletop_3d::pointcloud::PointCloud;
use tabletop_features::classifier::ObjectClassifier;
use tabletop_features::descriptor::FeatureConfig;
use tabletop_features::model::{LabelEncoder, LinearSvm, Model, StandardScaler, Svm};
use tabletop_perception::config::PerceptionConfig;
use tabletop_perception::pipeline::Perception;
use tabletop_perception::preprocess::Preprocessor;
use tabletop_perception::publisher::{CloudTopic, ScenePublisher};
use tabletop_perception::scene::{DetectedObject, LabelMarker};
use tabletop_perception::segment::Segmenter;
use tabletop_perception::{PerceptionError, SegmentError};

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ScenePublisher for RecordingPublisher {
    fn publish_cloud(&self, topic: CloudTopic, cloud: &PointCloud) {
        self.push(format!("{topic}:{}", cloud.len()));
    }

    fn publish_marker(&self, marker: &LabelMarker) {
        self.push(format!("marker:{}", marker.text));
    }

    fn publish_detections(&self, detections: &[DetectedObject]) {
        self.push(format!("detections:{}", detections.len()));
    }

    fn publish_world_joint(&self, angle: f64) {
        self.push(format!("joint:{angle}"));
    }
}

// red things are soap, blue things are glue
fn hue_model() -> Model {
    let features = FeatureConfig {
        color_bins: 4,
        normal_bins: 2,
        ..Default::default()
    };
    let n = features.len();
    let mut red = vec![0.0; n];
    red[0] = 1.0;
    let mut blue = vec![0.0; n];
    blue[2] = 1.0;
    Model {
        features,
        scaler: StandardScaler {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        },
        classifier: Svm::Linear(LinearSvm {
            coef: vec![red, blue],
            intercept: vec![0.0, 0.0],
        }),
        encoder: LabelEncoder::new(vec!["soap".into(), "glue".into()]),
    }
}

fn add_box(
    points: &mut Vec<[f64; 3]>,
    colors: &mut Vec<[u8; 3]>,
    origin: [f64; 3],
    color: [u8; 3],
) {
    for i in 0..125 {
        points.push([
            origin[0] + (i % 5) as f64 * 0.01,
            origin[1] + ((i / 5) % 5) as f64 * 0.01,
            origin[2] + (i / 25) as f64 * 0.01,
        ]);
        colors.push(color);
    }
}

// a gray table at z = 0.705 with a red and a blue box on it, plus clutter outside the crop box
fn table_scene() -> PointCloud {
    let mut points = Vec::new();
    let mut colors = Vec::new();
    for i in 0..31 {
        for j in 0..31 {
            points.push([0.405 + i as f64 * 0.02, -0.295 + j as f64 * 0.02, 0.705]);
            colors.push([128, 128, 128]);
        }
    }
    add_box(&mut points, &mut colors, [0.605, -0.105, 0.735], [250, 10, 10]);
    add_box(&mut points, &mut colors, [0.605, 0.145, 0.735], [10, 10, 250]);

    // floor and far wall
    points.push([0.7, 0.0, 0.05]);
    colors.push([0, 0, 0]);
    points.push([2.5, 0.0, 0.9]);
    colors.push([0, 0, 0]);

    PointCloud::from_points(points).with_colors(colors)
}

fn test_config() -> PerceptionConfig {
    let mut config = PerceptionConfig::default();
    config.preprocess.outlier.mean_k = 10;
    config.preprocess.outlier.std_dev_mul = 5.0;
    config
}

fn classifier() -> Arc<ObjectClassifier> {
    Arc::new(ObjectClassifier::new(
        Arc::new(hue_model()),
        Arc::new(KnnNormalEstimator::default()),
    ))
}

#[test]
fn detects_and_labels_objects_on_table() -> Result<(), PerceptionError> {
    let publisher = Arc::new(RecordingPublisher::default());
    let perception = Perception::new(&test_config(), classifier(), publisher.clone())?;

    let scene = perception.process(7, &table_scene())?;
    assert_eq!(scene.frame, 7);
    assert_eq!(scene.detections.len(), 2);
    assert_eq!(scene.objects.len(), 250);

    let soap = scene
        .detections
        .iter()
        .find(|d| d.label == "soap")
        .expect("red box is labelled soap");
    assert_relative_eq!(soap.centroid[0], 0.625, epsilon = 1e-6);
    assert_relative_eq!(soap.centroid[1], -0.085, epsilon = 1e-6);
    assert_relative_eq!(soap.centroid[2], 0.755, epsilon = 1e-6);
    assert!(scene.detections.iter().any(|d| d.label == "glue"));

    for (i, (detection, marker)) in scene.detections.iter().zip(&scene.markers).enumerate() {
        assert_eq!(detection.id, i);
        assert_eq!(marker.text, detection.label);
        let first = detection.cloud.points()[0];
        assert_relative_eq!(marker.position[2], first[2] + 0.4, epsilon = 1e-9);
    }

    let events = publisher.events();
    assert_eq!(events[0], "objects:250");
    assert!(events[1].starts_with("table:"));
    assert_eq!(events[2], "clusters:250");
    assert!(events[3].starts_with("marker:"));
    assert!(events[4].starts_with("marker:"));
    assert_eq!(events[5], "detections:2");
    Ok(())
}

#[test]
fn segmentation_partitions_the_cleaned_cloud() -> Result<(), Box<dyn std::error::Error>> {
    let config = test_config();
    let cleaned = Preprocessor::new(config.preprocess.clone())?.clean(&table_scene());
    let result = Segmenter::new(config.segment).segment(&cleaned)?;
    assert_eq!(result.surface.len() + result.objects.len(), cleaned.len());
    assert!(result.surface.colors().is_some());
    Ok(())
}

#[test]
fn classification_is_deterministic() -> Result<(), PerceptionError> {
    let perception = Perception::new(
        &test_config(),
        classifier(),
        Arc::new(tabletop_perception::publisher::NullPublisher),
    )?;
    let first = perception.process(0, &table_scene())?;
    let second = perception.process(1, &table_scene())?;
    assert_eq!(first.labels(), second.labels());
    assert_eq!(first.detections, second.detections);
    Ok(())
}

#[test]
fn empty_frame_has_no_observable_objects() -> Result<(), PerceptionError> {
    let perception = Perception::new(
        &test_config(),
        classifier(),
        Arc::new(tabletop_perception::publisher::NullPublisher),
    )?;
    assert!(matches!(
        perception.process(0, &PointCloud::default()),
        Err(PerceptionError::Segment(SegmentError::InsufficientData { actual: 0, .. }))
    ));
    Ok(())
}
