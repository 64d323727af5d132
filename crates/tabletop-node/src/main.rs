use argh::FromArgs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tabletop_3d::normals::KnnNormalEstimator;
use tabletop_features::{classifier::ObjectClassifier, model::Model};
use tabletop_node::{
    config::NodeConfig, frame_source::PcdDirectorySource, log_publisher::LogPublisher,
    mover_node, perception_node, rerun_publisher::RerunPublisher,
    simulated_service::SimulatedPickPlaceService, NodeError,
};
use tabletop_perception::{pipeline::Perception, publisher::ScenePublisher};
use tabletop_pickplace::{config::PickPlaceParams, orchestrator::Orchestrator};

#[derive(FromArgs)]
/// Tabletop perception and pick-place node
struct Args {
    /// path to the trained model (.json)
    #[argh(option, short = 'm')]
    model: PathBuf,

    /// path to the pick list (.yaml)
    #[argh(option, short = 'p')]
    pick_list: PathBuf,

    /// path to the dropbox parameters (.yaml)
    #[argh(option, short = 'd')]
    dropbox: PathBuf,

    /// path to the node configuration (.yaml)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// directory of .pcd frames to replay
    #[argh(option, short = 'f')]
    frames: Option<PathBuf>,

    /// where to write the pick records (.yaml)
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// frames per second
    #[argh(option, short = 'r')]
    rate: Option<f64>,

    /// replay the frames forever
    #[argh(switch, short = 'l')]
    looping: bool,

    /// stop after this many pick passes
    #[argh(option, short = 'n')]
    max_passes: Option<usize>,

    /// test scene number sent with every request
    #[argh(option, short = 's')]
    scene_id: Option<u32>,

    /// seconds to wait after each homing command
    #[argh(option)]
    dwell: Option<f64>,

    /// seconds the simulated pick-place service takes per request
    #[argh(option)]
    latency: Option<f64>,

    /// stream clouds and labels to the rerun viewer
    #[argh(switch)]
    rerun: bool,
}

impl Args {
    fn apply(&self, config: &mut NodeConfig) {
        if let Some(frames) = &self.frames {
            config.source.frames_dir = Some(frames.clone());
        }
        if let Some(rate) = self.rate {
            config.source.rate_hz = rate;
        }
        if self.looping {
            config.source.looping = true;
        }
        if let Some(output) = &self.output {
            config.pickplace.output_path = Some(output.clone());
        }
        if let Some(max_passes) = self.max_passes {
            config.max_passes = Some(max_passes);
        }
        if let Some(scene_id) = self.scene_id {
            config.pickplace.scene_id = scene_id;
        }
        if let Some(dwell) = self.dwell {
            config.pickplace.dwell_secs = dwell;
        }
        if let Some(latency) = self.latency {
            config.service.latency_secs = latency;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => NodeConfig::from_yaml_file(path)?,
        None => NodeConfig::default(),
    };
    args.apply(&mut config);

    // everything below must load before any frame is processed
    let model = Model::from_json_file(&args.model)?;
    config.check_features(&model.features)?;
    log::info!("model classes: {:?}", model.encoder.classes());

    let params = PickPlaceParams::load(&args.pick_list, &args.dropbox)?;
    for issue in params.validate() {
        log::warn!("{issue}");
    }

    let frames_dir = config
        .source
        .frames_dir
        .clone()
        .ok_or(NodeError::MissingFramesDir)?;
    let source =
        PcdDirectorySource::new(&frames_dir, config.source.rate_hz, config.source.looping)?;

    let publisher: Arc<dyn ScenePublisher> = if args.rerun {
        let rec = rerun::RecordingStreamBuilder::new("Tabletop Pick and Place").spawn()?;
        Arc::new(RerunPublisher::new(rec))
    } else {
        Arc::new(LogPublisher)
    };

    let classifier = Arc::new(ObjectClassifier::new(
        Arc::new(model),
        Arc::new(KnnNormalEstimator::new(config.perception.normals.clone())),
    ));
    let perception = Arc::new(Perception::new(
        &config.perception,
        classifier,
        publisher.clone(),
    )?);
    let orchestrator = Orchestrator::new(
        config.pickplace.clone(),
        params,
        SimulatedPickPlaceService::new(config.service.clone()),
        publisher,
    );

    // create the cancellation token
    let cancel = CancellationToken::new();

    ctrlc::set_handler({
        let cancel = cancel.clone();
        move || {
            log::info!("Received Ctrl+C, shutting down gracefully...");
            cancel.cancel();
        }
    })?;

    // a busy stage drops new work instead of queueing it
    let (frame_tx, frame_rx) = mpsc::channel(1);
    let (scene_tx, scene_rx) = mpsc::channel(1);

    let source_task = tokio::spawn(source.run(frame_tx, cancel.clone()));
    let perception_task = tokio::spawn(perception_node::run(
        perception,
        frame_rx,
        scene_tx,
        cancel.clone(),
    ));
    let mover_task = tokio::spawn(mover_node::run(
        orchestrator,
        scene_rx,
        cancel.clone(),
        config.max_passes,
    ));

    let frames = source_task.await??;
    let scenes = perception_task.await??;
    let passes = mover_task.await?;

    log::info!("done: {frames} frames, {scenes} scenes, {passes} pick passes");

    Ok(())
}
