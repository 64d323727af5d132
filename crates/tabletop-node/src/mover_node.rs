use tabletop_perception::scene::Scene;
use tabletop_pickplace::orchestrator::Orchestrator;
use tabletop_pickplace::service::PickPlaceService;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Run a pick pass for every scene received, until the scenes run out, `cancel` fires or
/// `max_passes` passes are done. Reaching `max_passes` cancels `cancel` so the rest of the
/// node winds down too.
///
/// Returns the number of passes run.
pub async fn run<S: PickPlaceService>(
    mut orchestrator: Orchestrator<S>,
    mut scenes: mpsc::Receiver<Scene>,
    cancel: CancellationToken,
    max_passes: Option<usize>,
) -> usize {
    let mut passes = 0;

    while max_passes.map_or(true, |max| passes < max) {
        let scene = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            scene = scenes.recv() => match scene {
                Some(scene) => scene,
                None => break,
            },
        };

        log::info!(
            "starting pass {passes} on frame {} with {} detections",
            scene.frame,
            scene.detections.len()
        );
        let report = orchestrator.run_pass(&scene, &cancel).await;
        passes += 1;

        if let Some(e) = &report.write_error {
            log::error!("records of pass {passes} were not saved: {e}");
        }
        if report.cancelled {
            break;
        }
    }

    if max_passes.is_some_and(|max| passes >= max) {
        log::info!("reached {passes} passes, shutting down");
        cancel.cancel();
    }
    passes
}
