use std::sync::Arc;

use tabletop_perception::pipeline::Perception;
use tabletop_perception::scene::Scene;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::frame_source::Frame;
use crate::NodeError;

/// Turn frames into scenes, one frame at a time, until the frames run out or `cancel` fires.
///
/// Processing runs on the blocking pool. Frames without detections are not forwarded, and a
/// scene is dropped when the mover is still busy with the previous one.
/// Returns the number of scenes forwarded.
pub async fn run(
    perception: Arc<Perception>,
    mut frames: mpsc::Receiver<Frame>,
    scenes: mpsc::Sender<Scene>,
    cancel: CancellationToken,
) -> Result<u64, NodeError> {
    let mut forwarded = 0u64;

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let seq = frame.seq;
        let pipeline = perception.clone();
        let processed =
            tokio::task::spawn_blocking(move || pipeline.process(frame.seq, &frame.cloud)).await?;
        let scene = match processed {
            Ok(scene) => scene,
            Err(e) => {
                log::warn!("frame {seq}: {e}, no objects observable");
                continue;
            }
        };

        if scene.detections.is_empty() {
            log::debug!("frame {seq}: nothing to pick");
            continue;
        }

        match scenes.try_send(scene) {
            Ok(()) => forwarded += 1,
            Err(TrySendError::Full(scene)) => {
                log::debug!("mover busy, dropping scene {}", scene.frame);
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }

    log::info!("perception stopped after forwarding {forwarded} scenes");
    Ok(forwarded)
}
