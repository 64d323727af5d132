use std::path::{Path, PathBuf};
use std::time::Duration;

use tabletop_3d::io::pcd::read_pcd_binary;
use tabletop_3d::pointcloud::PointCloud;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::NodeError;

/// A raw sensor frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Sequence number, starting at zero.
    pub seq: u64,
    /// The captured cloud.
    pub cloud: PointCloud,
}

/// Replays the binary `.pcd` files of a directory, in lexicographic order, at a fixed rate.
#[derive(Debug, Clone)]
pub struct PcdDirectorySource {
    files: Vec<PathBuf>,
    period: Duration,
    looping: bool,
}

impl PcdDirectorySource {
    /// Create a source over every `.pcd` file of `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed, holds no `.pcd` file, or the
    /// rate is not strictly positive.
    pub fn new(dir: impl AsRef<Path>, rate_hz: f64, looping: bool) -> Result<Self, NodeError> {
        let dir = dir.as_ref();
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(NodeError::InvalidRate(rate_hz));
        }

        let io_err = |source| NodeError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "pcd") {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(NodeError::NoFrames(dir.to_path_buf()));
        }
        log::info!("found {} frames in {}", files.len(), dir.display());

        Ok(Self {
            files,
            period: Duration::from_secs_f64(1.0 / rate_hz),
            looping,
        })
    }

    /// The frame files in replay order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Send frames until the files run out, the receiver is gone or `cancel` fires.
    ///
    /// A frame is dropped when the previous one has not been picked up yet. Frames that
    /// cannot be decoded are logged and skipped. Returns the number of frames delivered.
    pub async fn run(
        self,
        frames: mpsc::Sender<Frame>,
        cancel: CancellationToken,
    ) -> Result<u64, NodeError> {
        let mut ticker = tokio::time::interval(self.period);
        let mut seq = 0u64;
        let mut delivered = 0u64;

        'replay: loop {
            for path in &self.files {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'replay,
                    _ = ticker.tick() => {}
                }

                let file = path.clone();
                let decoded = tokio::task::spawn_blocking(move || read_pcd_binary(file)).await?;
                let cloud = match decoded {
                    Ok(cloud) => cloud,
                    Err(e) => {
                        log::warn!("skipping {}: {e}", path.display());
                        continue;
                    }
                };

                match frames.try_send(Frame { seq, cloud }) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(frame)) => {
                        log::debug!("perception busy, dropping frame {}", frame.seq);
                    }
                    Err(TrySendError::Closed(_)) => break 'replay,
                }
                seq += 1;
            }

            if !self.looping {
                break;
            }
        }

        log::info!("frame source stopped after {delivered} of {seq} frames");
        Ok(delivered)
    }
}
