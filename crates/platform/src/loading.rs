//! Background OBJ loading: one worker per file, results over a channel.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use asset::LoadedMesh;

pub struct LoadedModel {
    pub path: PathBuf,
    pub result: anyhow::Result<LoadedMesh>,
}

/// Pending loads. Polled from the frame loop; never blocks.
pub struct ModelLoader {
    rx: Receiver<LoadedModel>,
    outstanding: usize,
}

impl ModelLoader {
    pub fn spawn(paths: Vec<PathBuf>) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut outstanding = 0;
        for path in paths {
            let tx = tx.clone();
            let name = format!("obj:{}", path.display());
            let spawned = thread::Builder::new().name(name).spawn(move || {
                let result = asset::load_obj_from_path(&path);
                // The receiver is gone only when the viewer is shutting down.
                let _ = tx.send(LoadedModel { path, result });
            });
            match spawned {
                Ok(_) => outstanding += 1,
                Err(err) => log::error!("cannot start OBJ loader thread: {err}"),
            }
        }
        Self { rx, outstanding }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Every load that finished since the last call.
    pub fn drain(&mut self) -> Vec<LoadedModel> {
        let mut finished = Vec::new();
        while self.outstanding > 0 {
            match self.rx.try_recv() {
                Ok(model) => {
                    self.outstanding -= 1;
                    finished.push(model);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.outstanding = 0;
                    break;
                }
            }
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn drain_all(loader: &mut ModelLoader) -> Vec<LoadedModel> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut all = Vec::new();
        while loader.outstanding() > 0 && Instant::now() < deadline {
            all.extend(loader.drain());
            thread::sleep(Duration::from_millis(5));
        }
        all
    }

    #[test]
    fn loads_fixture_in_background() {
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../asset/tests/data/scene.obj");
        let mut loader = ModelLoader::spawn(vec![fixture.clone()]);
        let done = drain_all(&mut loader);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].path, fixture);
        let loaded = done[0].result.as_ref().expect("fixture loads");
        assert_eq!(loaded.mesh.triangle_count(), 5);
    }

    #[test]
    fn missing_file_reports_error() {
        let mut loader = ModelLoader::spawn(vec![PathBuf::from("definitely/missing.obj")]);
        let done = drain_all(&mut loader);
        assert_eq!(done.len(), 1);
        assert!(done[0].result.is_err());
        assert_eq!(loader.outstanding(), 0);
    }
}
