use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

use super::model::save_model;
use super::train::train_model;
use crate::application::ports::TrainerPort;
use crate::config::TrainingConfig;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::training::{TrainingParams, TrainingState, TrainingStatus};

/// Entrenamiento en segundo plano, uno a la vez. Al terminar guarda el modelo en `checkpoint`.
pub struct TrainingJob {
    base: TrainingConfig,
    checkpoint: PathBuf,
    status: Arc<RwLock<TrainingStatus>>,
}

impl TrainingJob {
    pub fn new(base: TrainingConfig, checkpoint: PathBuf) -> Self {
        Self { base, checkpoint, status: Arc::new(RwLock::new(TrainingStatus::default())) }
    }
}

#[async_trait]
impl TrainerPort for TrainingJob {
    async fn start(&self, params: TrainingParams) -> DomainResult<()> {
        {
            let mut status = self
                .status
                .write()
                .map_err(|_| DomainError::OperationFailed("Lock de estado fallido".into()))?;
            if status.is_running() {
                return Err(DomainError::Busy("training already in progress".into()));
            }
            *status = TrainingStatus { status: TrainingState::Training, progress: Some(0.0), ..Default::default() };
        }

        let cfg = self.base.clone().with_params(params);
        let checkpoint = self.checkpoint.clone();
        let status = self.status.clone();

        std::thread::Builder::new()
            .name("training-job".into())
            .spawn(move || run_job(cfg, checkpoint, status))
            .map_err(|e| {
                if let Ok(mut s) = self.status.write() {
                    *s = TrainingStatus::default();
                }
                DomainError::OperationFailed(format!("failed to spawn training thread: {e}"))
            })?;

        info!("🏋️ Entrenamiento lanzado: {} épocas", params.epochs);
        Ok(())
    }

    async fn status(&self) -> DomainResult<TrainingStatus> {
        self.status
            .read()
            .map(|s| s.clone())
            .map_err(|_| DomainError::OperationFailed("Lock de estado fallido".into()))
    }
}

fn run_job(cfg: TrainingConfig, checkpoint: PathBuf, status: Arc<RwLock<TrainingStatus>>) {
    let total = cfg.epochs.max(1) as f32;
    let mut observer = |m: &crate::domain::training::EpochMetrics| {
        if let Ok(mut s) = status.write() {
            s.progress = Some(m.epoch as f32 / total);
            s.metrics = Some(*m);
        }
    };

    let result = train_model(&cfg, &mut observer).and_then(|trained| {
        save_model(trained.model, &checkpoint)?;
        Ok(trained.report)
    });

    let Ok(mut s) = status.write() else {
        error!("Lock de estado envenenado; no se puede publicar el resultado");
        return;
    };
    match result {
        Ok(report) => {
            info!("✅ Entrenamiento completado; modelo guardado en {}", checkpoint.display());
            s.status = TrainingState::Completed;
            s.progress = Some(1.0);
            s.metrics = report.last().copied().or(s.metrics);
        }
        Err(e) => {
            error!("❌ Entrenamiento fallido: {:?}", e);
            s.status = TrainingState::Error;
            s.error = Some(format!("{e:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_job_reports_error_and_can_restart() {
        let dir = tempfile::tempdir().unwrap();
        let base = TrainingConfig {
            train_dir: dir.path().join("missing-train"),
            valid_dir: dir.path().join("missing-valid"),
            ..Default::default()
        };
        let job = TrainingJob::new(base, dir.path().join("model.bin"));
        job.start(TrainingParams::default()).await.unwrap();

        let mut status = job.status().await.unwrap();
        for _ in 0..200 {
            if !status.is_running() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            status = job.status().await.unwrap();
        }
        assert_eq!(status.status, TrainingState::Error);
        assert!(status.error.is_some());

        job.start(TrainingParams::default()).await.unwrap();
    }

    fn write_split(dir: &std::path::Path, count: usize) {
        std::fs::create_dir_all(dir.join("images")).unwrap();
        std::fs::create_dir_all(dir.join("labels")).unwrap();
        for i in 0..count {
            image::RgbImage::from_fn(32, 32, |x, _| image::Rgb([(x * 8) as u8, 60, 120]))
                .save(dir.join("images").join(format!("img_{i}.png")))
                .unwrap();
            std::fs::write(dir.join("labels").join(format!("img_{i}.txt")), "0 0.5 0.5 0.3 0.3\n").unwrap();
        }
    }

    #[tokio::test]
    async fn second_start_while_running_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        write_split(&dir.path().join("train"), 2);
        write_split(&dir.path().join("valid"), 1);
        let base = TrainingConfig {
            train_dir: dir.path().join("train"),
            valid_dir: dir.path().join("valid"),
            input_size: 32,
            grid_size: 2,
            seed: Some(3),
            ..Default::default()
        };
        let job = TrainingJob::new(base, dir.path().join("out").join("model.bin"));
        let params = TrainingParams { epochs: 200, batch_size: 2, learning_rate: 1e-3 };

        job.start(params).await.unwrap();
        assert!(job.status().await.unwrap().is_running());
        assert!(matches!(job.start(params).await, Err(DomainError::Busy(_))));
    }
}
