// THEORY:
// The `parallel_pipeline` runs many independent image pairs through the engine at
// once, e.g. when a whole archive of survey tiles is compared against last year's.
// A single analysis is already pure, so parallelism is only ever across pairs.
//
// Layout:
// 1.  **Dispatcher**: one task owns the inbound job channel and hands jobs to the
//     workers round-robin, each over its own mpsc channel.
// 2.  **Workers**: one task per worker (sized with `num_cpus` by default). The
//     pixel work is CPU-bound, so each job runs on tokio's blocking pool through
//     `spawn_blocking` and never stalls the async executor.
// 3.  **Replies**: every job carries a oneshot sender; the caller awaits its own
//     result and nothing else.
//
// Dropping the `ParallelPipeline` closes the job channel; the dispatcher and the
// workers then drain and exit on their own. Cancelling a caller's future simply
// drops its reply.

use crate::config::AnalysisConfig;
use crate::core_modules::raster::Image;
use crate::error::AnalysisError;
use crate::pipeline::{ChangePipeline, ChangeReport, VisualizationArtifact};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type PairResult = Result<(ChangeReport, VisualizationArtifact), PoolError>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("worker pool is shut down")]
    Closed,

    #[error("analysis worker panicked: {0}")]
    WorkerPanicked(String),
}

struct AnalysisJob {
    before: Image,
    after: Image,
    timestamp: DateTime<Utc>,
    reply: oneshot::Sender<PairResult>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<AnalysisJob>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `size` workers. Must be called inside a tokio runtime.
    pub fn new(pipeline: Arc<ChangePipeline>, size: usize) -> Self {
        let size = size.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<AnalysisJob>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..size)
            .map(|_| mpsc::unbounded_channel::<AnalysisJob>())
            .unzip();

        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(job) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(job)) = worker_senders[worker_idx].send(job) {
                    let _ = job.reply.send(Err(PoolError::Closed));
                }
                worker_idx = (worker_idx + 1) % size;
            }
        });

        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(worker_id, mut worker_receiver)| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    while let Some(job) = worker_receiver.recv().await {
                        debug!(worker_id, "picked up analysis job");
                        let result = Self::process_job(Arc::clone(&pipeline), job.before, job.after, job.timestamp).await;
                        if job.reply.send(result).is_err() {
                            debug!(worker_id, "caller dropped before the result was ready");
                        }
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            dispatcher,
            workers,
        }
    }

    async fn process_job(
        pipeline: Arc<ChangePipeline>,
        before: Image,
        after: Image,
        timestamp: DateTime<Utc>,
    ) -> PairResult {
        match tokio::task::spawn_blocking(move || pipeline.generate_report(&before, &after, timestamp)).await {
            Ok(result) => result.map_err(PoolError::from),
            Err(join_error) => {
                warn!(%join_error, "analysis job did not complete");
                Err(PoolError::WorkerPanicked(join_error.to_string()))
            }
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub async fn submit(&self, before: Image, after: Image, timestamp: DateTime<Utc>) -> PairResult {
        let (reply, result_receiver) = oneshot::channel();
        self.task_sender
            .send(AnalysisJob {
                before,
                after,
                timestamp,
                reply,
            })
            .map_err(|_| PoolError::Closed)?;
        result_receiver.await.map_err(|_| PoolError::Closed)?
    }

    /// Closes the job channel and waits for every queued job to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Analyzes many image pairs concurrently with one shared configuration.
pub struct ParallelPipeline {
    pipeline: Arc<ChangePipeline>,
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    /// One worker per logical CPU.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        Self::with_workers(config, num_cpus::get())
    }

    /// Validates `config` up front, then spawns `workers` workers (at least one).
    pub fn with_workers(config: AnalysisConfig, workers: usize) -> Result<Self, AnalysisError> {
        let pipeline = Arc::new(ChangePipeline::new(config)?);
        let worker_pool = WorkerPool::new(Arc::clone(&pipeline), workers);
        debug!(workers = worker_pool.size(), "started parallel change pipeline");
        Ok(Self { pipeline, worker_pool })
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.pipeline.config()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.size()
    }

    pub async fn analyze_pair(&self, before: Image, after: Image) -> PairResult {
        self.analyze_pair_at(before, after, Utc::now()).await
    }

    pub async fn analyze_pair_at(&self, before: Image, after: Image, timestamp: DateTime<Utc>) -> PairResult {
        self.worker_pool.submit(before, after, timestamp).await
    }

    /// Runs every pair and returns the results in input order. One failing pair
    /// does not affect the others.
    pub async fn analyze_batch(&self, pairs: Vec<(Image, Image)>) -> Vec<PairResult> {
        let jobs = pairs
            .into_iter()
            .map(|(before, after)| self.analyze_pair(before, after));
        join_all(jobs).await
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorSpace;

    fn gray(width: u32, height: u32, value: u8) -> Image {
        Image::from_gray_u8(width, height, &vec![value; (width * height) as usize]).unwrap()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            threshold: Some(0.5),
            color_space: ColorSpace::Grayscale,
            morphology_kernel_size: 1,
            alignment_max_shift: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn batch_results_keep_input_order() {
        let pipeline = ParallelPipeline::with_workers(config(), 3).unwrap();
        let pairs = vec![
            (gray(4, 4, 0), gray(4, 4, 255)),
            (gray(6, 2, 10), gray(6, 2, 10)),
            (gray(3, 5, 0), gray(3, 5, 255)),
            (gray(2, 2, 7), gray(2, 2, 7)),
        ];
        let results = pipeline.analyze_batch(pairs).await;
        let shapes: Vec<(u32, u32, usize)> = results
            .into_iter()
            .map(|r| {
                let (report, _) = r.unwrap();
                (report.width, report.height, report.total_changed_pixels)
            })
            .collect();
        assert_eq!(shapes, vec![(4, 4, 16), (6, 2, 0), (3, 5, 15), (2, 2, 0)]);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn one_bad_pair_does_not_poison_the_batch() {
        let pipeline = ParallelPipeline::with_workers(config(), 2).unwrap();
        let results = pipeline
            .analyze_batch(vec![(gray(0, 0, 0), gray(2, 2, 0)), (gray(2, 2, 0), gray(2, 2, 255))])
            .await;
        assert!(matches!(results[0], Err(PoolError::Analysis(AnalysisError::Dimension(_)))));
        assert_eq!(results[1].as_ref().unwrap().0.total_changed_pixels, 4);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_spawning() {
        let bad = AnalysisConfig {
            threshold: Some(1.5),
            ..Default::default()
        };
        assert!(matches!(
            ParallelPipeline::with_workers(bad, 2),
            Err(AnalysisError::Config { field: "threshold", .. })
        ));
    }

    #[tokio::test]
    async fn matches_the_sequential_pipeline() {
        let timestamp = DateTime::<Utc>::UNIX_EPOCH;
        let before = gray(5, 5, 20);
        let after = gray(5, 5, 220);
        let expected = crate::pipeline::analyze_at(&before, &after, &config(), timestamp).unwrap();

        let pipeline = ParallelPipeline::with_workers(config(), 1).unwrap();
        assert_eq!(pipeline.worker_count(), 1);
        let actual = pipeline.analyze_pair_at(before, after, timestamp).await.unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn default_pool_uses_every_cpu() {
        let pipeline = ParallelPipeline::new(AnalysisConfig::default()).unwrap();
        assert_eq!(pipeline.worker_count(), num_cpus::get().max(1));
    }
}
