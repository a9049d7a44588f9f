use facegate_core::{DetectedFace, ExtractError, ExtractMode, FaceExtractor};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending requests per worker before senders wait.
const QUEUE_DEPTH_PER_WORKER: usize = 4;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("extraction worker panicked")]
    WorkerPanicked,
    #[error("engine has no workers")]
    NoWorkers,
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Message sent from request handlers to the engine threads.
struct EngineRequest {
    image: Vec<u8>,
    mode: ExtractMode,
    reply: oneshot::Sender<Result<Vec<DetectedFace>, EngineError>>,
}

/// Clone-safe handle to the engine worker pool.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    workers: usize,
}

impl EngineHandle {
    /// Run face extraction on one of the workers.
    pub async fn extract(&self, image: Vec<u8>, mode: ExtractMode) -> Result<Vec<DetectedFace>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest {
                image,
                mode,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

/// Spawn one dedicated OS thread per extractor.
///
/// Inference sessions need exclusive access while running, so each thread
/// owns its extractor and pulls requests from a shared queue.
pub fn spawn_engine(extractors: Vec<Box<dyn FaceExtractor>>) -> Result<EngineHandle, EngineError> {
    if extractors.is_empty() {
        return Err(EngineError::NoWorkers);
    }

    let workers = extractors.len();
    let (tx, rx) = mpsc::channel::<EngineRequest>(workers * QUEUE_DEPTH_PER_WORKER);
    let queue = Arc::new(Mutex::new(rx));

    for (id, extractor) in extractors.into_iter().enumerate() {
        let queue = Arc::clone(&queue);
        std::thread::Builder::new()
            .name(format!("facegate-engine-{id}"))
            .spawn(move || run_worker(id, extractor, queue))?;
    }

    tracing::info!(workers, "extraction engine started");
    Ok(EngineHandle { tx, workers })
}

fn run_worker(
    id: usize,
    mut extractor: Box<dyn FaceExtractor>,
    queue: Arc<Mutex<mpsc::Receiver<EngineRequest>>>,
) {
    tracing::debug!(worker = id, "engine worker started");
    loop {
        // Hold the lock only while waiting for the next request.
        let next = {
            let mut rx = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rx.blocking_recv()
        };
        let Some(req) = next else {
            break;
        };

        let reply = match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(&req.image, req.mode))) {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => {
                tracing::error!(worker = id, "extraction panicked; frame dropped");
                Err(EngineError::WorkerPanicked)
            }
        };
        let _ = req.reply.send(reply);
    }
    tracing::debug!(worker = id, "engine worker exiting");
}
