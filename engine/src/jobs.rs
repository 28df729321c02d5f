//! Job queue and worker pool
//!
//! Simulation runs execute as jobs: submissions enter a FIFO queue, a
//! bounded pool of worker threads drains it, and a shared registry records
//! status transitions (queued → running → succeeded/failed). A job
//! cancelled while still queued is skipped by the worker that dequeues it;
//! an in-flight run is never interrupted. Each run owns its state, so
//! the registry mutex is the only shared resource.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use thiserror::Error;
use uuid::Uuid;

use crate::digest::result_digest;
use crate::engine::stepper::{Simulation, SimulationSummary};
use crate::models::SimulationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Registry entry for one submitted job
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    pub config: SimulationConfig,
    /// Identifier of the stored run, set on success
    pub run_id: Option<Uuid>,
    pub summary: Option<SimulationSummary>,
    pub result_digest: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job manager is stopped")]
    Stopped,

    #[error("unknown job: {0}")]
    UnknownJob(Uuid),
}

/// Successful run artifacts handed back to the registry
struct RunOutcome {
    run_id: Uuid,
    summary: SimulationSummary,
    digest: String,
}

type Registry = Arc<Mutex<HashMap<Uuid, JobRecord>>>;

/// FIFO job queue with a fixed-size worker pool
///
/// # Example
///
/// ```no_run
/// use supply_simulator_core_rs::jobs::{JobManager, JobStatus};
/// use supply_simulator_core_rs::models::SimulationConfig;
///
/// let mut manager = JobManager::new(4);
/// manager.start();
/// let job_id = manager.submit(SimulationConfig::default()).unwrap();
/// // ... poll status(job_id) until Succeeded or Failed ...
/// manager.stop();
/// ```
pub struct JobManager {
    worker_count: usize,
    sender: Option<Sender<Uuid>>,
    receiver: Option<Arc<Mutex<Receiver<Uuid>>>>,
    workers: Vec<JoinHandle<()>>,
    registry: Registry,
}

impl JobManager {
    /// Build a manager with `worker_count` threads; call [`start`] to spawn
    /// them
    ///
    /// [`start`]: JobManager::start
    pub fn new(worker_count: usize) -> Self {
        let (sender, receiver) = channel();
        Self {
            worker_count,
            sender: Some(sender),
            receiver: Some(Arc::new(Mutex::new(receiver))),
            workers: Vec::new(),
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawn the worker threads
    pub fn start(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        for _ in 0..self.worker_count {
            let receiver = Arc::clone(&receiver);
            let registry = Arc::clone(&self.registry);
            self.workers.push(std::thread::spawn(move || {
                worker_loop(receiver, registry);
            }));
        }
    }

    /// Enqueue a configuration for execution, returning the job id
    pub fn submit(&self, config: SimulationConfig) -> Result<Uuid, JobError> {
        let sender = self.sender.as_ref().ok_or(JobError::Stopped)?;
        let id = Uuid::new_v4();
        let record = JobRecord {
            id,
            status: JobStatus::Queued,
            config,
            run_id: None,
            summary: None,
            result_digest: None,
            error: None,
        };
        self.registry
            .lock()
            .expect("job registry lock poisoned")
            .insert(id, record);
        sender.send(id).map_err(|_| JobError::Stopped)?;
        Ok(id)
    }

    /// Cancel a queued job; returns `false` when the job already left the
    /// queued state (running jobs are not interrupted)
    pub fn cancel(&self, id: Uuid) -> Result<bool, JobError> {
        let mut registry = self.registry.lock().expect("job registry lock poisoned");
        let record = registry.get_mut(&id).ok_or(JobError::UnknownJob(id))?;
        if record.status == JobStatus::Queued {
            record.status = JobStatus::Cancelled;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Current registry entry for a job
    pub fn status(&self, id: Uuid) -> Option<JobRecord> {
        self.registry
            .lock()
            .expect("job registry lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Close the queue and wait for in-flight jobs to finish
    pub fn stop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Uuid>>>, registry: Registry) {
    loop {
        let job_id = {
            let guard = receiver.lock().expect("job queue lock poisoned");
            match guard.recv() {
                Ok(id) => id,
                // Sender dropped: the manager is stopping.
                Err(_) => break,
            }
        };

        // Claim the job; anything no longer queued (cancelled, or claimed
        // by a concurrent duplicate send) is skipped.
        let config = {
            let mut guard = registry.lock().expect("job registry lock poisoned");
            match guard.get_mut(&job_id) {
                Some(record) if record.status == JobStatus::Queued => {
                    record.status = JobStatus::Running;
                    Some(record.config.clone())
                }
                _ => None,
            }
        };
        let Some(config) = config else {
            continue;
        };

        let outcome = execute_run(config);
        let mut guard = registry.lock().expect("job registry lock poisoned");
        if let Some(record) = guard.get_mut(&job_id) {
            match outcome {
                Ok(run) => {
                    record.status = JobStatus::Succeeded;
                    record.run_id = Some(run.run_id);
                    record.summary = Some(run.summary);
                    record.result_digest = Some(run.digest);
                }
                Err(error) => {
                    record.status = JobStatus::Failed;
                    record.error = Some(error);
                }
            }
        }
    }
}

/// One synchronous engine invocation, reconciled before it counts as done
fn execute_run(config: SimulationConfig) -> Result<RunOutcome, String> {
    let mut simulation = Simulation::new(config).map_err(|e| e.to_string())?;
    let (snapshots, profit_loss) = simulation.run();
    simulation
        .assert_pl_equals_trace_totals()
        .map_err(|e| e.to_string())?;
    let digest = result_digest(&snapshots, &profit_loss).map_err(|e| e.to_string())?;
    Ok(RunOutcome {
        run_id: Uuid::new_v4(),
        summary: simulation.compute_summary(),
        digest,
    })
}
