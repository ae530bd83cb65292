// THEORY:
// The `EdgeWorkerPool` traces many clusters at once. Outlining is CPU-bound and
// every cluster is independent, so the work spreads across a fixed set of
// tokio workers, one per core.
//
// Key architectural principles:
// 1.  **Shared Immutable Snapshot**: Tasks carry an `Arc<Blueprint>`. Workers
//     only read it, so any number of them can trace from the same snapshot
//     while the live blueprint stays free for its single writer.
// 2.  **Dispatcher + Workers**: One dispatcher task hands incoming tasks to the
//     workers round-robin over unbounded channels. Each worker owns its own
//     `BoundaryTracer` and reuses it across tasks.
// 3.  **Ordered Replies**: Every task carries a `oneshot` sender. Callers await
//     the replies with `join_all`, which preserves submission order, so the
//     result list is in group order and identical to the sequential
//     `BlueprintEditor::clustering_edges`.
//
// A pool must be created inside a tokio runtime. Dropping it closes the task
// channel and the workers wind down on their own.

use crate::config::EditorConfig;
use crate::core_modules::blueprint::Blueprint;
use crate::core_modules::blueprint_editor::outline_group;
use crate::core_modules::boundary_tracer::boundary_tracer::BoundaryTracer;
use crate::core_modules::clustering::{CategoryFilter, Clustering, Connectivity};
use crate::core_modules::clustering_edges::ClusteringEdges;
use crate::error::{BlueprintError, BlueprintResult};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

type OutlineReply = BlueprintResult<Vec<ClusteringEdges>>;

/// One cluster to outline.
pub struct OutlineTask {
    pub snapshot: Arc<Blueprint>,
    pub members: Vec<usize>,
    pub result_sender: oneshot::Sender<OutlineReply>,
}

pub struct EdgeWorkerPool {
    task_sender: mpsc::UnboundedSender<OutlineTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl EdgeWorkerPool {
    /// One worker per logical CPU.
    pub fn new(small_corner_tolerance: Option<(f64, f64)>) -> Self {
        Self::with_workers(num_cpus::get(), small_corner_tolerance)
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.small_corner_tolerance)
    }

    pub fn with_workers(worker_count: usize, small_corner_tolerance: Option<(f64, f64)>) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<OutlineTask>();
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<OutlineTask>())
            .unzip();

        // Dispatcher
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        let mut workers = Vec::with_capacity(worker_count);
        for mut worker_receiver in worker_receivers {
            let worker = tokio::spawn(async move {
                let mut tracer = BoundaryTracer::new();
                while let Some(task) = worker_receiver.recv().await {
                    let grid = task.snapshot.grid().as_ref();
                    let reply = outline_group(
                        &mut tracer,
                        grid,
                        task.snapshot.categories(),
                        &task.members,
                        small_corner_tolerance,
                    );
                    let _ = task.result_sender.send(reply);
                }
            });
            workers.push(worker);
        }

        debug!(workers = worker_count, "edge worker pool started");
        Self { task_sender, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Outlines one cluster of `snapshot`.
    pub async fn outline(&self, snapshot: Arc<Blueprint>, members: Vec<usize>) -> OutlineReply {
        let (result_sender, result_receiver) = oneshot::channel();
        let task = OutlineTask {
            snapshot,
            members,
            result_sender,
        };
        self.task_sender
            .send(task)
            .map_err(|_| BlueprintError::WorkerPool("failed to send task to worker pool"))?;
        result_receiver
            .await
            .map_err(|_| BlueprintError::WorkerPool("failed to receive result from worker"))?
    }

    /// Parallel `BlueprintEditor::clustering_edges` over a snapshot. The first
    /// failing cluster's error is returned.
    pub async fn clustering_edges(&self, snapshot: Arc<Blueprint>, filter: CategoryFilter) -> OutlineReply {
        let clustering = Clustering::find(
            snapshot.grid().as_ref(),
            snapshot.categories(),
            filter,
            Connectivity::Four,
        )?;
        let groups = clustering.groups();
        let replies = join_all(
            groups
                .iter()
                .map(|&group| self.outline(snapshot.clone(), clustering.members(group))),
        )
        .await;

        let mut out = Vec::with_capacity(replies.len());
        for reply in replies {
            out.extend(reply?);
        }
        debug!(?filter, groups = groups.len(), outlines = out.len(), "parallel outline complete");
        Ok(out)
    }

    /// Closes the task channel and waits for every worker to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}
