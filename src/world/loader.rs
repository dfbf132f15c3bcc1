//! Background job dispatch with main-thread delivery
//!
//! Heavy work (height maps, meshes) runs on worker threads. Finished results
//! are parked in a mutex-guarded FIFO together with their completion callback;
//! the owning thread calls [`DataRequester::drain`] once per tick and every
//! callback runs there, in the order results arrived. That keeps all mutation
//! of chunk state on a single thread.
//!
//! Jobs are never cancelled. A callback whose target no longer cares about
//! the result is expected to check and ignore it.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Sender, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::utils::settings::Dispatch;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A finished job waiting for the consumer thread
type Delivery<C> = Box<dyn FnOnce(&mut C, &DataRequester<C>) + Send + 'static>;

/// Work description: what to compute off-thread and how to apply the result
pub struct Job<T, C> {
    compute: Box<dyn FnOnce() -> T + Send + 'static>,
    on_complete: Box<dyn FnOnce(T, &mut C, &DataRequester<C>) + Send + 'static>,
}

impl<T, C> Job<T, C> {
    pub fn new<F, D>(compute: F, on_complete: D) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        D: FnOnce(T, &mut C, &DataRequester<C>) + Send + 'static,
    {
        Job {
            compute: Box::new(compute),
            on_complete: Box::new(on_complete),
        }
    }
}

struct QueueState<C> {
    results: VecDeque<Delivery<C>>,
    in_flight: usize,
}

struct Shared<C> {
    state: Mutex<QueueState<C>>,
    finished: Condvar,
}

enum Executor {
    ThreadPerJob,
    Pool { task_tx: Sender<Task>, workers: usize },
}

/// Runs jobs off-thread and hands their results back to the thread that drains it.
/// `C` is the state completion callbacks are applied to.
pub struct DataRequester<C> {
    shared: Arc<Shared<C>>,
    executor: Executor,
    submitted: AtomicU64,
}

impl<C: 'static> DataRequester<C> {
    pub fn new(dispatch: Dispatch) -> Self {
        let executor = match dispatch {
            Dispatch::ThreadPerJob => Executor::ThreadPerJob,
            Dispatch::Pool(count) => Self::spawn_pool(count.max(1)),
        };
        tracing::debug!("Data requester started with {:?}", dispatch);

        DataRequester {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    results: VecDeque::new(),
                    in_flight: 0,
                }),
                finished: Condvar::new(),
            }),
            executor,
            submitted: AtomicU64::new(0),
        }
    }

    fn spawn_pool(num_workers: usize) -> Executor {
        let (task_tx, task_rx) = unbounded::<Task>();
        let mut workers = 0;

        for worker_id in 0..num_workers {
            let rx = task_rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("terrain-worker-{}", worker_id))
                .spawn(move || {
                    // Exits once the requester (and its sender) is dropped
                    while let Ok(task) = rx.recv() {
                        task();
                    }
                });
            match spawned {
                Ok(_) => workers += 1,
                Err(e) => tracing::error!("Failed to spawn terrain worker {}: {}", worker_id, e),
            }
        }

        if workers == 0 {
            tracing::warn!("No terrain workers available, falling back to one thread per job");
            return Executor::ThreadPerJob;
        }

        Executor::Pool { task_tx, workers }
    }

    /// Queue `compute` to run off-thread; `on_complete` runs on the next drain after it finishes
    pub fn request_data<T, F, D>(&self, compute: F, on_complete: D)
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        D: FnOnce(T, &mut C, &DataRequester<C>) + Send + 'static,
    {
        self.submit(Job::new(compute, on_complete));
    }

    pub fn submit<T: Send + 'static>(&self, job: Job<T, C>) {
        let job_id = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        self.shared.state.lock().in_flight += 1;

        let shared = Arc::clone(&self.shared);
        let Job {
            compute,
            on_complete,
        } = job;

        let task: Task = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(compute));

            let mut state = shared.state.lock();
            state.in_flight -= 1;
            match outcome {
                Ok(result) => {
                    state.results.push_back(Box::new(move |ctx, requester| {
                        on_complete(result, ctx, requester)
                    }));
                }
                Err(_) => tracing::error!("Terrain job {} panicked, result dropped", job_id),
            }
            drop(state);
            shared.finished.notify_all();
        });

        self.dispatch(task, job_id);
    }

    fn dispatch(&self, task: Task, job_id: u64) {
        match &self.executor {
            Executor::Pool { task_tx, .. } => {
                if let Err(err) = task_tx.send(task) {
                    // All workers are gone, keep the delivery promise anyway
                    tracing::warn!("Terrain pool closed, running job {} inline", job_id);
                    (err.into_inner())();
                }
            }
            Executor::ThreadPerJob => {
                let slot = Arc::new(Mutex::new(Some(task)));
                let thread_slot = Arc::clone(&slot);
                let spawned = thread::Builder::new()
                    .name(format!("terrain-job-{}", job_id))
                    .spawn(move || {
                        let task = thread_slot.lock().take();
                        if let Some(task) = task {
                            task();
                        }
                    });
                if let Err(e) = spawned {
                    tracing::warn!("Failed to spawn thread for job {}: {}, running inline", job_id, e);
                    let task = slot.lock().take();
                    if let Some(task) = task {
                        task();
                    }
                }
            }
        }
    }

    /// Apply every result that arrived before this call, in arrival order.
    /// Results that arrive while callbacks run wait for the next drain.
    /// Returns the number of callbacks invoked.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let batch: Vec<Delivery<C>> = {
            let mut state = self.shared.state.lock();
            state.results.drain(..).collect()
        };

        let delivered = batch.len();
        for delivery in batch {
            delivery(ctx, self);
        }
        if delivered > 0 {
            tracing::trace!("Delivered {} terrain job results", delivered);
        }
        delivered
    }

    /// Jobs submitted but not yet finished computing
    pub fn in_flight(&self) -> usize {
        self.shared.state.lock().in_flight
    }

    /// Finished results waiting for the next drain
    pub fn queued(&self) -> usize {
        self.shared.state.lock().results.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.in_flight == 0 && state.results.is_empty()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> Option<usize> {
        match &self.executor {
            Executor::Pool { workers, .. } => Some(*workers),
            Executor::ThreadPerJob => None,
        }
    }

    /// Block until every submitted job has finished computing.
    /// Results stay queued until drained.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        while state.in_flight > 0 {
            self.shared.finished.wait(&mut state);
        }
    }

    /// Block until at least one result is queued or nothing is in flight
    pub fn wait_for_result(&self) {
        let mut state = self.shared.state.lock();
        while state.results.is_empty() && state.in_flight > 0 {
            self.shared.finished.wait(&mut state);
        }
    }

    /// Drain repeatedly until no job is in flight and nothing is queued,
    /// including jobs submitted by callbacks along the way.
    pub fn settle(&self, ctx: &mut C) -> usize {
        let mut delivered = 0;
        loop {
            self.wait_for_result();
            let batch = self.drain(ctx);
            delivered += batch;
            if batch == 0 && self.is_idle() {
                return delivered;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn drains_in_submission_order_when_jobs_finish_in_order() {
        let requester: DataRequester<Vec<usize>> = DataRequester::new(Dispatch::Pool(1));
        for i in 0..16 {
            requester.request_data(move || i * 10, |value, log, _| log.push(value));
        }

        requester.wait_idle();
        let mut log = Vec::new();
        assert_eq!(requester.drain(&mut log), 16);
        assert_eq!(log, (0..16).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn nothing_is_delivered_before_drain() {
        let requester: DataRequester<Vec<u32>> = DataRequester::new(Dispatch::ThreadPerJob);
        requester.request_data(|| 7u32, |v, log, _| log.push(v));
        requester.wait_idle();
        assert_eq!(requester.queued(), 1);
        assert_eq!(requester.in_flight(), 0);

        let mut log = Vec::new();
        requester.drain(&mut log);
        assert_eq!(log, vec![7]);
        assert!(requester.is_idle());
    }

    #[test]
    fn each_drain_delivers_only_what_arrived_before_it() {
        let requester: DataRequester<Vec<&'static str>> =
            DataRequester::new(Dispatch::ThreadPerJob);
        let mut log = Vec::new();

        requester.request_data(|| "first", |v, log, _| log.push(v));
        requester.wait_idle();

        let gate = Arc::new(Barrier::new(2));
        let job_gate = Arc::clone(&gate);
        requester.request_data(
            move || {
                job_gate.wait();
                "second"
            },
            |v, log, _| log.push(v),
        );

        assert_eq!(requester.drain(&mut log), 1);
        assert_eq!(log, vec!["first"]);

        gate.wait();
        requester.wait_idle();
        assert_eq!(requester.drain(&mut log), 1);
        assert_eq!(log, vec!["first", "second"]);
    }

    #[test]
    fn out_of_order_completion_is_delivered_in_arrival_order() {
        let requester: DataRequester<Vec<u8>> = DataRequester::new(Dispatch::ThreadPerJob);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        requester.request_data(
            move || {
                release_rx.recv().ok();
                1u8
            },
            |v, log, _| log.push(v),
        );
        requester.request_data(|| 2u8, |v, log, _| log.push(v));

        requester.wait_for_result();
        release_tx.send(()).unwrap();
        requester.wait_idle();

        let mut log = Vec::new();
        requester.drain(&mut log);
        assert_eq!(log, vec![2, 1]);
    }

    #[test]
    fn callbacks_can_submit_follow_up_jobs() {
        let requester: DataRequester<Vec<u32>> = DataRequester::new(Dispatch::Pool(2));
        requester.request_data(
            || 1u32,
            |v, log, requester| {
                log.push(v);
                requester.request_data(move || v + 1, |v, log, _| log.push(v));
            },
        );

        let mut log = Vec::new();
        assert_eq!(requester.settle(&mut log), 2);
        assert_eq!(log, vec![1, 2]);
        assert_eq!(requester.submitted(), 2);
    }

    #[test]
    fn panicking_job_does_not_wedge_the_queue() {
        let requester: DataRequester<Vec<u32>> = DataRequester::new(Dispatch::Pool(1));
        requester.request_data(|| -> u32 { panic!("boom") }, |v, log, _| log.push(v));
        requester.request_data(|| 3u32, |v, log, _| log.push(v));

        let mut log = Vec::new();
        requester.settle(&mut log);
        assert_eq!(log, vec![3]);
    }
}
