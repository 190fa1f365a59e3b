//! Deduplicating, per-key serialized work queue.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio_util::time::{delay_queue, DelayQueue};

/// Instructions for the queue's timer task.
enum Timer<K> {
    Schedule { key: K, schedule: u64, delay: Duration },
    Cancel(K),
}

struct State<K> {
    ready: VecDeque<K>,
    /// Keys in `ready`.
    queued: HashSet<K>,
    /// Keys handed to a worker and not yet marked done.
    processing: HashSet<K>,
    /// Processing keys added again; requeued on `done`.
    dirty: HashSet<K>,
    /// Latest delayed schedule per key.
    delayed: HashMap<K, u64>,
    next_schedule: u64,
    /// Started by the first delayed add; dropped on shutdown.
    timer: Option<mpsc::UnboundedSender<Timer<K>>>,
    shut_down: bool,
}

impl<K: Eq + Hash + Clone> State<K> {
    fn push(&mut self, key: K, notify: &Notify) {
        if self.processing.contains(&key) {
            self.dirty.insert(key);
        } else if self.queued.insert(key.clone()) {
            self.ready.push_back(key);
            notify.notify_one();
        }
    }

    fn cancel_delayed(&mut self, key: &K) {
        if self.delayed.remove(key).is_some() {
            if let Some(timer) = &self.timer {
                let _ = timer.send(Timer::Cancel(key.clone()));
            }
        }
    }
}

/// Work queue with the guarantees a controller needs:
///
/// - a key waiting in the queue is never queued twice
/// - a key is handed to at most one worker at a time; adds while it is
///   processing are replayed when the worker calls [`WorkQueue::done`]
/// - a delayed add replaces any earlier delayed add for the same key
///
/// Delayed adds share one timer task per queue.
pub struct WorkQueue<K> {
    state: Mutex<State<K>>,
    notify: Notify,
}

impl<K> WorkQueue<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                ready: VecDeque::new(),
                queued: HashSet::new(),
                processing: HashSet::new(),
                dirty: HashSet::new(),
                delayed: HashMap::new(),
                next_schedule: 0,
                timer: None,
                shut_down: false,
            }),
            notify: Notify::new(),
        })
    }

    /// Enqueues `key` for immediate processing.
    pub async fn add(&self, key: K) {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return;
        }
        state.cancel_delayed(&key);
        state.push(key, &self.notify);
    }

    /// Enqueues `key` after `delay`, replacing any pending delayed add.
    pub async fn add_after(self: &Arc<Self>, key: K, delay: Duration) {
        if delay.is_zero() {
            self.add(key).await;
            return;
        }

        let mut state = self.state.lock().await;
        if state.shut_down {
            return;
        }
        state.next_schedule += 1;
        let schedule = state.next_schedule;
        state.delayed.insert(key.clone(), schedule);

        let timer = state
            .timer
            .get_or_insert_with(|| spawn_timer(Arc::downgrade(self)));
        let _ = timer.send(Timer::Schedule {
            key,
            schedule,
            delay,
        });
    }

    /// Called by the timer task; stale schedules are ignored.
    async fn fire(&self, key: K, schedule: u64) {
        let mut state = self.state.lock().await;
        if state.shut_down || state.delayed.get(&key) != Some(&schedule) {
            return;
        }
        state.delayed.remove(&key);
        state.push(key, &self.notify);
    }

    /// Waits for the next key. Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.shut_down {
                    return None;
                }
                if let Some(key) = state.ready.pop_front() {
                    state.queued.remove(&key);
                    state.processing.insert(key.clone());
                    // Pass the wakeup on if more work is waiting.
                    if !state.ready.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Marks `key` as processed, requeueing it if it was added meanwhile.
    pub async fn done(&self, key: &K) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.remove(key) && !state.shut_down && state.queued.insert(key.clone()) {
            state.ready.push_back(key.clone());
            self.notify.notify_one();
        }
    }

    /// Stops handing out keys and wakes all waiting workers.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.shut_down = true;
        state.delayed.clear();
        state.timer = None;
        drop(state);
        self.notify.notify_waiters();
    }

    /// Keys waiting for a worker.
    pub async fn len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Keys with a pending delayed add.
    pub async fn delayed(&self) -> usize {
        self.state.lock().await.delayed.len()
    }
}

fn spawn_timer<K>(queue: Weak<WorkQueue<K>>) -> mpsc::UnboundedSender<Timer<K>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_timer(queue, rx));
    tx
}

/// Owns every pending delayed add of one queue. Exits when the queue shuts
/// down or is dropped.
async fn run_timer<K>(queue: Weak<WorkQueue<K>>, mut commands: mpsc::UnboundedReceiver<Timer<K>>)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    let mut timers: DelayQueue<(K, u64)> = DelayQueue::new();
    let mut pending: HashMap<K, delay_queue::Key> = HashMap::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Timer::Schedule { key, schedule, delay }) => {
                    if let Some(handle) = pending.remove(&key) {
                        timers.remove(&handle);
                    }
                    let handle = timers.insert((key.clone(), schedule), delay);
                    pending.insert(key, handle);
                }
                Some(Timer::Cancel(key)) => {
                    if let Some(handle) = pending.remove(&key) {
                        timers.remove(&handle);
                    }
                }
                None => return,
            },
            Some(expired) = std::future::poll_fn(|cx| timers.poll_expired(cx)), if !timers.is_empty() => {
                let (key, schedule) = expired.into_inner();
                pending.remove(&key);
                let Some(queue) = queue.upgrade() else {
                    return;
                };
                queue.fire(key, schedule).await;
            }
        }
    }
}
