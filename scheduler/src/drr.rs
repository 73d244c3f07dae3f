use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::adaptive_cap::AdaptiveCap;
use crate::error::TaskError;
use crate::metrics::{Ewma, RollingQuantile};
use crate::types::{CompletionHandle, UserKey, UserQueue, WorkItem, make_work_item, normalize_weight};

const QUANTUM: i64 = 1;
const IDLE_YIELD: Duration = Duration::from_millis(10);

struct Inner {
    queues: HashMap<UserKey, UserQueue>,
    active: VecDeque<UserKey>,
    inflight: usize,
    adaptive: AdaptiveCap,
    s_mean: Ewma,
    qstats: RollingQuantile,
}

/// Fair-share scheduler: per-user FIFO sub-queues, a DRR rotor with
/// per-user deficit counters, and a single cooperative dispatch loop
/// bounded by `AdaptiveCap`.
pub struct DrrScheduler {
    inner: Mutex<Inner>,
}

impl DrrScheduler {
    pub fn new(adaptive: AdaptiveCap) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                queues: HashMap::new(),
                active: VecDeque::new(),
                inflight: 0,
                adaptive,
                s_mean: Ewma::new(0.2),
                qstats: RollingQuantile::new(500),
            }),
        })
    }

    /// Enqueues `task` under `user_key`, returning a handle that resolves to
    /// its result. Activates the user if its queue was empty.
    #[instrument(skip(self, task), fields(%user_key, weight))]
    pub fn enqueue_one<T, F>(&self, user_key: UserKey, weight: i64, task: F) -> CompletionHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let (item, handle) = make_work_item(task);
        self.push(user_key, weight, item);
        handle
    }

    /// Enqueues multiple already-wrapped items under `user_key` without
    /// individual completion handles.
    pub fn enqueue_batch(&self, user_key: UserKey, weight: i64, items: Vec<WorkItem>) {
        let mut inner = self.inner.lock();
        let weight = normalize_weight(weight);
        let entry = inner.queues.entry(user_key).or_insert_with(|| UserQueue::new(weight as i64));
        entry.weight = weight;
        let was_empty = entry.items.is_empty();
        entry.items.extend(items);
        if was_empty && !entry.items.is_empty() {
            inner.active.push_back(user_key);
        }
    }

    fn push(&self, user_key: UserKey, weight: i64, item: WorkItem) {
        let mut inner = self.inner.lock();
        let weight = normalize_weight(weight);
        let entry = inner.queues.entry(user_key).or_insert_with(|| UserQueue::new(weight as i64));
        entry.weight = weight;
        let was_empty = entry.items.is_empty();
        entry.items.push_back(item);
        if was_empty {
            inner.active.push_back(user_key);
        }
    }

    pub fn global_load(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.inflight, inner.adaptive.current())
    }

    pub fn service_times(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        let inner = self.inner.lock();
        (inner.s_mean.value(), inner.qstats.quantile(0.5), inner.qstats.quantile(0.9))
    }

    /// Users with a non-empty queue, plus 1 if anything is inflight and no
    /// user is queued. Preserved verbatim from the source's accounting
    /// quirk (an inflight task still "occupies" a logical active slot).
    pub fn active_user_count(&self) -> usize {
        let inner = self.inner.lock();
        let queued = inner.queues.values().filter(|q| !q.items.is_empty()).count();
        queued + if inner.inflight > 0 && queued == 0 { 1 } else { 0 }
    }

    /// Approximate per-user throughput share: `share = weight(user) /
    /// sum(weight(active users))`, `rate = cap * share`.
    pub fn user_effective_rate(&self, user_key: UserKey) -> (f64, f64) {
        let inner = self.inner.lock();
        let active: Vec<&UserKey> = inner
            .queues
            .iter()
            .filter(|(_, q)| !q.items.is_empty())
            .map(|(k, _)| k)
            .collect();
        if active.is_empty() {
            return (inner.adaptive.current() as f64, 1.0);
        }
        let sum_w: u32 = active.iter().map(|k| inner.queues[*k].weight).sum();
        let user_w = inner.queues.get(&user_key).map(|q| q.weight).unwrap_or(1);
        let share = if sum_w == 0 { 1.0 } else { user_w as f64 / sum_w as f64 };
        (inner.adaptive.current() as f64 * share, share)
    }

    /// Rough completion estimate for `n` more items from `user_key`; advisory
    /// UI arithmetic only, never a scheduling invariant. Unknown quantiles
    /// fall back to a neutral multiplier, matching `s_mean or 1.0`.
    pub fn eta_seconds(&self, user_key: UserKey, n: u64) -> (f64, f64) {
        let (s_mean, s50, s90) = self.service_times();
        let s_mean = s_mean.unwrap_or(1.0);
        let s50 = s50.unwrap_or(s_mean);
        let s90 = s90.unwrap_or(s_mean * 1.5);

        let (r_user, _share) = self.user_effective_rate(user_key);
        let r_user = r_user.max(0.001);

        let eta50 = n as f64 / r_user * (s50 / s_mean);
        let eta90 = n as f64 / r_user * (s90 / s_mean);

        let inner = self.inner.lock();
        let work_ahead: usize = inner
            .queues
            .iter()
            .filter(|(k, _)| **k != user_key)
            .map(|(_, q)| q.items.len())
            .sum();
        let global_rate = (inner.adaptive.current() as f64).max(0.001);
        let wait_start = work_ahead as f64 / global_rate * s50;

        (wait_start + eta50, wait_start + eta90)
    }

    /// One DRR round: selects the next `WorkItem` to dispatch, or `None` if
    /// the rotor is empty or exhausted without finding eligible work.
    ///
    /// Quantum credit is added only when a user is freshly visited (deficit
    /// at or below zero); from there the user is served repeatedly — one
    /// item per call, leaving it at the rotor head — until its deficit is
    /// spent or its queue empties. This is what makes a higher-weight user
    /// burst several dispatches per visit instead of strictly alternating.
    fn pop_next(&self) -> Option<(UserKey, WorkItem)> {
        let mut inner = self.inner.lock();
        let rounds = inner.active.len();
        for _ in 0..rounds {
            let Some(&uid) = inner.active.front() else {
                return None;
            };

            let empty = inner.queues.get(&uid).is_some_and(|q| q.items.is_empty());
            if empty {
                inner.active.pop_front();
                continue;
            }

            let weight = inner.queues[&uid].weight as i64;
            let deficit = {
                let q = inner.queues.get_mut(&uid).expect("checked above");
                if q.deficit <= 0 {
                    q.deficit += QUANTUM * weight;
                }
                q.deficit
            };

            if deficit <= 0 {
                inner.active.rotate_left(1);
                continue;
            }

            let q = inner.queues.get_mut(&uid).expect("checked above");
            let item = q.items.pop_front().expect("checked non-empty above");
            q.deficit -= 1;
            let still_has_work = !q.items.is_empty();
            let turn_over = q.deficit <= 0;

            if !still_has_work {
                inner.active.pop_front();
            } else if turn_over {
                inner.active.rotate_left(1);
            }
            // else: deficit still positive and queue non-empty — leave `uid`
            // at the head so the next call continues its burst.

            return Some((uid, item));
        }
        None
    }

    /// The single dispatch loop; never returns under normal operation.
    /// Launches at most one task per iteration — parallelism beyond 1 comes
    /// from previously spawned tasks still running concurrently.
    pub async fn run(self: Arc<Self>) -> ! {
        loop {
            let can_launch = {
                let inner = self.inner.lock();
                inner.adaptive.current().saturating_sub(inner.inflight)
            };
            if can_launch == 0 {
                tokio::time::sleep(IDLE_YIELD).await;
                continue;
            }

            let Some((uid, item)) = self.pop_next() else {
                tokio::time::sleep(IDLE_YIELD).await;
                continue;
            };

            {
                let mut inner = self.inner.lock();
                inner.inflight += 1;
            }

            let scheduler = self.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let ok = item.await;
                let dt = started.elapsed();

                let mut inner = scheduler.inner.lock();
                inner.s_mean.update(dt.as_secs_f64());
                inner.qstats.update(dt.as_secs_f64());
                inner.adaptive.record(ok);
                inner.inflight -= 1;

                if !ok {
                    debug!(user_key = uid, "task for user completed with error");
                }
            });
        }
    }
}
