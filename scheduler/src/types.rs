use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;

pub type UserKey = domain::UserId;

/// A type-erased scheduled unit. Awaiting it drives the wrapped task to
/// completion, sends its result down the paired [`CompletionHandle`], and
/// resolves to whether it succeeded (for `AdaptiveCap`/metrics bookkeeping).
pub type WorkItem = Pin<Box<dyn Future<Output = bool> + Send>>;

/// Handle returned by `enqueue_one`; resolves to the task's result or
/// propagates its error. A dropped scheduler (sender side gone without
/// sending) surfaces as a `TaskError`.
pub struct CompletionHandle<T> {
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> Future for CompletionHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::new(ChannelDropped))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Wraps `task` into a type-erased [`WorkItem`] plus its [`CompletionHandle`].
pub fn make_work_item<T, F>(task: F) -> (WorkItem, CompletionHandle<T>)
where
    T: Send + 'static,
    F: Future<Output = Result<T, TaskError>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let item: WorkItem = Box::pin(async move {
        let result = task.await;
        let ok = result.is_ok();
        let _ = tx.send(result);
        ok
    });
    (item, CompletionHandle { rx })
}

#[derive(Debug, thiserror::Error)]
#[error("task dropped before completion")]
struct ChannelDropped;

/// Per-user-key FIFO sub-queue, weight, and deficit counter.
pub struct UserQueue {
    pub items: std::collections::VecDeque<WorkItem>,
    pub weight: u32,
    pub deficit: i64,
}

impl UserQueue {
    pub fn new(weight: i64) -> Self {
        Self {
            items: std::collections::VecDeque::new(),
            weight: normalize_weight(weight),
            deficit: 0,
        }
    }
}

/// Zero or negative weight is treated as weight 1; weights must be positive.
pub fn normalize_weight(weight: i64) -> u32 {
    if weight <= 0 { 1 } else { weight as u32 }
}
