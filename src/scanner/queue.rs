//! Multi-producer, multi-consumer work queue with drain tracking
//!
//! Every item that goes in through [`WorkQueue::put`] must be acknowledged
//! with [`WorkQueue::task_done`] once it has been processed.
//! [`WorkQueue::join`] resolves when nothing is left unacknowledged.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex, Notify};

/// Returned by [`WorkQueue::put`] after the queue has been closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed<T>(pub T);

struct Shared<T> {
    sender: StdMutex<Option<mpsc::UnboundedSender<T>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<T>>,
    unfinished: AtomicUsize,
    enqueued: AtomicUsize,
    acknowledged: AtomicUsize,
    drained: Notify,
}

/// Cloneable handle to a shared work queue
pub struct WorkQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                sender: StdMutex::new(Some(sender)),
                receiver: Mutex::new(receiver),
                unfinished: AtomicUsize::new(0),
                enqueued: AtomicUsize::new(0),
                acknowledged: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Add an item. Fails once the queue is closed.
    pub fn put(&self, item: T) -> Result<(), QueueClosed<T>> {
        let guard = match self.shared.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(sender) = guard.as_ref() else {
            return Err(QueueClosed(item));
        };

        // Count before sending so a fast consumer can never ack an item
        // that is not yet accounted for.
        self.shared.unfinished.fetch_add(1, Ordering::AcqRel);
        match sender.send(item) {
            Ok(()) => {
                self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::SendError(item)) => {
                self.release_one();
                Err(QueueClosed(item))
            }
        }
    }

    /// Stop accepting items. Consumers drain what is left, then
    /// [`get`](Self::get) returns `None`.
    pub fn close(&self) {
        let mut guard = match self.shared.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    /// Take the next item, waiting while the queue is empty but still open.
    pub async fn get(&self) -> Option<T> {
        let mut receiver = self.shared.receiver.lock().await;
        receiver.recv().await
    }

    /// Acknowledge one item obtained from [`get`](Self::get).
    pub fn task_done(&self) {
        if self.release_one() {
            self.shared.acknowledged.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("task_done called more times than items were queued");
        }
    }

    /// Wait until every queued item has been acknowledged.
    pub async fn join(&self) {
        loop {
            // Registered before the check so a concurrent final ack
            // cannot slip between the load and the await.
            let notified = self.shared.drained.notified();
            if self.shared.unfinished.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Items queued and not yet acknowledged
    pub fn unfinished(&self) -> usize {
        self.shared.unfinished.load(Ordering::Acquire)
    }

    pub fn enqueued(&self) -> usize {
        self.shared.enqueued.load(Ordering::Relaxed)
    }

    pub fn acknowledged(&self) -> usize {
        self.shared.acknowledged.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        match self.shared.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    fn release_one(&self) -> bool {
        let released = self
            .shared
            .unfinished
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match released {
            Ok(1) => {
                self.shared.drained.notify_waiters();
                true
            }
            Ok(_) => true,
            Err(_) => false,
        }
    }
}
