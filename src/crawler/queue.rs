//! Work queue with join semantics
//!
//! A multi-producer, multi-consumer FIFO. Producers enqueue batches and may
//! `join` until every enqueued item has been marked done by a consumer.
//! Consumers receive each item wrapped in a [`Claimed`] guard that marks the
//! item done when dropped, so an item whose processing fails still counts.
//!
//! The unfinished-item counter lives in a `watch` channel, separate from the
//! item channel, so `join` works no matter how items are delivered.

use std::ops::Deref;
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};

/// A FIFO work queue shared by a pool of workers
pub struct WorkQueue<T> {
    sender: Mutex<Option<mpsc::UnboundedSender<T>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<T>>,
    unfinished: watch::Sender<usize>,
}

impl<T> WorkQueue<T> {
    /// Creates an empty, open queue
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (unfinished, _) = watch::channel(0);

        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            unfinished,
        }
    }

    /// Enqueues every item; returns how many were accepted
    ///
    /// Items offered after [`close`](Self::close) are dropped.
    pub fn put_all<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = guard.as_ref() else {
            tracing::warn!("Dropping items offered to a closed queue");
            return 0;
        };

        let mut accepted = 0;
        for item in items {
            // Count before sending so a fast consumer cannot finish it first.
            self.unfinished.send_modify(|n| *n += 1);
            if sender.send(item).is_err() {
                self.mark_done();
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Waits for the next item
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn get(&self) -> Option<Claimed<'_, T>> {
        let item = self.receiver.lock().await.recv().await?;
        Some(Claimed { item, queue: self })
    }

    /// Waits until every item enqueued so far has been marked done
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Enqueues a batch and waits until the whole queue drains
    pub async fn put_all_and_join<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let accepted = self.put_all(items);
        self.join().await;
        accepted
    }

    /// Number of items enqueued but not yet marked done
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Stops accepting items; workers exit after draining what remains
    pub fn close(&self) {
        let mut guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }

    fn mark_done(&self) {
        self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An item taken from a [`WorkQueue`]; marks it done when dropped
pub struct Claimed<'a, T> {
    item: T,
    queue: &'a WorkQueue<T>,
}

impl<T> Deref for Claimed<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T> Drop for Claimed<'_, T> {
    fn drop(&mut self) {
        self.queue.mark_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = WorkQueue::new();
        queue.put_all([1, 2, 3]);
        queue.close();

        let mut seen = Vec::new();
        while let Some(item) = queue.get().await {
            seen.push(*item);
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_join_on_empty_queue_returns() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        tokio::time::timeout(Duration::from_secs(1), queue.join())
            .await
            .expect("join on an empty queue should not block");
    }

    #[tokio::test]
    async fn test_join_waits_for_every_item() {
        let queue = Arc::new(WorkQueue::new());
        let processed = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::new();
        for _ in 0..2 {
            let queue = Arc::clone(&queue);
            let processed = Arc::clone(&processed);
            workers.push(tokio::spawn(async move {
                while let Some(item) = queue.get().await {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    // Odd items "fail": the guard still marks them done.
                    if *item % 2 == 1 {
                        continue;
                    }
                    processed.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        let accepted = queue.put_all_and_join(0..5u32).await;
        assert_eq!(accepted, 5);
        assert_eq!(queue.unfinished(), 0);
        assert_eq!(processed.load(Ordering::SeqCst), 3);

        queue.close();
        for worker in workers {
            worker.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_queue_is_reusable_after_join() {
        let queue = Arc::new(WorkQueue::new());
        let worker = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                let mut count = 0;
                while let Some(_item) = queue.get().await {
                    count += 1;
                }
                count
            })
        };

        queue.put_all_and_join(["a", "b"]).await;
        queue.put_all_and_join(["c"]).await;
        queue.close();

        assert_eq!(worker.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_closed_queue_rejects_items() {
        let queue = WorkQueue::new();
        queue.close();
        assert_eq!(queue.put_all([1, 2]), 0);
        assert_eq!(queue.unfinished(), 0);
        assert!(queue.get().await.is_none());
    }
}
