use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::ghs::EdgeId;

/// Something a listener handed to the node loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// One complete wire frame, tagged with the edge it arrived on.
    Frame { edge: EdgeId, bytes: Vec<u8> },
    /// The edge's channel failed or ended.
    Closed { edge: EdgeId, reason: String },
}

struct Slot {
    item: Inbound,
    /// Deferred and not worth retrying until the engine makes progress.
    parked: bool,
}

/// FIFO shared by every listener of a node and consumed by its engine.
///
/// Deferred frames go back to the tail. A queue holding nothing but deferred
/// frames suspends the consumer until a new frame is pushed or the engine
/// reports progress, instead of spinning on frames whose answer cannot have
/// changed.
pub struct InboundQueue {
    slots: Mutex<VecDeque<Slot>>,
    ready: Notify,
}

impl Default for InboundQueue {
    fn default() -> Self {
        InboundQueue::new()
    }
}

impl InboundQueue {
    pub fn new() -> Self {
        InboundQueue {
            slots: Mutex::new(VecDeque::new()),
            ready: Notify::new(),
        }
    }

    pub fn push(&self, item: Inbound) {
        self.slots.lock().push_back(Slot {
            item,
            parked: false,
        });
        self.ready.notify_one();
    }

    /// Puts a deferred item back at the tail.
    pub fn requeue(&self, item: Inbound) {
        self.slots.lock().push_back(Slot { item, parked: true });
    }

    /// Makes every deferred item eligible again. Called after the engine
    /// changed state.
    pub fn mark_progress(&self) {
        let mut slots = self.slots.lock();
        for slot in slots.iter_mut() {
            slot.parked = false;
        }
    }

    /// Removes the front item, waiting while there is nothing worth retrying.
    pub async fn pop(&self) -> Inbound {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            self.ready.notified().await;
        }
    }

    pub fn try_pop(&self) -> Option<Inbound> {
        let mut slots = self.slots.lock();
        if slots.iter().all(|slot| slot.parked) {
            return None;
        }
        slots.pop_front().map(|slot| slot.item)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn frame(edge: EdgeId, tag: u8) -> Inbound {
        Inbound::Frame {
            edge,
            bytes: vec![tag, 0, 1],
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = InboundQueue::new();
        queue.push(frame(0, 3));
        queue.push(frame(1, 4));

        assert_eq!(queue.try_pop(), Some(frame(0, 3)));
        assert_eq!(queue.try_pop(), Some(frame(1, 4)));
        assert_eq!(queue.try_pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_requeue_goes_behind_waiting_items() {
        let queue = InboundQueue::new();
        queue.push(frame(0, 0));
        queue.push(frame(1, 2));

        let deferred = queue.try_pop().unwrap();
        queue.requeue(deferred);

        assert_eq!(queue.try_pop(), Some(frame(1, 2)));
        // Only the parked item is left.
        assert_eq!(queue.try_pop(), None);
        assert_eq!(queue.len(), 1);

        queue.mark_progress();
        assert_eq!(queue.try_pop(), Some(frame(0, 0)));
    }

    #[test]
    fn test_fresh_push_releases_parked_items() {
        let queue = InboundQueue::new();
        queue.requeue(frame(0, 0));
        assert_eq!(queue.try_pop(), None);

        queue.push(frame(1, 3));

        assert_eq!(queue.try_pop(), Some(frame(0, 0)));
        assert_eq!(queue.try_pop(), Some(frame(1, 3)));
    }

    #[tokio::test]
    async fn test_pop_waits_for_producer() {
        let queue = Arc::new(InboundQueue::new());

        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(frame(2, 6));
        });

        let item = timeout(Duration::from_secs(5), queue.pop())
            .await
            .expect("pop should complete once a frame is pushed");
        assert_eq!(item, frame(2, 6));
    }

    #[tokio::test]
    async fn test_pop_does_not_return_parked_only_queue() {
        let queue = InboundQueue::new();
        queue.requeue(frame(0, 0));

        let result = timeout(Duration::from_millis(50), queue.pop()).await;

        assert!(result.is_err());
        assert_eq!(queue.len(), 1);
    }
}
