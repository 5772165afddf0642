use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::types::SignalEvent;

type Subscribers = Arc<Mutex<Vec<(u64, Sender<SignalEvent>)>>>;

/// Fan-out of [`SignalEvent`]s to explicitly registered subscribers.
///
/// Cloning the bus shares the subscriber list, so reader threads can publish
/// while the owner subscribes and unsubscribes.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Subscribers,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, tx));
        Subscription {
            id,
            rx,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Deliver to every live subscriber, pruning ones whose receiver is gone
    pub fn publish(&self, event: SignalEvent) {
        self.lock()
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Sender<SignalEvent>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receiving end of one subscription; deregisters itself on drop
pub struct Subscription {
    id: u64,
    rx: Receiver<SignalEvent>,
    subscribers: Subscribers,
}

impl Subscription {
    pub fn try_recv(&self) -> Option<SignalEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SignalEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything queued right now, without blocking
    pub fn drain(&self) -> Vec<SignalEvent> {
        self.rx.try_iter().collect()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::types::{Source, Stream};

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(SignalEvent::DaemonReady);
        bus.publish(SignalEvent::LinkCode("sgnl://linkdevice?uuid=x".to_string()));

        for sub in [&a, &b] {
            assert_eq!(
                sub.drain(),
                vec![
                    SignalEvent::DaemonReady,
                    SignalEvent::LinkCode("sgnl://linkdevice?uuid=x".to_string()),
                ]
            );
        }
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        {
            let _b = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 1);
        a.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
        // Publishing with nobody listening is fine
        bus.publish(SignalEvent::Linked);
    }

    #[test]
    fn test_unsubscribe_after_poisoned_lock() {
        let bus = EventBus::new();
        let sub = bus.subscribe();

        let subscribers = Arc::clone(&bus.subscribers);
        let result = std::thread::spawn(move || {
            let _guard = subscribers.lock().unwrap();
            panic!("publisher died holding the lock");
        })
        .join();
        assert!(result.is_err());

        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_from_other_thread() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let publisher = bus.clone();
        std::thread::spawn(move || {
            publisher.publish(SignalEvent::Output {
                source: Source::Daemon,
                stream: Stream::Stderr,
                line: "INFO started".to_string(),
            });
        })
        .join()
        .unwrap();

        let event = sub.recv_timeout(Duration::from_secs(1));
        assert!(matches!(event, Some(SignalEvent::Output { source: Source::Daemon, .. })));
        assert_eq!(sub.try_recv(), None);
    }
}
