//! In-memory event bus for tests/dev.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InMemoryBusError {
    #[error("subscriber list lock poisoned")]
    Poisoned,
}

/// In-memory fan-out bus over `std::sync::mpsc` channels.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| {
            tracing::warn!("bus subscriber list poisoned, message not delivered");
            InMemoryBusError::Poisoned
        })?;

        // Dropped receivers are pruned while publishing.
        let before = subs.len();
        subs.retain(|tx| tx.send(message.clone()).is_ok());
        if subs.len() < before {
            tracing::trace!(pruned = before - subs.len(), "dropped bus subscribers pruned");
        }

        Ok(())
    }

    fn subscribe(&self) -> Result<Subscription<M>, Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| {
            tracing::warn!("bus subscriber list poisoned, subscription refused");
            InMemoryBusError::Poisoned
        })?;

        let (tx, rx) = mpsc::channel();
        subs.push(tx);
        Ok(Subscription::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_each_message() {
        let bus = InMemoryEventBus::new();
        let a = bus.subscribe().unwrap();
        let b = bus.subscribe().unwrap();

        bus.publish("consent.granted".to_string()).unwrap();

        assert_eq!(a.drain(), vec!["consent.granted".to_string()]);
        assert_eq!(b.drain(), vec!["consent.granted".to_string()]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = InMemoryEventBus::new();
        let kept = bus.subscribe().unwrap();
        drop(bus.subscribe().unwrap());

        bus.publish(1u8).unwrap();
        bus.publish(2u8).unwrap();

        assert_eq!(kept.drain(), vec![1, 2]);
        assert_eq!(bus.subscribers.lock().unwrap().len(), 1);
    }

    #[test]
    fn poisoned_bus_refuses_subscribers_and_messages() {
        use std::sync::Arc;

        let bus = Arc::new(InMemoryEventBus::<u8>::new());
        let early = bus.subscribe().unwrap();

        let held = Arc::clone(&bus);
        let _ = std::thread::spawn(move || {
            let _guard = held.subscribers.lock().unwrap();
            panic!("subscriber list poisoned on purpose");
        })
        .join();

        assert_eq!(bus.subscribe().err(), Some(InMemoryBusError::Poisoned));
        assert_eq!(bus.publish(1), Err(InMemoryBusError::Poisoned));
        assert!(early.drain().is_empty());
    }
}
