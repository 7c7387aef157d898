//! Fan-out of order events to registered subscribers.
//!
//! Every publish call notifies all subscribers concurrently and returns
//! once each of them has settled. A subscriber that fails or panics is
//! logged and counted; it never affects the others or the publisher.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use domain::{DomainEvent, OrderCancelled, OrderCreated, OrderStatusChanged, PaymentProcessed};
use futures_util::FutureExt;
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::WorkflowError;

/// Reacts to order lifecycle events.
///
/// Every handler defaults to doing nothing, so a subscriber only
/// implements the events it cares about.
#[async_trait]
pub trait OrderEventSubscriber: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn on_order_created(&self, _event: &OrderCreated) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn on_status_changed(&self, _event: &OrderStatusChanged) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn on_payment_processed(&self, _event: &PaymentProcessed) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn on_order_cancelled(&self, _event: &OrderCancelled) -> Result<(), WorkflowError> {
        Ok(())
    }
}

/// A borrowed event of any kind.
#[derive(Clone, Copy)]
enum Published<'a> {
    Created(&'a OrderCreated),
    StatusChanged(&'a OrderStatusChanged),
    PaymentProcessed(&'a PaymentProcessed),
    Cancelled(&'a OrderCancelled),
}

impl Published<'_> {
    fn event(&self) -> &dyn DomainEvent {
        match *self {
            Published::Created(e) => e,
            Published::StatusChanged(e) => e,
            Published::PaymentProcessed(e) => e,
            Published::Cancelled(e) => e,
        }
    }

    async fn deliver(self, subscriber: &dyn OrderEventSubscriber) -> Result<(), WorkflowError> {
        match self {
            Published::Created(e) => subscriber.on_order_created(e).await,
            Published::StatusChanged(e) => subscriber.on_status_changed(e).await,
            Published::PaymentProcessed(e) => subscriber.on_payment_processed(e).await,
            Published::Cancelled(e) => subscriber.on_order_cancelled(e).await,
        }
    }
}

/// Registry of subscribers.
#[derive(Default)]
pub struct EventNotifier {
    subscribers: RwLock<Vec<Arc<dyn OrderEventSubscriber>>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. Registering the same instance twice is a no-op.
    pub fn subscribe(&self, subscriber: Arc<dyn OrderEventSubscriber>) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !subscribers.iter().any(|s| Arc::ptr_eq(s, &subscriber)) {
            debug!(subscriber = subscriber.name(), "subscriber registered");
            subscribers.push(subscriber);
        }
    }

    /// Removes a subscriber. Unknown instances are ignored.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn OrderEventSubscriber>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| !Arc::ptr_eq(s, subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.snapshot().len()
    }

    pub async fn publish_order_created(&self, event: &OrderCreated) {
        self.fan_out(Published::Created(event)).await;
    }

    pub async fn publish_status_changed(&self, event: &OrderStatusChanged) {
        self.fan_out(Published::StatusChanged(event)).await;
    }

    pub async fn publish_payment_processed(&self, event: &PaymentProcessed) {
        self.fan_out(Published::PaymentProcessed(event)).await;
    }

    pub async fn publish_order_cancelled(&self, event: &OrderCancelled) {
        self.fan_out(Published::Cancelled(event)).await;
    }

    // The lock is released before any handler runs, so a handler may
    // subscribe or unsubscribe without deadlocking.
    fn snapshot(&self) -> Vec<Arc<dyn OrderEventSubscriber>> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn fan_out(&self, published: Published<'_>) {
        let subscribers = self.snapshot();
        let event_type = published.event().event_type();
        let order_id = published.event().header().order_id;

        let deliveries = subscribers.iter().map(|subscriber| async move {
            let outcome = AssertUnwindSafe(published.deliver(subscriber.as_ref()))
                .catch_unwind()
                .await;
            (subscriber.name(), outcome)
        });

        for (name, outcome) in join_all(deliveries).await {
            let fault = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(_) => "subscriber panicked".to_string(),
            };
            warn!(
                subscriber = name,
                event = event_type,
                %order_id,
                error = %fault,
                "event subscriber failed"
            );
            metrics::counter!("event_subscriber_failures_total", "event" => event_type)
                .increment(1);
        }
    }
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.snapshot().iter().map(|s| s.name()).collect();
        f.debug_struct("EventNotifier")
            .field("subscribers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CustomerId, Money, Order, OrderItem};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counting {
        created: AtomicUsize,
        cancelled: AtomicUsize,
    }

    #[async_trait]
    impl OrderEventSubscriber for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn on_order_created(&self, _event: &OrderCreated) -> Result<(), WorkflowError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_order_cancelled(&self, _event: &OrderCancelled) -> Result<(), WorkflowError> {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl OrderEventSubscriber for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn on_order_created(&self, _event: &OrderCreated) -> Result<(), WorkflowError> {
            Err(WorkflowError::Subscriber("mailbox full".to_string()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl OrderEventSubscriber for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn on_order_created(&self, _event: &OrderCreated) -> Result<(), WorkflowError> {
            panic!("handler bug")
        }
    }

    struct Slow(Arc<AtomicUsize>);

    #[async_trait]
    impl OrderEventSubscriber for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn on_order_created(&self, _event: &OrderCreated) -> Result<(), WorkflowError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn created() -> OrderCreated {
        let order = Order::new(
            CustomerId::new(),
            vec![OrderItem::new("SKU-001", "Widget", 1, Money::from_dollars(10))],
        );
        OrderCreated::new(&order)
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let notifier = EventNotifier::new();
        let counting: Arc<dyn OrderEventSubscriber> = Arc::new(Counting::default());

        notifier.subscribe(counting.clone());
        notifier.subscribe(counting.clone());
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.unsubscribe(&counting);
        notifier.unsubscribe(&counting);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_faulty_subscribers_do_not_block_others() {
        let notifier = EventNotifier::new();
        let counting = Arc::new(Counting::default());
        notifier.subscribe(Arc::new(Failing));
        notifier.subscribe(Arc::new(Panicking));
        notifier.subscribe(counting.clone());

        notifier.publish_order_created(&created()).await;
        notifier.publish_order_created(&created()).await;

        assert_eq!(counting.created.load(Ordering::SeqCst), 2);
        assert_eq!(counting.cancelled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_runs_subscribers_concurrently() {
        let notifier = EventNotifier::new();
        let done = Arc::new(AtomicUsize::new(0));
        notifier.subscribe(Arc::new(Slow(done.clone())));
        notifier.subscribe(Arc::new(Slow(done.clone())));

        let started = tokio::time::Instant::now();
        notifier.publish_order_created(&created()).await;

        assert_eq!(done.load(Ordering::SeqCst), 2);
        // Two 50ms subscribers in sequence would take 100ms.
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let notifier = EventNotifier::new();
        notifier.publish_order_created(&created()).await;
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
