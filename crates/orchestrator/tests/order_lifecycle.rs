//! Integration tests for the order lifecycle across all collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Context, OrderId, UserId};
use domain::{
    EventId, FulfillmentCompletedEvent, Money, OrderStatus, Part, PartId, PaymentMethod,
    TransactionId,
};
use messaging::{
    EventPublisher, EventSubscriber, InMemoryBroker, Message, MessageHandler, MessagingError,
    ORDER_PAID_TOPIC, OrderPaidProducer, codec,
};
use order_store::{InMemoryOrderStore, OrderStore};
use orchestrator::{
    FULFILLMENT_COMPLETED_TOPIC, FulfillmentCompletedHandler, InMemoryCatalogClient,
    InMemoryPaymentClient, OrderError, OrderOrchestrator, PaymentClient, PaymentError,
};
use tokio_util::sync::CancellationToken;

type TestOrchestrator = OrderOrchestrator<
    InMemoryOrderStore,
    InMemoryCatalogClient,
    InMemoryPaymentClient,
    InMemoryBroker,
>;

struct TestHarness {
    orchestrator: Arc<TestOrchestrator>,
    store: InMemoryOrderStore,
    catalog: InMemoryCatalogClient,
    payment: InMemoryPaymentClient,
    broker: InMemoryBroker,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_payment(InMemoryPaymentClient::new())
    }

    fn with_payment(payment: InMemoryPaymentClient) -> Self {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogClient::with_parts([
            Part::new("p1", "Thruster", Money::from_cents(100), 10),
            Part::new("p2", "Fuel tank", Money::from_cents(250), 10),
            Part::new("p3", "Porthole", Money::from_cents(75), 10),
        ]);
        let broker = InMemoryBroker::with_max_delivery_attempts(3);

        let orchestrator = Arc::new(OrderOrchestrator::new(
            store.clone(),
            catalog.clone(),
            payment.clone(),
            OrderPaidProducer::new(broker.clone()),
        ));

        Self {
            orchestrator,
            store,
            catalog,
            payment,
            broker,
        }
    }

    fn handler(&self) -> FulfillmentCompletedHandler<
        InMemoryOrderStore,
        InMemoryCatalogClient,
        InMemoryPaymentClient,
        InMemoryBroker,
    > {
        FulfillmentCompletedHandler::new(Arc::clone(&self.orchestrator))
    }

    async fn create_order(&self, parts: &[&str]) -> OrderId {
        self.orchestrator
            .create_order(
                &Context::new(),
                UserId::new(),
                parts.iter().map(|p| PartId::new(*p)).collect(),
            )
            .await
            .unwrap()
            .order_id
    }

    async fn status(&self, order_id: OrderId) -> OrderStatus {
        self.store.get(order_id).await.unwrap().status
    }
}

fn completion_message(order_id: OrderId, offset: u64) -> Message {
    let event = FulfillmentCompletedEvent {
        event_id: EventId::new(),
        order_id,
        owner_id: UserId::new(),
        fulfillment_duration_seconds: 12,
    };
    Message {
        topic: FULFILLMENT_COMPLETED_TOPIC.to_string(),
        key: order_id.to_string(),
        payload: codec::encode(&event).unwrap(),
        offset,
        delivery_attempt: 1,
    }
}

async fn wait_for_status(h: &TestHarness, order_id: OrderId, status: OrderStatus) {
    for _ in 0..200 {
        if h.status(order_id).await == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("order {order_id} never reached {status}");
}

#[tokio::test]
async fn test_end_to_end_create_pay_complete() {
    let h = TestHarness::new();
    let ctx = Context::new();
    let owner = UserId::new();

    // Create
    let created = h
        .orchestrator
        .create_order(&ctx, owner, vec![PartId::new("p1"), PartId::new("p2")])
        .await
        .unwrap();
    assert_eq!(created.total_price, Money::from_cents(350));
    assert_eq!(h.status(created.order_id).await, OrderStatus::PendingPayment);

    // Pay
    let method: PaymentMethod = "CARD".parse().unwrap();
    let tx = h
        .orchestrator
        .pay_order(&ctx, created.order_id, method)
        .await
        .unwrap();
    assert!(!tx.is_empty());

    let order = h.orchestrator.get_order(&ctx, created.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.transaction_id(), Some(&tx));
    assert_eq!(order.payment_method(), Some(PaymentMethod::Card));
    assert_eq!(h.broker.published(ORDER_PAID_TOPIC).await.len(), 1);

    // Fulfillment reports back through the consumer group
    let shutdown = CancellationToken::new();
    let consumer = {
        let broker = h.broker.clone();
        let handler: Arc<dyn MessageHandler> = Arc::new(h.handler());
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            broker
                .consume(FULFILLMENT_COMPLETED_TOPIC, "order-service", handler, shutdown)
                .await
        })
    };
    let event = FulfillmentCompletedEvent {
        event_id: EventId::new(),
        order_id: created.order_id,
        owner_id: owner,
        fulfillment_duration_seconds: 30,
    };
    h.broker
        .send(
            FULFILLMENT_COMPLETED_TOPIC,
            &created.order_id.to_string(),
            codec::encode(&event).unwrap(),
        )
        .await
        .unwrap();

    wait_for_status(&h, created.order_id, OrderStatus::Completed).await;

    // Completed is terminal
    let cancel = h.orchestrator.cancel_order(&ctx, created.order_id).await;
    assert!(matches!(cancel, Err(OrderError::OrderConflict { status: OrderStatus::Completed, .. })));

    shutdown.cancel();
    consumer.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_total_price_is_fixed_at_creation() {
    let h = TestHarness::new();
    let order_id = h.create_order(&["p1", "p3"]).await;

    h.catalog
        .upsert(Part::new("p1", "Thruster", Money::from_cents(10_000), 10))
        .await;

    let order = h
        .orchestrator
        .get_order(&Context::new(), order_id)
        .await
        .unwrap();
    assert_eq!(order.total_price, Money::from_cents(175));
    assert_eq!(order.line_item_count(), 2);
}

#[tokio::test]
async fn test_parts_not_found_creates_nothing() {
    let h = TestHarness::new();
    let result = h
        .orchestrator
        .create_order(
            &Context::new(),
            UserId::new(),
            vec![PartId::new("p1"), PartId::new("p404"), PartId::new("p2")],
        )
        .await;

    assert!(matches!(result, Err(OrderError::PartsNotFound { ref missing }) if missing == &vec![PartId::new("p404")]));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_second_pay_is_conflict_without_second_charge() {
    let h = TestHarness::new();
    let order_id = h.create_order(&["p1"]).await;
    let ctx = Context::new();

    let first = h
        .orchestrator
        .pay_order(&ctx, order_id, PaymentMethod::Card)
        .await
        .unwrap();
    let second = h
        .orchestrator
        .pay_order(&ctx, order_id, PaymentMethod::Sbp)
        .await;

    assert!(matches!(
        second,
        Err(OrderError::PaymentConflict {
            status: OrderStatus::Paid,
            ..
        })
    ));
    assert_eq!(h.payment.charges_for(order_id).await.len(), 1);

    let order = h.store.get(order_id).await.unwrap();
    assert_eq!(order.transaction_id(), Some(&first));
    assert_eq!(order.payment_method(), Some(PaymentMethod::Card));
    assert_eq!(h.broker.published(ORDER_PAID_TOPIC).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pay_records_one_transaction() {
    let h = TestHarness::with_payment(
        InMemoryPaymentClient::new().with_latency(Duration::from_millis(20)),
    );
    let order_id = h.create_order(&["p1", "p2"]).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orchestrator = Arc::clone(&h.orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .pay_order(&Context::new(), order_id, PaymentMethod::Card)
                .await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(tx) => winners.push(tx),
            Err(err) => assert!(err.is_conflict(), "unexpected error: {err}"),
        }
    }

    assert_eq!(winners.len(), 1);
    let order = h.store.get(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.transaction_id(), Some(&winners[0]));
    assert_eq!(h.broker.published(ORDER_PAID_TOPIC).await.len(), 1);
}

#[tokio::test]
async fn test_cancel_conflicts_leave_status_unchanged() {
    let h = TestHarness::new();
    let ctx = Context::new();

    let paid = h.create_order(&["p1"]).await;
    h.orchestrator
        .pay_order(&ctx, paid, PaymentMethod::CreditCard)
        .await
        .unwrap();

    let canceled = h.create_order(&["p2"]).await;
    h.orchestrator.cancel_order(&ctx, canceled).await.unwrap();
    assert_eq!(h.status(canceled).await, OrderStatus::Canceled);

    let result = h.orchestrator.cancel_order(&ctx, paid).await;
    assert!(matches!(result, Err(OrderError::OrderConflict { status: OrderStatus::Paid, .. })));
    assert_eq!(h.status(paid).await, OrderStatus::Paid);

    let result = h.orchestrator.cancel_order(&ctx, canceled).await;
    assert!(matches!(result, Err(OrderError::OrderConflict { status: OrderStatus::Canceled, .. })));
    assert_eq!(h.status(canceled).await, OrderStatus::Canceled);
}

#[tokio::test]
async fn test_canceled_order_cannot_be_paid() {
    let h = TestHarness::new();
    let ctx = Context::new();
    let order_id = h.create_order(&["p3"]).await;
    h.orchestrator.cancel_order(&ctx, order_id).await.unwrap();

    let result = h
        .orchestrator
        .pay_order(&ctx, order_id, PaymentMethod::InvestorMoney)
        .await;

    assert!(matches!(result, Err(OrderError::PaymentConflict { status: OrderStatus::Canceled, .. })));
    assert_eq!(h.payment.charge_count().await, 0);
}

#[tokio::test]
async fn test_redelivered_completion_is_idempotent() {
    let h = TestHarness::new();
    let order_id = h.create_order(&["p1"]).await;
    h.orchestrator
        .pay_order(&Context::new(), order_id, PaymentMethod::Card)
        .await
        .unwrap();

    let handler = h.handler();
    let message = completion_message(order_id, 0);

    handler.handle(&message).await.unwrap();
    assert_eq!(h.status(order_id).await, OrderStatus::Completed);

    handler.handle(&message).await.unwrap();
    assert_eq!(h.status(order_id).await, OrderStatus::Completed);
}

#[tokio::test]
async fn test_completion_for_unknown_order_is_acknowledged() {
    let h = TestHarness::new();
    let result = h
        .handler()
        .handle(&completion_message(OrderId::new(), 0))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_undecodable_completion_is_rejected() {
    let h = TestHarness::new();
    let mut message = completion_message(OrderId::new(), 0);
    message.payload = b"not json".to_vec();

    let result = h.handler().handle(&message).await;
    assert!(matches!(result, Err(MessagingError::Codec(_))));
}

#[tokio::test]
async fn test_store_failure_in_completion_is_retried_then_dead_lettered() {
    let h = TestHarness::new();
    let order_id = h.create_order(&["p1"]).await;
    h.orchestrator
        .pay_order(&Context::new(), order_id, PaymentMethod::Card)
        .await
        .unwrap();
    h.store.set_fail_on_update(true);

    let shutdown = CancellationToken::new();
    let consumer = {
        let broker = h.broker.clone();
        let handler: Arc<dyn MessageHandler> = Arc::new(h.handler());
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            broker
                .consume(FULFILLMENT_COMPLETED_TOPIC, "order-service", handler, shutdown)
                .await
        })
    };

    let message = completion_message(order_id, 0);
    h.broker
        .send(FULFILLMENT_COMPLETED_TOPIC, &message.key, message.payload.clone())
        .await
        .unwrap();

    let mut dead = Vec::new();
    for _ in 0..200 {
        dead = h.broker.dead_letters(FULFILLMENT_COMPLETED_TOPIC).await;
        if !dead.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    shutdown.cancel();
    consumer.await.unwrap().unwrap();

    // Every attempt was handed back to the broker, never dropped silently.
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].delivery_attempt, h.broker.max_delivery_attempts());
    assert_eq!(h.status(order_id).await, OrderStatus::Paid);

    // Once the store recovers, a replay of the same record completes the order.
    h.store.set_fail_on_update(false);
    h.handler().handle(&dead[0]).await.unwrap();
    assert_eq!(h.status(order_id).await, OrderStatus::Completed);
}

#[tokio::test]
async fn test_payment_outcome_survives_request_cancellation() {
    /// Cancels the request context as soon as the charge is accepted.
    struct CancellingPayment {
        inner: InMemoryPaymentClient,
        ctx: Context,
    }

    #[async_trait]
    impl PaymentClient for CancellingPayment {
        async fn pay_order(
            &self,
            user_id: UserId,
            order_id: OrderId,
            method: PaymentMethod,
        ) -> Result<TransactionId, PaymentError> {
            let tx = self.inner.pay_order(user_id, order_id, method).await?;
            self.ctx.cancel();
            Ok(tx)
        }
    }

    let store = InMemoryOrderStore::new();
    let broker = InMemoryBroker::new();
    let ctx = Context::new();
    let orchestrator = OrderOrchestrator::new(
        store.clone(),
        InMemoryCatalogClient::with_parts([Part::new("p1", "Thruster", Money::from_cents(100), 1)]),
        CancellingPayment {
            inner: InMemoryPaymentClient::new(),
            ctx: ctx.clone(),
        },
        OrderPaidProducer::new(broker.clone()),
    );

    let created = orchestrator
        .create_order(&ctx, UserId::new(), vec![PartId::new("p1")])
        .await
        .unwrap();
    let tx = orchestrator
        .pay_order(&ctx, created.order_id, PaymentMethod::Card)
        .await
        .unwrap();

    assert!(ctx.err().is_some());
    let order = store.get(created.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.transaction_id(), Some(&tx));
    assert_eq!(broker.published(ORDER_PAID_TOPIC).await.len(), 1);
}

#[tokio::test]
async fn test_status_only_takes_known_values_across_lifecycle() {
    let h = TestHarness::new();
    let ctx = Context::new();
    let a = h.create_order(&["p1"]).await;
    let b = h.create_order(&["p2", "p3"]).await;

    h.orchestrator
        .pay_order(&ctx, a, PaymentMethod::Sbp)
        .await
        .unwrap();
    h.orchestrator.cancel_order(&ctx, b).await.unwrap();
    h.orchestrator
        .update_status(&ctx, a, OrderStatus::Completed)
        .await
        .unwrap();

    for order_id in [a, b] {
        let order = h.orchestrator.get_order(&ctx, order_id).await.unwrap();
        assert!(OrderStatus::ALL.contains(&order.status));
        assert!(order.status.is_terminal());
        assert_eq!(order.payment.is_some(), order.status.has_payment());
    }

    // Terminal orders accept neither payment nor cancellation.
    for order_id in [a, b] {
        assert!(h.orchestrator.pay_order(&ctx, order_id, PaymentMethod::Card).await.is_err());
        assert!(h.orchestrator.cancel_order(&ctx, order_id).await.is_err());
    }
}
