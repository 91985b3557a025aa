//! Order lifecycle orchestration.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use common::{Context, OrderId, UserId};
use domain::{
    Money, Order, OrderPaidEvent, OrderStatus, Part, PartId, PartsFilter, PaymentMethod,
    TransactionId,
};
use messaging::{EventPublisher, OrderPaidProducer};
use order_store::{NewOrder, OrderStore, OrderUpdate, StoreError, UpdateOptions};
use tracing::Instrument;

use crate::clients::{CatalogClient, PaymentClient};
use crate::error::{OrderError, Result};

/// Outcome of a successful CreateOrder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub total_price: Money,
}

/// Drives orders through their lifecycle:
///
/// ```text
/// create ──► PendingPayment ──pay──► Paid ──fulfillment──► Completed
///                  │
///                  └──cancel──► Canceled
/// ```
///
/// The orchestrator holds no per-order state and takes no locks. Conflicting
/// writes to one order are arbitrated by the store's conditional update.
pub struct OrderOrchestrator<S, C, P, E>
where
    S: OrderStore,
    C: CatalogClient,
    P: PaymentClient,
    E: EventPublisher,
{
    store: Arc<S>,
    catalog: C,
    payment: P,
    producer: Arc<OrderPaidProducer<E>>,
}

impl<S, C, P, E> OrderOrchestrator<S, C, P, E>
where
    S: OrderStore + 'static,
    C: CatalogClient,
    P: PaymentClient,
    E: EventPublisher + 'static,
{
    /// Creates a new orchestrator over its four collaborators.
    pub fn new(store: S, catalog: C, payment: P, producer: OrderPaidProducer<E>) -> Self {
        Self {
            store: Arc::new(store),
            catalog,
            payment,
            producer: Arc::new(producer),
        }
    }

    /// Creates an order for `owner_id` from catalog parts.
    ///
    /// Duplicate ids are ignored after their first occurrence. Either every
    /// part resolves and one order is persisted, or nothing is written.
    #[tracing::instrument(skip(self, ctx, part_ids), fields(%owner_id, requested = part_ids.len()))]
    pub async fn create_order(
        &self,
        ctx: &Context,
        owner_id: UserId,
        part_ids: Vec<PartId>,
    ) -> Result<OrderCreated> {
        let started = Instant::now();
        let result = self.try_create_order(ctx, owner_id, part_ids).await;
        observe("create_order", started, &result);
        result
    }

    async fn try_create_order(
        &self,
        ctx: &Context,
        owner_id: UserId,
        part_ids: Vec<PartId>,
    ) -> Result<OrderCreated> {
        let requested = distinct(part_ids);
        if requested.is_empty() {
            return Err(OrderError::NoParts);
        }

        let parts = ctx
            .run(
                self.catalog
                    .list_parts(PartsFilter::by_ids(requested.iter().cloned())),
            )
            .await?
            .inspect_err(|err| tracing::error!(error = %err, "part lookup failed"))?;

        let total_price = price_parts(&requested, &parts)?;

        let order_id = ctx
            .run(self.store.create(NewOrder {
                owner_id,
                line_item_ids: requested,
                total_price,
            }))
            .await??;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(%order_id, %total_price, "order created");

        Ok(OrderCreated {
            order_id,
            total_price,
        })
    }

    /// Loads an order.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_order(&self, ctx: &Context, order_id: OrderId) -> Result<Order> {
        let started = Instant::now();
        let result = self
            .load(ctx, order_id, |order_id, value| OrderError::OrderInternal {
                order_id,
                value,
            })
            .await;
        observe("get_order", started, &result);
        result
    }

    /// Charges the order's owner and marks the order paid.
    ///
    /// Once the payment client has returned a transaction id, the status
    /// update and the order-paid publish run in their own task. Cancelling
    /// `ctx` or dropping this future no longer stops them; the caller still
    /// receives their error. A store failure at that point leaves a charge
    /// with no paid order behind, which is logged with the transaction id.
    #[tracing::instrument(skip(self, ctx), fields(%payment_method))]
    pub async fn pay_order(
        &self,
        ctx: &Context,
        order_id: OrderId,
        payment_method: PaymentMethod,
    ) -> Result<TransactionId> {
        let started = Instant::now();
        let result = self.try_pay_order(ctx, order_id, payment_method).await;
        observe("pay_order", started, &result);
        result
    }

    async fn try_pay_order(
        &self,
        ctx: &Context,
        order_id: OrderId,
        payment_method: PaymentMethod,
    ) -> Result<TransactionId> {
        let order = self
            .load(ctx, order_id, |order_id, value| OrderError::PaymentInternal {
                order_id,
                value,
            })
            .await?;

        if !order.status.can_pay() {
            tracing::warn!(status = %order.status, "order cannot be paid");
            return Err(OrderError::PaymentConflict {
                order_id,
                status: order.status,
            });
        }

        let transaction_id = ctx
            .run(
                self.payment
                    .pay_order(order.owner_id, order_id, payment_method),
            )
            .await?
            .inspect_err(|err| tracing::error!(error = %err, "payment failed"))?;

        tracing::info!(%transaction_id, "payment accepted");

        let event = OrderPaidEvent::new(
            order_id,
            order.owner_id,
            payment_method,
            transaction_id.clone(),
        );
        let task = tokio::spawn(
            record_payment(
                Arc::clone(&self.store),
                Arc::clone(&self.producer),
                event,
                order.total_price,
            )
            .in_current_span(),
        );
        task.await??;

        Ok(transaction_id)
    }

    /// Cancels an order that has not been paid.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn cancel_order(&self, ctx: &Context, order_id: OrderId) -> Result<()> {
        let started = Instant::now();
        let result = self.try_cancel_order(ctx, order_id).await;
        observe("cancel_order", started, &result);
        result
    }

    async fn try_cancel_order(&self, ctx: &Context, order_id: OrderId) -> Result<()> {
        let order = self
            .load(ctx, order_id, |order_id, value| OrderError::OrderInternal {
                order_id,
                value,
            })
            .await?;

        if !order.status.can_cancel() {
            tracing::warn!(status = %order.status, "order cannot be cancelled");
            return Err(OrderError::OrderConflict {
                order_id,
                status: order.status,
            });
        }

        let update = ctx
            .run(self.store.update(
                order_id,
                OrderUpdate::status(OrderStatus::Canceled),
                UpdateOptions::expect_status(OrderStatus::PendingPayment),
            ))
            .await?;

        match update {
            Ok(()) => {}
            // Lost a race after the guard passed.
            Err(StoreError::StatusConflict { actual, .. }) => {
                tracing::warn!(status = %actual, "order changed before cancellation");
                return Err(OrderError::OrderConflict {
                    order_id,
                    status: actual,
                });
            }
            Err(StoreError::UnknownStatus { order_id, value }) => {
                return Err(OrderError::OrderInternal { order_id, value });
            }
            Err(err) => return Err(err.into()),
        }

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!("order cancelled");
        Ok(())
    }

    /// Overwrites the order status without checking the current one.
    ///
    /// Used by the fulfillment completion path, where redelivery of the same
    /// event must keep succeeding.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn update_status(
        &self,
        ctx: &Context,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<()> {
        let started = Instant::now();
        let result = ctx
            .run(
                self.store
                    .update(order_id, OrderUpdate::status(status), UpdateOptions::new()),
            )
            .await
            .map_err(OrderError::from)
            .and_then(|res| res.map_err(OrderError::from));

        if result.is_ok() {
            if status == OrderStatus::Completed {
                metrics::counter!("orders_completed_total").increment(1);
            }
            tracing::info!("order status updated");
        }
        observe("update_status", started, &result);
        result
    }

    async fn load(
        &self,
        ctx: &Context,
        order_id: OrderId,
        on_unknown_status: fn(OrderId, String) -> OrderError,
    ) -> Result<Order> {
        match ctx.run(self.store.get(order_id)).await? {
            Ok(order) => Ok(order),
            Err(StoreError::UnknownStatus { order_id, value }) => {
                tracing::error!(%order_id, value = %value, "stored order status is not recognized");
                Err(on_unknown_status(order_id, value))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Persists the payment and announces it. Runs detached from the request.
async fn record_payment<S, E>(
    store: Arc<S>,
    producer: Arc<OrderPaidProducer<E>>,
    event: OrderPaidEvent,
    total_price: Money,
) -> Result<()>
where
    S: OrderStore,
    E: EventPublisher,
{
    let update = OrderUpdate::status(OrderStatus::Paid)
        .with_payment(event.payment_method, event.transaction_id.clone());

    if let Err(err) = store
        .update(
            event.order_id,
            update,
            UpdateOptions::expect_status(OrderStatus::PendingPayment),
        )
        .await
    {
        tracing::error!(
            transaction_id = %event.transaction_id,
            error = %err,
            "payment taken but order not marked paid, needs reconciliation"
        );
        return Err(err.into());
    }

    metrics::counter!("orders_paid_total").increment(1);
    metrics::counter!("orders_revenue_cents_total").increment(total_price.cents().max(0) as u64);

    if let Err(err) = producer.publish(&event).await {
        tracing::error!(
            transaction_id = %event.transaction_id,
            error = %err,
            "order paid but order-paid event not published"
        );
        return Err(err.into());
    }

    Ok(())
}

/// Drops repeated ids, keeping first occurrences in order.
fn distinct(ids: Vec<PartId>) -> Vec<PartId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Sums catalog prices for `requested`, failing if any id did not resolve.
fn price_parts(requested: &[PartId], parts: &[Part]) -> Result<Money> {
    let mut total = Money::zero();
    let mut missing = Vec::new();

    for id in requested {
        match parts.iter().find(|part| &part.id == id) {
            Some(part) => total += part.price,
            None => missing.push(id.clone()),
        }
    }

    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "requested parts not in catalog");
        return Err(OrderError::PartsNotFound { missing });
    }
    Ok(total)
}

fn observe<T>(operation: &'static str, started: Instant, result: &Result<T>) {
    metrics::histogram!("order_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
    if result.is_err() {
        metrics::counter!("order_operation_errors_total", "operation" => operation).increment(1);
    }
}
