use std::collections::HashMap;

use actix::Addr;
use actix_web::web::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::services::db_models::{Order, ShopStatus};
use crate::services::db_utils::PgActor;
use crate::services::lifecycle::OrderStatus;
use crate::services::messages::{FetchActiveOrders, FetchOrderByNumber, FetchShopStatus};
use crate::services::redis_handling::{order_channel, ORDERS_CHANNEL, SHOP_CHANNEL};
use crate::types::{POLL_INTERVAL_SECS, REDIRECT_DELAY_SECS};

/// Admits only strictly newer updates, keyed by the row's `updated_at`.
/// Both the pub/sub path and the polling fallback converge here, so a stale
/// or duplicate delivery from either producer is dropped instead of blindly
/// overwriting the newer state.
pub struct LatestGate {
    last: Option<DateTime<Utc>>,
}

impl LatestGate {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn admit(&mut self, updated_at: DateTime<Utc>) -> bool {
        match self.last {
            Some(seen) if updated_at <= seen => false,
            _ => {
                self.last = Some(updated_at);
                true
            }
        }
    }
}

pub enum DashboardEvent {
    Order(Order),
    Snapshot(Vec<Order>),
    Shop(ShopStatus),
}

/// A live feed over one order: a redis subscription merged with a 2-second
/// polling fallback, both pushing into the same channel. Dropping the feed
/// (or calling [`StatusFeed::close`]) cancels both producers.
pub struct StatusFeed<T> {
    rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
}

impl<T> StatusFeed<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl<T> Drop for StatusFeed<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_subscription<T, F>(
    redis_db: redis::Client,
    channels: Vec<String>,
    cancel: CancellationToken,
    tx: mpsc::Sender<T>,
    decode: F,
) where
    F: Fn(&str, &str) -> Option<T>,
{
    let conn = match redis_db.get_async_connection().await {
        Ok(conn) => conn,
        Err(err) => {
            warn!(%err, "live feed falls back to polling only, redis subscribe failed");
            return;
        }
    };

    let mut pubsub = conn.into_pubsub();
    for channel in &channels {
        if let Err(err) = pubsub.subscribe(channel).await {
            warn!(channel, %err, "live feed falls back to polling only, redis subscribe failed");
            return;
        }
    }

    let mut messages = pubsub.on_message();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = messages.next() => {
                let Some(msg) = msg else { break };
                let channel = msg.get_channel_name().to_owned();
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(channel, %err, "dropping unreadable feed message");
                        continue;
                    }
                };
                if let Some(event) = decode(&channel, &payload) {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
    debug!("feed subscription stopped");
}

fn decode_order(payload: &str) -> Option<Order> {
    match serde_json::from_str::<Order>(payload) {
        Ok(order) => Some(order),
        Err(err) => {
            warn!(%err, "dropping unparseable order event");
            None
        }
    }
}

/// Feed scoped to a single order number.
pub fn spawn_order_feed(
    pg_db: Addr<PgActor>,
    redis_db: redis::Client,
    order_number: i64,
) -> StatusFeed<Order> {
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    tokio::spawn(run_subscription(
        redis_db,
        vec![order_channel(order_number)],
        cancel.clone(),
        tx.clone(),
        |_, payload| decode_order(payload),
    ));

    let poll_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(POLL_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = poll_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match pg_db.send(FetchOrderByNumber(order_number)).await {
                        Ok(Ok(order)) => {
                            if tx.send(order).await.is_err() {
                                break;
                            }
                        }
                        Ok(Err(err)) => debug!(order_number, %err, "order poll miss"),
                        Err(err) => warn!(order_number, %err, "order poll mailbox failure"),
                    }
                }
            }
        }
    });

    StatusFeed { rx, cancel }
}

/// Feed over the shop-status singleton.
pub fn spawn_shop_feed(pg_db: Addr<PgActor>, redis_db: redis::Client) -> StatusFeed<ShopStatus> {
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    tokio::spawn(run_subscription(
        redis_db,
        vec![SHOP_CHANNEL.to_owned()],
        cancel.clone(),
        tx.clone(),
        |_, payload| match serde_json::from_str::<ShopStatus>(payload) {
            Ok(current) => Some(current),
            Err(err) => {
                warn!(%err, "dropping unparseable shop event");
                None
            }
        },
    ));

    let poll_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(POLL_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = poll_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match pg_db.send(FetchShopStatus).await {
                        Ok(Ok(current)) => {
                            if tx.send(current).await.is_err() {
                                break;
                            }
                        }
                        Ok(Err(err)) => debug!(%err, "shop status poll miss"),
                        Err(err) => warn!(%err, "shop status poll mailbox failure"),
                    }
                }
            }
        }
    });

    StatusFeed { rx, cancel }
}

/// Staff-dashboard feed: every order change plus shop changes, with a
/// periodic active-orders snapshot as the polling fallback.
pub fn spawn_dashboard_feed(
    pg_db: Addr<PgActor>,
    redis_db: redis::Client,
) -> StatusFeed<DashboardEvent> {
    let (tx, rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();

    tokio::spawn(run_subscription(
        redis_db,
        vec![ORDERS_CHANNEL.to_owned(), SHOP_CHANNEL.to_owned()],
        cancel.clone(),
        tx.clone(),
        |channel, payload| {
            if channel == SHOP_CHANNEL {
                serde_json::from_str::<ShopStatus>(payload)
                    .ok()
                    .map(DashboardEvent::Shop)
            } else {
                decode_order(payload).map(DashboardEvent::Order)
            }
        },
    ));

    let poll_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(POLL_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = poll_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match pg_db.send(FetchActiveOrders).await {
                        Ok(Ok(active)) => {
                            if tx.send(DashboardEvent::Snapshot(active)).await.is_err() {
                                break;
                            }
                        }
                        Ok(Err(err)) => debug!(%err, "active orders poll miss"),
                        Err(err) => warn!(%err, "active orders poll mailbox failure"),
                    }
                }
            }
        }
    });

    StatusFeed { rx, cancel }
}

pub fn sse_frame<T: Serialize>(event: &str, data: &T) -> Bytes {
    let body = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_owned());
    Bytes::from(format!("event: {event}\ndata: {body}\n\n"))
}

fn receiver_stream<T>(mut rx: mpsc::Receiver<T>) -> impl Stream<Item = T> {
    futures::stream::poll_fn(move |cx| rx.poll_recv(cx))
}

fn is_terminal(status: &str) -> bool {
    status
        .parse::<OrderStatus>()
        .map(|parsed| parsed.is_terminal())
        .unwrap_or(false)
}

#[derive(Serialize)]
struct RedirectHint {
    order_number: i64,
    location: &'static str,
}

/// SSE stream for one customer's tracking view. Emits the current state
/// immediately, then every strictly newer update; on reaching the terminal
/// state it waits the canonical delay, emits exactly one `redirect` frame
/// and ends the stream (which tears the feed down).
pub fn stream_order_events(
    pg_db: Addr<PgActor>,
    redis_db: redis::Client,
    initial: Order,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    // The channel carries plain Bytes so the producer task stays Send;
    // frames are lifted into Result only at the actix boundary.
    let (out, rx) = mpsc::channel::<Bytes>(8);

    tokio::spawn(async move {
        let order_number = initial.order_number;
        let mut gate = LatestGate::new();
        gate.admit(initial.updated_at);

        if out.send(sse_frame("status", &initial)).await.is_err() {
            return;
        }
        if is_terminal(&initial.status) {
            send_redirect(&out, order_number).await;
            return;
        }

        let mut feed = spawn_order_feed(pg_db, redis_db, order_number);
        while let Some(order) = feed.recv().await {
            if !gate.admit(order.updated_at) {
                continue;
            }
            let terminal = is_terminal(&order.status);
            if out.send(sse_frame("status", &order)).await.is_err() {
                break;
            }
            if terminal {
                feed.close();
                send_redirect(&out, order_number).await;
                break;
            }
        }
    });

    receiver_stream(rx).map(Ok::<_, actix_web::Error>)
}

async fn send_redirect(out: &mpsc::Sender<Bytes>, order_number: i64) {
    tokio::time::sleep(std::time::Duration::from_secs(REDIRECT_DELAY_SECS)).await;
    let hint = RedirectHint {
        order_number,
        location: "/order/complete",
    };
    let _ = out.send(sse_frame("redirect", &hint)).await;
}

/// SSE stream for the staff dashboard: per-order `status` frames (gated per
/// order number), `orders` snapshots from the poll and `shop` frames.
pub fn stream_dashboard_events(
    pg_db: Addr<PgActor>,
    redis_db: redis::Client,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    let (out, rx) = mpsc::channel::<Bytes>(16);

    tokio::spawn(async move {
        let mut order_gates: HashMap<i64, LatestGate> = HashMap::new();
        let mut shop_gate = LatestGate::new();

        let mut feed = spawn_dashboard_feed(pg_db, redis_db);
        while let Some(event) = feed.recv().await {
            let frame = match event {
                DashboardEvent::Order(order) => {
                    let gate = order_gates.entry(order.order_number).or_insert_with(LatestGate::new);
                    if !gate.admit(order.updated_at) {
                        continue;
                    }
                    sse_frame("status", &order)
                }
                DashboardEvent::Snapshot(active) => {
                    for order in &active {
                        order_gates
                            .entry(order.order_number)
                            .or_insert_with(LatestGate::new)
                            .admit(order.updated_at);
                    }
                    sse_frame("orders", &active)
                }
                DashboardEvent::Shop(current) => {
                    if !shop_gate.admit(current.updated_at) {
                        continue;
                    }
                    sse_frame("shop", &current)
                }
            };
            if out.send(frame).await.is_err() {
                break;
            }
        }
    });

    receiver_stream(rx).map(Ok::<_, actix_web::Error>)
}

/// SSE stream over the shop-status singleton for customer-facing pages.
pub fn stream_shop_events(
    pg_db: Addr<PgActor>,
    redis_db: redis::Client,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    let (out, rx) = mpsc::channel::<Bytes>(8);

    tokio::spawn(async move {
        let mut gate = LatestGate::new();
        let mut feed = spawn_shop_feed(pg_db, redis_db);
        while let Some(current) = feed.recv().await {
            if !gate.admit(current.updated_at) {
                continue;
            }
            if out.send(sse_frame("shop", &current)).await.is_err() {
                break;
            }
        }
    });

    receiver_stream(rx).map(Ok::<_, actix_web::Error>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn gate_admits_only_strictly_newer_updates() {
        let mut gate = LatestGate::new();
        assert!(gate.admit(ts(10)));
        assert!(!gate.admit(ts(10)), "duplicate must be dropped");
        assert!(!gate.admit(ts(5)), "stale must be dropped");
        assert!(gate.admit(ts(11)));
    }

    #[test]
    fn sse_frame_is_well_formed() {
        #[derive(Serialize)]
        struct Payload {
            value: u32,
        }

        let frame = sse_frame("status", &Payload { value: 7 });
        let text = std::str::from_utf8(&frame).unwrap();
        assert_eq!(text, "event: status\ndata: {\"value\":7}\n\n");
    }

    #[test]
    fn terminal_detection_tolerates_garbage() {
        assert!(is_terminal("completed"));
        assert!(is_terminal("collected"));
        assert!(!is_terminal("preparing"));
        assert!(!is_terminal("not-a-status"));
    }

    #[tokio::test]
    async fn frames_produced_on_another_task_reach_the_stream() {
        let (out, rx) = mpsc::channel::<Bytes>(4);

        tokio::spawn(async move {
            let _ = out
                .send(sse_frame("status", &serde_json::json!({ "n": 1 })))
                .await;
        });

        let frames: Vec<Bytes> = receiver_stream(rx).collect().await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with(b"event: status\n"));
    }

    #[tokio::test]
    async fn closed_feed_stops_delivering() {
        let (tx, rx) = mpsc::channel::<u32>(4);
        let cancel = CancellationToken::new();
        let feed = StatusFeed { rx, cancel: cancel.clone() };

        feed.close();
        assert!(cancel.is_cancelled());

        // producers observe the cancellation and stop sending
        drop(tx);
        let mut feed = feed;
        assert!(feed.recv().await.is_none());
    }
}
