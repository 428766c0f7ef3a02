use serde::Serialize;
use tracing::warn;

use crate::services::db_models::{Order, ShopStatus};

pub const ORDERS_CHANNEL: &str = "order-status.all";
pub const SHOP_CHANNEL: &str = "shop-status";
const SHOP_STATUS_KEY: &str = "shop-status_current";

pub fn order_channel(order_number: i64) -> String {
    format!("order-status.{order_number}")
}

fn publish_json<T: Serialize>(db: &redis::Client, channel: &str, payload: &T) -> Result<(), String> {
    let body = match serde_json::to_string(payload) {
        Ok(body) => body,
        Err(_) => return Err("Failed to compose JSON payload for publish".into()),
    };

    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into()),
    };

    match redis::cmd("PUBLISH").arg(channel).arg(body).query::<()>(&mut conn) {
        Ok(()) => Ok(()),
        Err(_) => Err(format!("Failed to publish to channel '{channel}'")),
    }
}

/// Fans an order-status change out to the per-order channel and the
/// dashboard firehose. Publishing is best effort: the status write has
/// already been persisted, so a feed miss only delays the next poll.
pub fn publish_order_status(db: &redis::Client, order: &Order) {
    for channel in [order_channel(order.order_number), ORDERS_CHANNEL.to_owned()] {
        if let Err(err) = publish_json(db, &channel, order) {
            warn!(order_number = order.order_number, channel, %err, "order status publish failed");
        }
    }
}

pub fn publish_shop_status(db: &redis::Client, current: &ShopStatus) {
    if let Err(err) = publish_json(db, SHOP_CHANNEL, current) {
        warn!(%err, "shop status publish failed");
    }
}

/// Refreshes the read-mostly shop-status cache after an admin write.
pub fn cache_shop_status(db: &redis::Client, current: &ShopStatus) -> Result<(), String> {
    let body = match serde_json::to_string(current) {
        Ok(body) => body,
        Err(_) => return Err("Failed to compose JSON object of shop status".into()),
    };

    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(_) => return Err("Failed to establish connection with redis".into()),
    };

    match redis::cmd("SET").arg(SHOP_STATUS_KEY).arg(body).query::<()>(&mut conn) {
        Ok(()) => Ok(()),
        Err(_) => Err("Failed to write shop status to redis".into()),
    }
}

/// Cached shop status, if the cache is warm and parseable. Any failure just
/// sends the caller to Postgres.
pub fn get_cached_shop_status(db: &redis::Client) -> Option<ShopStatus> {
    let mut conn = db.get_connection().ok()?;

    let body: String = redis::cmd("GET").arg(SHOP_STATUS_KEY).query(&mut conn).ok()?;

    match serde_json::from_str::<ShopStatus>(&body) {
        Ok(current) => Some(current),
        Err(err) => {
            warn!(%err, "discarding unparseable cached shop status");
            None
        }
    }
}
