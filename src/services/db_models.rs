use chrono::{DateTime, Utc};
use diesel::Queryable;
use serde::Serialize;

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct MenuItem {
    pub id: i64,
    pub base_name: String,
    pub size_code: String,
    pub protein: String,
    pub price: i32,
    pub is_available: bool,
    pub stock_quantity: Option<i32>,
}

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct VariantOption {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub display_order: i32,
}

// Deserialize is needed on the subscriber side of the pub/sub feed.
#[derive(Queryable, Debug, Clone, Serialize, serde::Deserialize)]
pub struct Order {
    #[serde(skip)]
    pub id: i64,
    pub order_number: i64,
    #[serde(rename = "verification_number")]
    pub verification_code: i32,
    pub status: String,
    pub total_amount: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct OrderItem {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub order_id: i64,
    pub base_name: String,
    pub size_code: String,
    pub protein: String,
    pub quantity: i32,
    pub unit_price: i32,
    pub total_amount: i32,
}

#[derive(Queryable, Debug, Clone, Serialize, serde::Deserialize)]
pub struct ShopStatus {
    #[serde(skip_serializing, default)]
    pub id: i64,
    #[serde(rename = "isOpen")]
    pub is_open: bool,
    #[serde(rename = "status")]
    pub status_message: String,
    #[serde(rename = "openingHours")]
    pub opening_hours: String,
    #[serde(rename = "acceptingOrders")]
    pub accepting_orders: bool,
    pub updated_at: DateTime<Utc>,
}
