use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable};

use crate::schema::menu_items;
use crate::schema::order_items;
use crate::schema::orders;
use crate::schema::shop_status;
use crate::schema::variant_options;

#[derive(Insertable, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub verification_code: i32,
    pub status: String,
    pub total_amount: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub base_name: String,
    pub size_code: String,
    pub protein: String,
    pub quantity: i32,
    pub unit_price: i32,
    pub total_amount: i32,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = variant_options)]
pub struct NewVariant {
    pub name: String,
    pub is_active: bool,
    pub display_order: i32,
}

#[derive(AsChangeset, Clone, Default)]
#[diesel(table_name = menu_items)]
pub struct MenuItemPatch {
    pub price: Option<i32>,
    pub is_available: Option<bool>,
    pub stock_quantity: Option<i32>,
}

impl MenuItemPatch {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.is_available.is_none() && self.stock_quantity.is_none()
    }
}

#[derive(AsChangeset, Clone, Default)]
#[diesel(table_name = shop_status)]
pub struct ShopStatusPatch {
    pub is_open: Option<bool>,
    pub status_message: Option<String>,
    pub opening_hours: Option<String>,
    pub accepting_orders: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = shop_status)]
pub struct DefaultShopStatus {
    pub id: i64,
    pub is_open: bool,
    pub status_message: String,
    pub opening_hours: String,
    pub accepting_orders: bool,
    pub updated_at: DateTime<Utc>,
}

impl DefaultShopStatus {
    pub fn closed_now() -> Self {
        Self {
            id: 1,
            is_open: false,
            status_message: "Closed".to_owned(),
            opening_hours: String::new(),
            accepting_orders: false,
            updated_at: Utc::now(),
        }
    }
}
