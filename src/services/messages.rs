use actix::Message;
use diesel::QueryResult;

use crate::services::db_models::{MenuItem, Order, OrderItem, ShopStatus, VariantOption};
use crate::services::insertable::{MenuItemPatch, ShopStatusPatch};
use crate::services::lifecycle::OrderStatus;
use crate::services::placement::OrderLine;

#[derive(Message)]
#[rtype(result = "QueryResult<Vec<MenuItem>>")]
pub struct FetchMenu;

#[derive(Message)]
#[rtype(result = "QueryResult<MenuItem>")]
pub struct UpdateMenuItem {
    pub id: i64,
    pub patch: MenuItemPatch,
}

#[derive(Message)]
#[rtype(result = "QueryResult<Vec<VariantOption>>")]
pub struct FetchVariants;

#[derive(Message)]
#[rtype(result = "QueryResult<VariantOption>")]
pub struct AddVariant(pub String);

#[derive(Message)]
#[rtype(result = "QueryResult<usize>")]
pub struct RemoveVariant(pub String);

#[derive(Message)]
#[rtype(result = "QueryResult<Order>")]
pub struct PlaceOrder {
    pub lines: Vec<OrderLine>,
    pub total_amount: i32,
}

#[derive(Message)]
#[rtype(result = "QueryResult<Vec<Order>>")]
pub struct FetchActiveOrders;

#[derive(Message)]
#[rtype(result = "QueryResult<Order>")]
pub struct FetchOrderByNumber(pub i64);

#[derive(Message)]
#[rtype(result = "QueryResult<(Order, Vec<OrderItem>)>")]
pub struct FetchTrackedOrder {
    pub order_number: i64,
    pub verification_code: i32,
}

#[derive(Message)]
#[rtype(result = "QueryResult<Order>")]
pub struct UpdateOrderStatus {
    pub order_number: i64,
    pub requested: OrderStatus,
}

#[derive(Message)]
#[rtype(result = "QueryResult<ShopStatus>")]
pub struct FetchShopStatus;

#[derive(Message)]
#[rtype(result = "QueryResult<ShopStatus>")]
pub struct UpdateShopStatus(pub ShopStatusPatch);
