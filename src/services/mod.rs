use actix_web::{get, HttpResponse, Responder};
use serde::Serialize;

pub mod auth;
pub mod catalog;
pub mod db_models;
pub mod db_utils;
pub mod insertable;
pub mod lifecycle;
pub mod live_feed;
pub mod messages;
pub mod pg_handling;
pub mod placement;
pub mod redis_handling;

#[derive(Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[get("/")]
pub async fn home_page() -> impl Responder {
    HttpResponse::Ok().body("Montana Grill ordering service")
}

// sub-route "/menu"
pub mod menu_route {
    use actix_web::web::{Data, Json, Query};
    use actix_web::{delete, get, post, put, HttpRequest, HttpResponse, Responder};
    use diesel::result::{DatabaseErrorKind, Error};
    use serde::Deserialize;
    use tracing::error;

    use crate::services::auth::authorize_admin;
    use crate::services::catalog::group_menu;
    use crate::services::db_utils::AppState;
    use crate::services::insertable::MenuItemPatch;
    use crate::services::messages::{AddVariant, FetchMenu, FetchVariants, RemoveVariant, UpdateMenuItem};
    use crate::services::Ack;

    #[get("")]
    pub async fn view_menu(state: Data<AppState>) -> impl Responder {
        match state.pg_db.send(FetchMenu).await {
            Ok(Ok(rows)) => {
                HttpResponse::Ok().json(serde_json::json!({ "menuItems": group_menu(rows) }))
            }
            Ok(Err(err)) => {
                error!(%err, "menu fetch failed");
                HttpResponse::InternalServerError().json(Ack::fail("Unable to fetch menu"))
            }
            Err(err) => {
                error!(%err, "menu fetch mailbox failure");
                HttpResponse::InternalServerError().json(Ack::fail("Unable to fetch menu"))
            }
        }
    }

    #[derive(Deserialize)]
    pub struct UpdateItemBody {
        pub id: i64,
        pub price: Option<i32>,
        pub is_available: Option<bool>,
        pub stock_quantity: Option<i32>,
    }

    #[put("/item")]
    pub async fn update_item(
        state: Data<AppState>,
        req: HttpRequest,
        body: Json<UpdateItemBody>,
    ) -> impl Responder {
        if let Err(denied) = authorize_admin(&req, &state) {
            return denied;
        }

        let patch = MenuItemPatch {
            price: body.price,
            is_available: body.is_available,
            stock_quantity: body.stock_quantity,
        };
        if patch.is_empty() {
            return HttpResponse::BadRequest()
                .json(Ack::fail("At least one of price/is_available/stock_quantity is required"));
        }

        match state.pg_db.send(UpdateMenuItem { id: body.id, patch }).await {
            Ok(Ok(item)) => HttpResponse::Ok()
                .json(Ack::ok(format!("Menu item {} updated", item.id))),
            Ok(Err(Error::NotFound)) => {
                HttpResponse::NotFound().json(Ack::fail("Menu item not found"))
            }
            Ok(Err(err)) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to update menu item: {err}"))),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to update menu item: {err}"))),
        }
    }

    #[get("/variants")]
    pub async fn list_variants(state: Data<AppState>) -> impl Responder {
        match state.pg_db.send(FetchVariants).await {
            Ok(Ok(variants)) => HttpResponse::Ok().json(variants),
            Ok(Err(err)) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to fetch variants: {err}"))),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to fetch variants: {err}"))),
        }
    }

    #[derive(Deserialize)]
    pub struct VariantBody {
        pub variant_name: String,
    }

    #[post("/variants")]
    pub async fn add_variant(
        state: Data<AppState>,
        req: HttpRequest,
        body: Json<VariantBody>,
    ) -> impl Responder {
        if let Err(denied) = authorize_admin(&req, &state) {
            return denied;
        }

        let name = body.variant_name.trim().to_owned();
        if name.is_empty() {
            return HttpResponse::BadRequest().json(Ack::fail("variant_name must not be empty"));
        }

        match state.pg_db.send(AddVariant(name.clone())).await {
            Ok(Ok(variant)) => {
                HttpResponse::Ok().json(Ack::ok(format!("Variant '{}' added", variant.name)))
            }
            Ok(Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))) => {
                HttpResponse::Conflict().json(Ack::fail(format!("Variant '{name}' already exists")))
            }
            Ok(Err(err)) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to add variant: {err}"))),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to add variant: {err}"))),
        }
    }

    #[delete("/variants")]
    pub async fn remove_variant(
        state: Data<AppState>,
        req: HttpRequest,
        query: Query<VariantBody>,
    ) -> impl Responder {
        if let Err(denied) = authorize_admin(&req, &state) {
            return denied;
        }

        match state.pg_db.send(RemoveVariant(query.variant_name.clone())).await {
            Ok(Ok(0)) => HttpResponse::NotFound().json(Ack::fail("Variant not found")),
            Ok(Ok(_)) => HttpResponse::Ok()
                .json(Ack::ok(format!("Variant '{}' removed", query.variant_name))),
            Ok(Err(err)) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to remove variant: {err}"))),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to remove variant: {err}"))),
        }
    }
}

// sub-route "/order"
pub mod order_route {
    use actix_web::web::{Data, Json, Path, Query};
    use actix_web::{get, post, put, HttpRequest, HttpResponse, Responder};
    use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error};
    use serde::{Deserialize, Serialize};
    use tracing::{error, info};

    use crate::services::auth::{authorize_admin, client_key};
    use crate::services::db_models::{Order, OrderItem};
    use crate::services::db_utils::AppState;
    use crate::services::lifecycle::OrderStatus;
    use crate::services::live_feed::stream_order_events;
    use crate::services::messages::{FetchTrackedOrder, PlaceOrder, UpdateOrderStatus};
    use crate::services::placement::{validate_draft, OrderDraft};
    use crate::services::redis_handling::publish_order_status;
    use crate::services::shop_route::current_shop_status;
    use crate::services::Ack;
    use crate::types::OrderIntakeError;

    #[derive(Serialize)]
    struct TrackedOrder {
        #[serde(flatten)]
        order: Order,
        items: Vec<OrderItem>,
    }

    #[post("/create")]
    pub async fn create_order(
        state: Data<AppState>,
        req: HttpRequest,
        body: Json<OrderDraft>,
    ) -> impl Responder {
        if !state.intake_limiter.check(&client_key(&req)) {
            return HttpResponse::TooManyRequests()
                .json(Ack::fail(OrderIntakeError::Throttled.to_string()));
        }

        match current_shop_status(&state).await {
            Some(current) if !current.accepting_orders => {
                return HttpResponse::Conflict()
                    .json(Ack::fail(OrderIntakeError::ShopClosed.to_string()));
            }
            Some(_) => {}
            None => {
                return HttpResponse::InternalServerError()
                    .json(Ack::fail("Unable to verify shop status, try again"));
            }
        }

        let lines = match validate_draft(&body) {
            Ok(lines) => lines,
            Err(err) => return HttpResponse::BadRequest().json(Ack::fail(err.to_string())),
        };

        match state
            .pg_db
            .send(PlaceOrder { lines, total_amount: body.total_amount })
            .await
        {
            Ok(Ok(order)) => {
                info!(order_number = order.order_number, "order placed");
                publish_order_status(&state.redis_db, &order);
                HttpResponse::Ok().json(serde_json::json!({ "order": order }))
            }
            Ok(Err(err)) => {
                error!(%err, "order placement failed");
                HttpResponse::InternalServerError().json(Ack::fail("Unable to place order"))
            }
            Err(err) => {
                error!(%err, "order placement mailbox failure");
                HttpResponse::InternalServerError().json(Ack::fail("Unable to place order"))
            }
        }
    }

    #[derive(Deserialize)]
    pub struct TrackQuery {
        pub order_number: i64,
        pub verification_number: i32,
    }

    #[get("/track")]
    pub async fn track_order(state: Data<AppState>, query: Query<TrackQuery>) -> impl Responder {
        match state
            .pg_db
            .send(FetchTrackedOrder {
                order_number: query.order_number,
                verification_code: query.verification_number,
            })
            .await
        {
            Ok(Ok((order, items))) => HttpResponse::Ok()
                .json(serde_json::json!({ "order": TrackedOrder { order, items } })),
            Ok(Err(Error::NotFound)) => HttpResponse::NotFound().json(Ack::fail("Order not found")),
            Ok(Err(err)) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to track order: {err}"))),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to track order: {err}"))),
        }
    }

    #[derive(Deserialize)]
    pub struct EventsQuery {
        pub verification_number: i32,
    }

    #[get("/{order_number}/events")]
    pub async fn order_events(
        state: Data<AppState>,
        path: Path<i64>,
        query: Query<EventsQuery>,
    ) -> impl Responder {
        let order_number = path.into_inner();

        // Same credential pair as the tracking lookup gates the feed.
        let initial = match state
            .pg_db
            .send(FetchTrackedOrder {
                order_number,
                verification_code: query.verification_number,
            })
            .await
        {
            Ok(Ok((order, _))) => order,
            Ok(Err(Error::NotFound)) => {
                return HttpResponse::NotFound().json(Ack::fail("Order not found"))
            }
            Ok(Err(err)) => {
                return HttpResponse::InternalServerError()
                    .json(Ack::fail(format!("Unable to open feed: {err}")))
            }
            Err(err) => {
                return HttpResponse::InternalServerError()
                    .json(Ack::fail(format!("Unable to open feed: {err}")))
            }
        };

        HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .streaming(stream_order_events(
                state.pg_db.clone(),
                state.redis_db.clone(),
                initial,
            ))
    }

    #[derive(Deserialize)]
    pub struct StatusBody {
        pub order_number: i64,
        pub status: String,
    }

    #[put("/status")]
    pub async fn update_status(
        state: Data<AppState>,
        req: HttpRequest,
        body: Json<StatusBody>,
    ) -> impl Responder {
        if let Err(denied) = authorize_admin(&req, &state) {
            return denied;
        }

        let requested = match body.status.parse::<OrderStatus>() {
            Ok(requested) => requested,
            Err(err) => return HttpResponse::BadRequest().json(Ack::fail(err)),
        };

        match state
            .pg_db
            .send(UpdateOrderStatus { order_number: body.order_number, requested })
            .await
        {
            Ok(Ok(order)) => {
                info!(order_number = order.order_number, status = %order.status, "order status updated");
                publish_order_status(&state.redis_db, &order);
                HttpResponse::Ok().json(serde_json::json!({ "success": true, "order": order }))
            }
            Ok(Err(err)) => update_failure_response(err),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to update status: {err}"))),
        }
    }

    /// Status-update errors: a missing order is 404, a transition-rule
    /// violation (raised as `UnableToSendCommand` by the handler) is 409,
    /// anything else is an opaque 500.
    fn update_failure_response(err: Error) -> HttpResponse {
        match err {
            Error::NotFound => HttpResponse::NotFound().json(Ack::fail("Order not found")),
            Error::DatabaseError(DatabaseErrorKind::UnableToSendCommand, info) => {
                HttpResponse::Conflict().json(Ack::fail(info.message()))
            }
            err => {
                error!(%err, "order status update failed");
                HttpResponse::InternalServerError().json(Ack::fail("Unable to update status"))
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use actix_web::http::StatusCode;

        use super::*;

        fn db_err(kind: DatabaseErrorKind) -> Error {
            Error::DatabaseError(kind, Box::new("boom".to_owned()))
        }

        #[test]
        fn status_update_errors_map_to_http_codes() {
            assert_eq!(
                update_failure_response(Error::NotFound).status(),
                StatusCode::NOT_FOUND
            );
            assert_eq!(
                update_failure_response(db_err(DatabaseErrorKind::UnableToSendCommand)).status(),
                StatusCode::CONFLICT
            );
            assert_eq!(
                update_failure_response(db_err(DatabaseErrorKind::ClosedConnection)).status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
            assert_eq!(
                update_failure_response(Error::RollbackTransaction).status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}

// sub-route "/orders" (staff dashboard)
pub mod orders_route {
    use actix_web::web::Data;
    use actix_web::{get, HttpRequest, HttpResponse, Responder};

    use crate::services::auth::authorize_admin;
    use crate::services::db_utils::AppState;
    use crate::services::live_feed::stream_dashboard_events;
    use crate::services::messages::FetchActiveOrders;
    use crate::services::Ack;

    #[get("/all")]
    pub async fn list_active(state: Data<AppState>, req: HttpRequest) -> impl Responder {
        if let Err(denied) = authorize_admin(&req, &state) {
            return denied;
        }

        match state.pg_db.send(FetchActiveOrders).await {
            Ok(Ok(active)) => HttpResponse::Ok().json(serde_json::json!({ "orders": active })),
            Ok(Err(err)) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to fetch orders: {err}"))),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to fetch orders: {err}"))),
        }
    }

    #[get("/events")]
    pub async fn dashboard_events(state: Data<AppState>, req: HttpRequest) -> impl Responder {
        if let Err(denied) = authorize_admin(&req, &state) {
            return denied;
        }

        HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .streaming(stream_dashboard_events(
                state.pg_db.clone(),
                state.redis_db.clone(),
            ))
    }
}

// sub-route "/shop"
pub mod shop_route {
    use actix_web::web::{Data, Json};
    use actix_web::{get, post, HttpRequest, HttpResponse, Responder};
    use serde::Deserialize;
    use tracing::warn;

    use crate::services::auth::authorize_admin;
    use crate::services::db_models::ShopStatus;
    use crate::services::db_utils::AppState;
    use crate::services::insertable::ShopStatusPatch;
    use crate::services::live_feed::stream_shop_events;
    use crate::services::messages::{FetchShopStatus, UpdateShopStatus};
    use crate::services::redis_handling::{cache_shop_status, get_cached_shop_status, publish_shop_status};
    use crate::services::Ack;

    /// Cache-first read of the singleton; a cold cache is repopulated from
    /// Postgres.
    pub async fn current_shop_status(state: &AppState) -> Option<ShopStatus> {
        if let Some(cached) = get_cached_shop_status(&state.redis_db) {
            return Some(cached);
        }

        match state.pg_db.send(FetchShopStatus).await {
            Ok(Ok(current)) => {
                if let Err(err) = cache_shop_status(&state.redis_db, &current) {
                    warn!(%err, "shop status cache refresh failed");
                }
                Some(current)
            }
            _ => None,
        }
    }

    #[get("/status")]
    pub async fn get_status(state: Data<AppState>) -> impl Responder {
        match current_shop_status(&state).await {
            Some(current) => HttpResponse::Ok().json(current),
            None => HttpResponse::InternalServerError()
                .json(Ack::fail("Unable to fetch shop status")),
        }
    }

    #[derive(Deserialize)]
    pub struct ShopUpdateBody {
        pub action: Option<String>,
        pub status: Option<String>,
        pub opening_hours: Option<String>,
        pub accepting_orders: Option<bool>,
    }

    #[post("/status")]
    pub async fn update_status(
        state: Data<AppState>,
        req: HttpRequest,
        body: Json<ShopUpdateBody>,
    ) -> impl Responder {
        if let Err(denied) = authorize_admin(&req, &state) {
            return denied;
        }

        let is_open = match body.action.as_deref() {
            Some("open") => Some(true),
            Some("close") => Some(false),
            None => None,
            Some(other) => {
                return HttpResponse::BadRequest()
                    .json(Ack::fail(format!("Unknown action '{other}'")));
            }
        };

        let patch = ShopStatusPatch {
            is_open,
            status_message: body.status.clone(),
            opening_hours: body.opening_hours.clone(),
            // closing the shop stops intake unless explicitly overridden
            accepting_orders: body.accepting_orders.or(is_open),
            updated_at: None,
        };

        match state.pg_db.send(UpdateShopStatus(patch)).await {
            Ok(Ok(current)) => {
                if let Err(err) = cache_shop_status(&state.redis_db, &current) {
                    warn!(%err, "shop status cache refresh failed");
                }
                publish_shop_status(&state.redis_db, &current);
                HttpResponse::Ok().json(current)
            }
            Ok(Err(err)) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to update shop status: {err}"))),
            Err(err) => HttpResponse::InternalServerError()
                .json(Ack::fail(format!("Unable to update shop status: {err}"))),
        }
    }

    #[get("/events")]
    pub async fn shop_events(state: Data<AppState>) -> impl Responder {
        HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .streaming(stream_shop_events(
                state.pg_db.clone(),
                state.redis_db.clone(),
            ))
    }
}

// sub-route "/test"
pub mod test_route {
    use actix_web::{get, HttpResponse, Responder};

    #[get("/healthcheck")]
    pub async fn healthcheck() -> impl Responder {
        HttpResponse::Ok().body("I'm alive!")
    }
}
