use actix::Handler;
use chrono::Utc;
use diesel::{
    r2d2::{ConnectionManager, Pool, PooledConnection},
    result::{DatabaseErrorKind, Error},
    ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl,
};

use crate::services::db_models::{MenuItem, Order, OrderItem, ShopStatus, VariantOption};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{DefaultShopStatus, NewOrder, NewOrderItem, NewVariant};
use crate::services::lifecycle::{apply_transition, OrderStatus, COMPLETED};
use crate::services::messages::{
    AddVariant, FetchActiveOrders, FetchMenu, FetchOrderByNumber, FetchShopStatus,
    FetchTrackedOrder, FetchVariants, PlaceOrder, RemoveVariant, UpdateMenuItem,
    UpdateOrderStatus, UpdateShopStatus,
};
use crate::services::placement::draw_verification_code;

fn establish_connection(
    pool: &Pool<ConnectionManager<PgConnection>>,
) -> Result<PooledConnection<ConnectionManager<PgConnection>>, Error> {
    match pool.get() {
        Ok(val) => Ok(val),
        Err(_) => Err(connection_err()),
    }
}

fn connection_err() -> Error {
    Error::DatabaseError(
        DatabaseErrorKind::ClosedConnection,
        Box::new("Failed to establish connection".to_owned()),
    )
}

fn get_db_err(msg: &str) -> Error {
    Error::DatabaseError(
        DatabaseErrorKind::UnableToSendCommand,
        Box::new(msg.to_owned()),
    )
}

impl Handler<FetchMenu> for PgActor {
    type Result = QueryResult<Vec<MenuItem>>;

    fn handle(&mut self, _msg: FetchMenu, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::menu_items::{base_name, dsl::menu_items, size_code};

        let mut conn = establish_connection(&self.0)?;

        menu_items
            .order((base_name.asc(), size_code.asc()))
            .get_results::<MenuItem>(&mut conn)
    }
}

impl Handler<UpdateMenuItem> for PgActor {
    type Result = QueryResult<MenuItem>;

    fn handle(&mut self, msg: UpdateMenuItem, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::menu_items::dsl::menu_items;

        if msg.patch.is_empty() {
            return Err(get_db_err("No mutable field supplied"));
        }

        let mut conn = establish_connection(&self.0)?;

        diesel::update(menu_items.find(msg.id))
            .set(&msg.patch)
            .get_result::<MenuItem>(&mut conn)
    }
}

impl Handler<FetchVariants> for PgActor {
    type Result = QueryResult<Vec<VariantOption>>;

    fn handle(&mut self, _msg: FetchVariants, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::variant_options::{display_order, dsl::variant_options, is_active};

        let mut conn = establish_connection(&self.0)?;

        variant_options
            .filter(is_active.eq(true))
            .order(display_order.asc())
            .get_results::<VariantOption>(&mut conn)
    }
}

impl Handler<AddVariant> for PgActor {
    type Result = QueryResult<VariantOption>;

    fn handle(&mut self, msg: AddVariant, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::variant_options::{display_order, dsl::variant_options};
        use diesel::dsl::max;

        let mut conn = establish_connection(&self.0)?;

        conn.build_transaction().run(|trx_conn| {
            let last: Option<i32> = variant_options
                .select(max(display_order))
                .first(trx_conn)?;

            diesel::insert_into(variant_options)
                .values(NewVariant {
                    name: msg.0,
                    is_active: true,
                    display_order: last.unwrap_or(0) + 1,
                })
                .get_result::<VariantOption>(trx_conn)
        })
    }
}

impl Handler<RemoveVariant> for PgActor {
    type Result = QueryResult<usize>;

    fn handle(&mut self, msg: RemoveVariant, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::variant_options::{dsl::variant_options, name};

        let mut conn = establish_connection(&self.0)?;

        // Shrinks future selectability only; order_items keep their snapshot.
        diesel::delete(variant_options.filter(name.eq(msg.0))).execute(&mut conn)
    }
}

impl Handler<PlaceOrder> for PgActor {
    type Result = QueryResult<Order>;

    fn handle(&mut self, msg: PlaceOrder, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::order_items::dsl::order_items;
        use crate::schema::orders::{dsl::orders, status, verification_code};

        let mut conn = establish_connection(&self.0)?;

        // Order row and its items are one transaction: an item failure rolls
        // the order row back instead of leaving a half-written order behind.
        conn.build_transaction().run(|trx_conn| {
            let mut rng = rand::thread_rng();
            let mut code = None;
            for _ in 0..16 {
                let candidate = draw_verification_code(&mut rng);
                let clashes: i64 = orders
                    .filter(verification_code.eq(candidate))
                    .filter(status.ne(COMPLETED))
                    .count()
                    .get_result(trx_conn)?;
                if clashes == 0 {
                    code = Some(candidate);
                    break;
                }
            }
            let code = code.ok_or_else(|| get_db_err("Could not allocate a unique verification code"))?;

            let now = Utc::now();
            let order = diesel::insert_into(orders)
                .values(NewOrder {
                    verification_code: code,
                    status: OrderStatus::Pending.as_str().to_owned(),
                    total_amount: msg.total_amount,
                    created_at: now,
                    updated_at: now,
                })
                .get_result::<Order>(trx_conn)?;

            for line in msg.lines {
                diesel::insert_into(order_items)
                    .values(NewOrderItem {
                        order_id: order.id,
                        base_name: line.base_name,
                        size_code: line.size_code,
                        protein: line.protein,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        total_amount: line.total_amount,
                    })
                    .execute(trx_conn)?;
            }

            Ok(order)
        })
    }
}

impl Handler<FetchActiveOrders> for PgActor {
    type Result = QueryResult<Vec<Order>>;

    fn handle(&mut self, _msg: FetchActiveOrders, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::orders::{created_at, dsl::orders, status};

        let mut conn = establish_connection(&self.0)?;

        orders
            .filter(status.ne(COMPLETED))
            .order(created_at.asc())
            .get_results::<Order>(&mut conn)
    }
}

impl Handler<FetchOrderByNumber> for PgActor {
    type Result = QueryResult<Order>;

    fn handle(&mut self, msg: FetchOrderByNumber, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::orders::{dsl::orders, order_number};

        let mut conn = establish_connection(&self.0)?;

        orders.filter(order_number.eq(msg.0)).first::<Order>(&mut conn)
    }
}

impl Handler<FetchTrackedOrder> for PgActor {
    type Result = QueryResult<(Order, Vec<OrderItem>)>;

    fn handle(&mut self, msg: FetchTrackedOrder, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::order_items::{dsl::order_items, order_id};
        use crate::schema::orders::{dsl::orders, order_number};

        let mut conn = establish_connection(&self.0)?;

        let order = orders
            .filter(order_number.eq(msg.order_number))
            .first::<Order>(&mut conn)?;

        // A wrong code is indistinguishable from a missing order on purpose.
        if order.verification_code != msg.verification_code {
            return Err(Error::NotFound);
        }

        let items = order_items
            .filter(order_id.eq(order.id))
            .get_results::<OrderItem>(&mut conn)?;

        Ok((order, items))
    }
}

impl Handler<UpdateOrderStatus> for PgActor {
    type Result = QueryResult<Order>;

    fn handle(&mut self, msg: UpdateOrderStatus, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::orders::{dsl::orders, order_number, status, updated_at};

        let mut conn = establish_connection(&self.0)?;

        conn.build_transaction().run(|trx_conn| {
            let order = orders
                .filter(order_number.eq(msg.order_number))
                .first::<Order>(trx_conn)?;

            let current = order
                .status
                .parse::<OrderStatus>()
                .map_err(|err| get_db_err(&err))?;

            let persisted = apply_transition(current, msg.requested)
                .map_err(|err| get_db_err(&err))?;

            diesel::update(orders.filter(order_number.eq(msg.order_number)))
                .set((
                    status.eq(persisted.as_str()),
                    updated_at.eq(Utc::now()),
                ))
                .get_result::<Order>(trx_conn)
        })
    }
}

fn ensure_shop_status_row(conn: &mut PgConnection) -> QueryResult<ShopStatus> {
    use crate::schema::shop_status::dsl::shop_status;

    match shop_status.find(1_i64).first::<ShopStatus>(conn) {
        Ok(row) => Ok(row),
        Err(Error::NotFound) => {
            diesel::insert_into(shop_status)
                .values(DefaultShopStatus::closed_now())
                .on_conflict_do_nothing()
                .execute(conn)?;

            shop_status.find(1_i64).first::<ShopStatus>(conn)
        }
        Err(err) => Err(err),
    }
}

impl Handler<FetchShopStatus> for PgActor {
    type Result = QueryResult<ShopStatus>;

    fn handle(&mut self, _msg: FetchShopStatus, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = establish_connection(&self.0)?;

        ensure_shop_status_row(&mut conn)
    }
}

impl Handler<UpdateShopStatus> for PgActor {
    type Result = QueryResult<ShopStatus>;

    fn handle(&mut self, msg: UpdateShopStatus, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::shop_status::dsl::shop_status;

        let mut conn = establish_connection(&self.0)?;

        conn.build_transaction().run(|trx_conn| {
            ensure_shop_status_row(trx_conn)?;

            let mut patch = msg.0;
            patch.updated_at = Some(Utc::now());

            diesel::update(shop_status.find(1_i64))
                .set(&patch)
                .get_result::<ShopStatus>(trx_conn)
        })
    }
}
