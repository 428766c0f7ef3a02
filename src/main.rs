use actix::{Addr, SyncArbiter};
use actix_cors::Cors;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use services::db_utils::{get_db_pool, AppState, PgActor};
use services::placement::RateLimiter;
use types::{Settings, INTAKE_MAX_PER_WINDOW, INTAKE_WINDOW_SECS};

mod schema;
mod services;
mod types;

fn load_settings() -> Settings {
    config::Config::builder()
        .add_source(config::Environment::default())
        .build()
        .expect("Failed to read configuration from environment")
        .try_deserialize::<Settings>()
        .expect("PG_DATABASE_URL, REDIS_DATABASE_URI and ADMIN_TOKEN must be set")
}

fn init_pg_db(settings: &Settings) -> Addr<PgActor> {
    let pool = get_db_pool(&settings.pg_database_url).expect("Failed to build postgres pool");

    SyncArbiter::start(5, move || PgActor(pool.clone()))
}

fn init_redis_db(settings: &Settings) -> redis::Client {
    redis::Client::open(settings.redis_database_uri.clone()).expect("Invalid redis URI")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let pg_db = init_pg_db(&settings);
    let redis_db = init_redis_db(&settings);
    let bind_addr = settings.bind_addr.clone();
    // one shared window across all HTTP workers
    let intake_limiter = RateLimiter::new(
        INTAKE_MAX_PER_WINDOW,
        std::time::Duration::from_secs(INTAKE_WINDOW_SECS),
    );

    info!(%bind_addr, "starting ordering service");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(Data::new(AppState {
                pg_db: pg_db.clone(),
                redis_db: redis_db.clone(),
                admin_token: settings.admin_token.clone(),
                intake_limiter: intake_limiter.clone(),
            }))
            .service(services::home_page)
            .service(
                web::scope("/menu")
                    .service(services::menu_route::view_menu)
                    .service(services::menu_route::update_item)
                    .service(services::menu_route::list_variants)
                    .service(services::menu_route::add_variant)
                    .service(services::menu_route::remove_variant),
            )
            .service(
                web::scope("/order")
                    .service(services::order_route::create_order)
                    .service(services::order_route::track_order)
                    .service(services::order_route::update_status)
                    .service(services::order_route::order_events),
            )
            .service(
                web::scope("/orders")
                    .service(services::orders_route::list_active)
                    .service(services::orders_route::dashboard_events),
            )
            .service(
                web::scope("/shop")
                    .service(services::shop_route::get_status)
                    .service(services::shop_route::update_status)
                    .service(services::shop_route::shop_events),
            )
            .service(web::scope("/test").service(services::test_route::healthcheck))
    })
    .bind(bind_addr)?
    .run()
    .await
}
