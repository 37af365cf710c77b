use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use duostory_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // sea-orm's `mock` test feature removes Clone from DatabaseConnection, so
    // the services share the pool through an Arc instead of cloning it
    let pool = Arc::new(pool);

    let plan_service = PlanService::new(pool.clone());
    let promotion_service = PromotionService::new(pool.clone());
    let customer_history_service = CustomerHistoryService::new(pool.clone());
    let checkout_service = CheckoutService::new(
        pool.clone(),
        plan_service.clone(),
        promotion_service.clone(),
    );

    // Background sweep: pending intents older than the TTL become expired so
    // abandoned checkouts never linger as pending.
    {
        let checkout_service_clone = checkout_service.clone();
        let ttl_minutes = config.checkout.intent_ttl_minutes;
        let sweep_seconds = config.checkout.expiry_sweep_seconds;
        tokio::spawn(async move {
            loop {
                match checkout_service_clone.expire_stale_intents(ttl_minutes).await {
                    Ok(0) => {}
                    Ok(n) => log::info!("Expired {} stale checkout intents", n),
                    Err(e) => log::error!("Failed to expire stale checkout intents: {:?}", e),
                }
                tokio::time::sleep(std::time::Duration::from_secs(sweep_seconds)).await;
            }
        });
    }

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(plan_service.clone()))
            .app_data(web::Data::new(promotion_service.clone()))
            .app_data(web::Data::new(customer_history_service.clone()))
            .app_data(web::Data::new(checkout_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::plan_config)
                    .configure(handlers::checkout_config)
                    .configure(handlers::admin_plan_config)
                    .configure(handlers::admin_promotion_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
