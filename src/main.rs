use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use marketplace_backend::{
    AppState,
    config::Config,
    middleware::{auth_middleware, log_errors, role_guard},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'marketplace_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
    };

    // 公开路由
    let public_routes = Router::new()
        // 产品浏览
        .route("/products/list", get(routes::product::list_products))
        .route("/products/by-id", get(routes::product::find_by_id))
        .route("/products/featured", get(routes::product::find_featured))
        .route("/products/by-seller", get(routes::product::find_by_seller))
        .route("/products/seller-rating", get(routes::product::seller_rating))
        // 艺匠展示
        .route("/artisans/all", get(routes::artisan::find_all))
        .route("/artisans/list", get(routes::artisan::find_for_list))
        .route("/artisans/top", get(routes::artisan::top_artisans))
        .route("/artisans/by-user", get(routes::artisan::find_by_user));

    let protected_routes = Router::new()
        // 用户档案
        .route(
            "/profile",
            post(routes::profile::create_profile)
                .put(routes::profile::update_profile)
                .get(routes::profile::get_profile)
                .delete(routes::profile::delete_profile),
        )
        // 艺匠店铺档案管理
        .route("/artisans/me", get(routes::artisan::my_artisan_profile))
        .route("/artisans/create", post(routes::artisan::create_artisan_profile))
        .route("/artisans/update", put(routes::artisan::update_artisan_profile))
        .route("/artisans/delete", delete(routes::artisan::delete_artisan_profile))
        // 产品管理
        .route("/products/mine", get(routes::product::my_products))
        .route("/products/create", post(routes::product::create_product))
        .route("/products/update", put(routes::product::update_product))
        .route("/products/delete", delete(routes::product::delete_product))
        // 应用认证中间件
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    // 添加错误日志中间件与路由守卫；守卫在路由分发之前执行
    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(state.clone(), role_guard),
    );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = CorsLayer::permissive();
        router.layer(cors)
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Failed to start server");
}
