mod config;
mod proxy;
mod routes;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ProxyConfig::from_env().expect("invalid proxy configuration");

    let token_store = config.open_token_store().expect("token store init failed");

    let proxy = proxy::Proxy::new(&config, token_store).expect("proxy init failed");
    let app = routes::app(state::AppState::new(proxy));

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, backend = %config.backend_url, "todo proxy listening");
    axum::serve(listener, app).await.expect("server failed");
}
