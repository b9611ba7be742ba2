mod config;
mod hooks;
mod http;

use actix_web::{middleware::Logger, web, App, HttpServer};
use color_eyre::eyre;
use scmhook::MAX_BODY_SIZE;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();
    color_eyre::install()?;
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .finish(),
    )?;

    let config::Config {
        bind,
        webhook_secret,
    } = envy::prefixed("SCMHOOK_").from_env()?;

    if webhook_secret.is_none() {
        tracing::warn!("`SCMHOOK_WEBHOOK_SECRET` is not set, deliveries won't be authenticated");
    }
    tracing::info!("Listening on {}", bind);

    HttpServer::new(move || {
        App::new()
            .app_data(http::WebhookConfig::new(webhook_secret.clone()))
            .app_data(web::PayloadConfig::new(MAX_BODY_SIZE))
            .wrap(Logger::default())
            .route("/{provider}", web::post().to(hooks::receive))
    })
    .bind(bind)?
    .run()
    .await
    .map_err(Into::into)
}
