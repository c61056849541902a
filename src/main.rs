use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use gds_connect::{
    config::{self, Config, StoreKind, ENV_FILE},
    routes,
    store::{memory::MemoryStore, mongo::MongoStore, UserStore},
    users::Users,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber so RUST_LOG may come from the file.
    let env_file = config::load_env_file(ENV_FILE);

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match env_file? {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => info!("No {ENV_FILE} file found, using process environment"),
    }

    let config = Config::load()?;

    let store: Arc<dyn UserStore> = match config.store {
        StoreKind::Mongo => {
            Arc::new(MongoStore::connect(&config.mongodb_uri, &config.mongodb_database).await?)
        }
        StoreKind::Memory => {
            info!("Using in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };
    let users = web::Data::new(Users::new(store));

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(users.clone())
            .configure(routes::configure)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    info!("Binding to {}", config.bind_address);
    server.bind(&config.bind_address)?.run().await?;

    info!("Server shut down");
    Ok(())
}
