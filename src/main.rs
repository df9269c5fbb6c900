use std::fs;
use std::path::Path;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::info;
use tracing_subscriber::EnvFilter;

use brewgate::app::{self, AppState};
use brewgate::auth::{Denylist, Role, TokenService};
use brewgate::catalog::{MemoryCatalog, NewProduct};
use brewgate::config::{AdminSeed, Config};
use brewgate::directory::{MemoryDirectory, NewUser, UserDirectory};
use brewgate::images::MemoryImageStore;
use brewgate::journal::Journal;
use brewgate::mail::LogMailer;
use brewgate::orders::MemoryOrderBook;
use brewgate::Server;

#[tokio::main]
async fn main() -> Result<(), brewgate::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let directory = Arc::new(MemoryDirectory::new());
    if let Some(seed) = &config.admin {
        seed_admin(directory.as_ref(), seed).await?;
    }

    let catalog = match &config.catalog_file {
        Some(path) => load_catalog(path)?,
        None => MemoryCatalog::new(),
    };

    let tokens = TokenService::new(&config.jwt_secret).with_denylist(Arc::new(Denylist::new()));
    let state = Arc::new(AppState {
        tokens: Arc::new(tokens),
        journal: Journal::new(),
        directory,
        mailer: Arc::new(LogMailer),
        catalog: Arc::new(catalog),
        orders: Arc::new(MemoryOrderBook::new()),
        images: Arc::new(MemoryImageStore::new()),
        allowed_origins: config.allowed_origins.clone(),
    });

    Server::bind(config.bind_addr()).serve(app::router(state)).await
}

async fn seed_admin(directory: &dyn UserDirectory, seed: &AdminSeed) -> Result<(), brewgate::Error> {
    let admin = directory
        .create(NewUser {
            name: "Administrator".to_owned(),
            email: seed.email.clone(),
            password: seed.password.expose_secret().to_owned(),
            address: String::new(),
            phone: String::new(),
            role: Role::Admin,
        })
        .await?;
    info!(user_id = admin.id, "admin account seeded");
    Ok(())
}

fn load_catalog(path: &Path) -> Result<MemoryCatalog, brewgate::Error> {
    let products: Vec<NewProduct> = serde_json::from_str(&fs::read_to_string(path)?)?;
    info!(path = %path.display(), products = products.len(), "catalog loaded");
    Ok(MemoryCatalog::with_products(products))
}
