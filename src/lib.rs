//! # brewgate
//!
//! The identity and audit core of a small storefront backend.
//!
//! Two pieces carry the weight:
//!
//! - [`auth`]: issues signed, one-hour identity tokens at login and checks
//!   them on every protected route, optionally demanding a role.
//! - [`journal`]: records every request that reaches the service, with the
//!   status it was answered with, and serves that record as JSON.
//!
//! Around them sits a small HTTP layer: a radix-tree [`Router`] with
//! per-route guards and router-wide [`middleware`] layers, served by hyper
//! with graceful shutdown. Users live behind the
//! [`UserDirectory`](directory::UserDirectory) trait, products behind
//! [`Catalog`](catalog::Catalog), orders behind
//! [`OrderBook`](orders::OrderBook), profile pictures behind
//! [`ImageStore`](images::ImageStore), and mail goes out through
//! [`Mailer`](mail::Mailer). Each has an in-process implementation.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use brewgate::app::{self, AppState};
//! use brewgate::auth::{Denylist, TokenService};
//! use brewgate::catalog::MemoryCatalog;
//! use brewgate::directory::MemoryDirectory;
//! use brewgate::images::MemoryImageStore;
//! use brewgate::journal::Journal;
//! use brewgate::mail::LogMailer;
//! use brewgate::orders::MemoryOrderBook;
//! use brewgate::Server;
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), brewgate::Error> {
//!     let secret = SecretString::from("change-me".to_owned());
//!     let state = Arc::new(AppState {
//!         tokens: Arc::new(TokenService::new(&secret).with_denylist(Arc::new(Denylist::new()))),
//!         journal: Journal::new(),
//!         directory: Arc::new(MemoryDirectory::new()),
//!         mailer: Arc::new(LogMailer),
//!         catalog: Arc::new(MemoryCatalog::new()),
//!         orders: Arc::new(MemoryOrderBook::new()),
//!         images: Arc::new(MemoryImageStore::new()),
//!         allowed_origins: Vec::new(),
//!     });
//!
//!     Server::bind(([0, 0, 0, 0], 3000).into()).serve(app::router(state)).await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod api;
pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod cors;
pub mod directory;
pub mod health;
pub mod images;
pub mod journal;
pub mod mail;
pub mod middleware;
pub mod orders;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;
