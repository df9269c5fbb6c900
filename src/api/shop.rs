use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{body, caller, caller_for_path, path_id, ApiError, FieldError};
use crate::app::AppState;
use crate::auth::AuthError;
use crate::catalog::Product;
use crate::directory::UserRecord;
use crate::images::Image;
use crate::orders::{Order, OrderLine};
use crate::request::Request;
use crate::response::{Json, Response};
use crate::status::Status;

const DEFAULT_IMAGE_TYPE: &str = "application/octet-stream";

// ── catalog ──────────────────────────────────────────────────────────────────

pub async fn list_products(state: Arc<AppState>, _req: Request) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

pub async fn product(state: Arc<AppState>, req: Request) -> Result<Json<Product>, ApiError> {
    let id = path_id(&req)?;
    state.catalog.find(id).await?.map(Json).ok_or(ApiError::NotFound("product"))
}

// ── orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OrderRequestLine {
    pub product_id: u64,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub user_id: u64,
    pub items: Vec<OrderRequestLine>,
}

/// Prices every line from the catalog. Unknown products and zero quantities
/// are field errors, reported together.
async fn price(state: &AppState, items: &[OrderRequestLine]) -> Result<Vec<OrderLine>, ApiError> {
    let mut errors = Vec::new();
    let mut lines = Vec::with_capacity(items.len());

    if items.is_empty() {
        errors.push(FieldError { field: "items", message: "an order needs at least one item" });
    }
    for item in items {
        if item.quantity == 0 {
            errors.push(FieldError { field: "quantity", message: "quantity must be at least 1" });
            continue;
        }
        match state.catalog.find(item.product_id).await? {
            Some(p) => lines.push(OrderLine {
                product_id: p.id,
                name: p.name,
                quantity: item.quantity,
                unit_price_cents: p.price_cents,
            }),
            None => errors.push(FieldError { field: "product_id", message: "unknown product" }),
        }
    }

    if errors.is_empty() { Ok(lines) } else { Err(ApiError::Validation(errors)) }
}

pub async fn place_order(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let caller = caller(&req)?;
    let form: OrderRequest = body(&req)?;
    if !caller.may_access(form.user_id) {
        return Err(AuthError::Forbidden.into());
    }

    let lines = price(&state, &form.items).await?;
    let order = state.orders.place(form.user_id, lines).await?;
    info!(order_id = order.id, user_id = order.user_id, total_cents = order.total_cents, "order placed");

    Ok(Response::builder()
        .status(Status::Created)
        .json_value(&json!({ "message": "order placed", "id": order.id, "total_cents": order.total_cents })))
}

/// 404 when the user has no orders yet.
pub async fn user_orders(state: Arc<AppState>, req: Request) -> Result<Json<Vec<Order>>, ApiError> {
    let (_, id) = caller_for_path(&req)?;
    let orders = state.orders.for_user(id).await?;
    if orders.is_empty() {
        return Err(ApiError::NotFound("orders"));
    }
    Ok(Json(orders))
}

// ── user administration ──────────────────────────────────────────────────────

pub async fn list_users(state: Arc<AppState>, _req: Request) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.directory.list().await?))
}

pub async fn delete_user(state: Arc<AppState>, req: Request) -> Result<Json<serde_json::Value>, ApiError> {
    let by = caller(&req)?;
    let id = path_id(&req)?;
    if !state.directory.delete(id).await? {
        return Err(ApiError::NotFound("user"));
    }
    state.images.remove(id).await?;
    info!(user_id = id, by = by.subject_id, "user deleted");

    Ok(Json(json!({ "message": "user deleted" })))
}

// ── profile picture ──────────────────────────────────────────────────────────

/// The body is the picture itself; its `content-type` is stored as given.
pub async fn upload_image(state: Arc<AppState>, req: Request) -> Result<Json<serde_json::Value>, ApiError> {
    let (_, id) = caller_for_path(&req)?;
    if req.body().is_empty() {
        return Err(ApiError::Validation(vec![FieldError { field: "image", message: "image is required" }]));
    }
    if state.directory.find(id).await?.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    let image = Image {
        content_type: req.header("content-type").unwrap_or(DEFAULT_IMAGE_TYPE).to_owned(),
        data: Bytes::copy_from_slice(req.body()),
    };
    let image_url = image.data_url();
    state.images.put(id, image).await?;
    info!(user_id = id, bytes = req.body().len(), "profile image stored");

    Ok(Json(json!({ "image_url": image_url })))
}

pub async fn user_image(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let (_, id) = caller_for_path(&req)?;
    let image = state.images.get(id).await?.ok_or(ApiError::NotFound("image"))?;
    Ok(Response::builder().bytes(&image.content_type, image.data.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::images::ImageError;
    use crate::orders::OrderError;
    use crate::response::IntoResponse;

    #[test]
    fn missing_things_are_404_with_their_name() {
        let res = ApiError::NotFound("product").into_response();
        assert_eq!(res.status_code(), 404);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["message"], "product not found");
    }

    #[test]
    fn store_outages_are_503() {
        for err in [
            ApiError::from(CatalogError::Unavailable("x".into())),
            ApiError::from(OrderError::Unavailable("x".into())),
            ApiError::from(ImageError::Unavailable("x".into())),
        ] {
            assert_eq!(err.into_response().status_code(), 503);
        }
    }

    #[test]
    fn order_request_parses() {
        let form: OrderRequest =
            serde_json::from_str(r#"{"user_id":3,"items":[{"product_id":1,"quantity":2}]}"#).unwrap();
        assert_eq!((form.user_id, form.items[0].product_id, form.items[0].quantity), (3, 1, 2));
    }
}
