//! CRUD over the hospital collections, every call through the gate.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::Value;

use hms_auth::PrincipalContext;
use hms_core::{RecordId, ResourceId};

use crate::app::{errors, operations::Collection, services::AppServices};

fn parse_collection(name: &str) -> Result<Collection, Response> {
    Collection::parse(name).ok_or_else(|| {
        errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_collection",
            format!("no collection named '{name}'"),
        )
    })
}

fn parse_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, Response> {
    body.map(|Json(value)| value)
        .map_err(errors::json_rejection_to_response)
}

fn parse_target(collection: &str, id: &str) -> Result<(Collection, RecordId), Response> {
    let collection = parse_collection(collection)?;
    let id = id
        .parse::<RecordId>()
        .map_err(errors::domain_error_to_response)?;
    Ok((collection, id))
}

pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(collection): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let collection = match parse_collection(&collection) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let id = RecordId::new();
    let records = services.records.clone();

    let result = services
        .gate
        .invoke(
            &ctx,
            &services.operations.collection(collection).create,
            ResourceId::record(collection.as_str(), id),
            |actor| async move { records.create(collection, id, body, actor, Utc::now()) },
        )
        .await;

    match result {
        Ok(doc) => (StatusCode::CREATED, Json(doc)).into_response(),
        Err(e) => errors::gate_error_to_response(e),
    }
}

pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(collection): Path<String>,
) -> Response {
    let collection = match parse_collection(&collection) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let records = services.records.clone();

    let result = services
        .gate
        .invoke(
            &ctx,
            &services.operations.collection(collection).list,
            ResourceId::new(collection.as_str()),
            |_| async move { records.list(collection) },
        )
        .await;

    match result {
        Ok(docs) => (StatusCode::OK, Json(serde_json::json!({ "items": docs }))).into_response(),
        Err(e) => errors::gate_error_to_response(e),
    }
}

pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let (collection, id) = match parse_target(&collection, &id) {
        Ok(target) => target,
        Err(resp) => return resp,
    };
    let records = services.records.clone();

    let result = services
        .gate
        .invoke(
            &ctx,
            &services.operations.collection(collection).get,
            ResourceId::record(collection.as_str(), id),
            |_| async move { records.get(collection, id) },
        )
        .await;

    match result {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => errors::gate_error_to_response(e),
    }
}

pub async fn update_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let (collection, id) = match parse_target(&collection, &id) {
        Ok(target) => target,
        Err(resp) => return resp,
    };
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let records = services.records.clone();

    let result = services
        .gate
        .invoke(
            &ctx,
            &services.operations.collection(collection).update,
            ResourceId::record(collection.as_str(), id),
            |actor| async move { records.update(collection, id, body, actor, Utc::now()) },
        )
        .await;

    match result {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => errors::gate_error_to_response(e),
    }
}

pub async fn delete_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let (collection, id) = match parse_target(&collection, &id) {
        Ok(target) => target,
        Err(resp) => return resp,
    };
    let records = services.records.clone();

    let result = services
        .gate
        .invoke(
            &ctx,
            &services.operations.collection(collection).delete,
            ResourceId::record(collection.as_str(), id),
            |_| async move { records.delete(collection, id).map(|_| ()) },
        )
        .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::gate_error_to_response(e),
    }
}
