//! HTTP handlers of the dataset executor service
//!
//! Routes:
//! - POST /v2/data/instances/{instance}/admin/{op} - Run an admin operation
//! - GET /ping - Liveness probe

use std::sync::Arc;

use actix_web::{HttpResponse, Responder, Scope, get, post, web};
use tracing::{error, warn};

use fabric_common::API_VERSION;
use fabric_common::error::{PARAMETER_VALIDATE_ERROR, SERVER_ERROR, UNKNOWN_ADMIN_OP};
use fabric_dataset::{
    AdminOp, AdminOpResponse, CreateInstanceRequest, DatasetError, DatasetOpExecutor,
    execute_admin_op,
};

use crate::metrics::{Timer, record_admin_request};

/// Admin routes, mounted under `/v2/data/instances`
pub fn admin_routes() -> Scope {
    web::scope(&format!("/{}/data/instances", API_VERSION)).service(admin_op)
}

/// Run an administrative operation on a dataset instance
///
/// POST /v2/data/instances/{instance}/admin/{op}
///
/// `create` expects a `{"typeName": ..., "properties": {...}}` body; the other
/// operations ignore the body.
#[post("/{instance}/admin/{op}")]
pub async fn admin_op(
    executor: web::Data<Arc<dyn DatasetOpExecutor>>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> impl Responder {
    let timer = Timer::new();
    let (instance, op_name) = path.into_inner();

    let op = match op_name.parse::<AdminOp>() {
        Ok(op) => op,
        Err(message) => {
            warn!(op = %op_name, instance = %instance, "Rejected unknown admin operation");
            record_admin_request("unknown", 400, timer.elapsed_secs());
            return HttpResponse::BadRequest()
                .json(AdminOpResponse::error(UNKNOWN_ADMIN_OP.code, message));
        }
    };

    let request = if op == AdminOp::Create && !body.is_empty() {
        match serde_json::from_slice::<CreateInstanceRequest>(&body) {
            Ok(request) => Some(request),
            Err(e) => {
                record_admin_request(op.as_str(), 400, timer.elapsed_secs());
                return HttpResponse::BadRequest().json(AdminOpResponse::error(
                    PARAMETER_VALIDATE_ERROR.code,
                    format!("invalid create request: {}", e),
                ));
            }
        }
    } else {
        None
    };

    let response = match execute_admin_op(executor.get_ref().as_ref(), op, &instance, request).await
    {
        Ok(result) => HttpResponse::Ok().json(AdminOpResponse::success(result)),
        Err(e) => error_response(op, &instance, e),
    };

    record_admin_request(op.as_str(), response.status().as_u16(), timer.elapsed_secs());
    response
}

fn error_response(op: AdminOp, instance: &str, err: anyhow::Error) -> HttpResponse {
    match err.downcast_ref::<DatasetError>() {
        Some(DatasetError::NotFound(_)) => HttpResponse::NotFound().json(AdminOpResponse::empty()),
        Some(e @ DatasetError::AlreadyExists(_)) => {
            HttpResponse::Conflict().json(AdminOpResponse::error(e.error_code(), e.to_string()))
        }
        Some(
            e @ (DatasetError::UnknownType(_)
            | DatasetError::InvalidName(_)
            | DatasetError::InvalidProperties { .. }),
        ) => HttpResponse::BadRequest().json(AdminOpResponse::error(e.error_code(), e.to_string())),
        _ => {
            error!(op = %op, instance = %instance, error = %err, "Admin operation failed");
            HttpResponse::InternalServerError()
                .json(AdminOpResponse::error(SERVER_ERROR.code, err.to_string()))
        }
    }
}

/// Liveness probe
///
/// GET /ping
#[get("/ping")]
pub async fn ping() -> impl Responder {
    HttpResponse::Ok().body("OK.")
}
