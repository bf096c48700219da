use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::time::Duration;

use stereo_recon::{estimate_intrinsics, parse_calibration, ReconstructionError};

/// Wall-clock budget for one reconstruction request. The core defines no
/// timeout of its own; exceeding this maps to a service-unavailable reply.
const RECONSTRUCTION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
        .into_response()
}

/// `GET /api/health`: service liveness and version.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /api/reconstruct`: run the stereo reconstruction pipeline.
///
/// Multipart fields: `im0`, `im1` (required image files) and `calib`
/// (optional Middlebury-format calibration text). Client-input failures map
/// to 422, unexpected internal failures to 500, an exhausted time budget
/// to 503.
pub async fn reconstruct(mut multipart: Multipart) -> Response {
    let mut im0_bytes = None;
    let mut im1_bytes = None;
    let mut calib_bytes = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Invalid multipart request: {e}"),
                )
            }
        };
        let name = field.name().map(str::to_owned);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Failed to read multipart field: {e}"),
                )
            }
        };
        match name.as_deref() {
            Some("im0") => im0_bytes = Some(bytes),
            Some("im1") => im1_bytes = Some(bytes),
            Some("calib") => calib_bytes = Some(bytes),
            _ => {}
        }
    }

    let (Some(im0_bytes), Some(im1_bytes)) = (im0_bytes, im1_bytes) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Fields 'im0' and 'im1' are required.",
        );
    };

    // decode the stereo pair
    let img1 = match stereo_io::decode_image_bytes(&im0_bytes) {
        Ok(img) => img,
        Err(e) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Image decoding failed: {e}"),
            )
        }
    };
    let img2 = match stereo_io::decode_image_bytes(&im1_bytes) {
        Ok(img) => img,
        Err(e) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Image decoding failed: {e}"),
            )
        }
    };

    // resolve intrinsic matrices
    let (k1, k2) = match calib_bytes {
        Some(bytes) => {
            let text = match std::str::from_utf8(&bytes) {
                Ok(text) => text,
                Err(e) => {
                    return error_response(
                        StatusCode::UNPROCESSABLE_ENTITY,
                        format!("Calibration parsing failed: {e}"),
                    )
                }
            };
            match parse_calibration(text) {
                Ok(ks) => ks,
                Err(e) => {
                    return error_response(
                        StatusCode::UNPROCESSABLE_ENTITY,
                        format!("Calibration parsing failed: {e}"),
                    )
                }
            }
        }
        None => {
            log::warn!("No calibration file provided; estimating intrinsics from image size.");
            (
                estimate_intrinsics(img1.size()),
                estimate_intrinsics(img2.size()),
            )
        }
    };

    // the core is CPU-bound; run it off the async runtime under a wall-clock
    // budget
    let task =
        tokio::task::spawn_blocking(move || stereo_recon::reconstruct(&img1, &img2, &k1, &k2));
    match tokio::time::timeout(RECONSTRUCTION_TIMEOUT, task).await {
        Err(_) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Reconstruction timed out.",
        ),
        Ok(Err(e)) => {
            log::error!("Reconstruction task panicked: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reconstruction failed unexpectedly.",
            )
        }
        Ok(Ok(Err(e))) => pipeline_error_response(e),
        Ok(Ok(Ok(result))) => Json(result).into_response(),
    }
}

fn pipeline_error_response(e: ReconstructionError) -> Response {
    if e.is_client_error() {
        error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else {
        log::error!("Unexpected error during reconstruction: {e}");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Reconstruction failed unexpectedly.",
        )
    }
}
