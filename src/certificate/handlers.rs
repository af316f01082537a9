use actix_web::{error, web, HttpResponse, Responder};
use uuid::Uuid;

use super::models::{
    GenerateCertificateResponse, GenerationFailedResponse, GenerationRequest, MissingFieldsResponse,
};
use crate::delivery::DeliveryStatus;
use crate::{AppState, ErrorResponse};

/// Response header naming the background delivery started for a request.
pub const DELIVERY_ID_HEADER: &str = "X-Delivery-Id";

/// Generate a certificate and email it to the submitter.
///
/// The email is sent after the response has been produced; its outcome is
/// only available through `GET /api/deliveries/{id}`.
#[utoipa::path(
    post,
    path = "/api/generate-certificate",
    tag = "Certificate",
    request_body = GenerationRequest,
    responses(
        (
            status = 200,
            description = "Certificate generated, email queued",
            body = GenerateCertificateResponse,
            headers(
                ("X-Delivery-Id" = String, description = "Identifier of the background delivery")
            )
        ),
        (status = 400, description = "A required field is missing", body = MissingFieldsResponse),
        (
            status = 500,
            description = "Certificate generation failed",
            body = GenerationFailedResponse
        )
    )
)]
pub async fn generate_certificate(
    state: web::Data<AppState>,
    body: web::Json<GenerationRequest>,
) -> impl Responder {
    let request = match body.into_inner().validate() {
        Ok(request) => request,
        Err(errors) => {
            log::warn!(
                "Rejected certificate request, missing: {}",
                errors.fields().join(", ")
            );
            return HttpResponse::BadRequest().json(MissingFieldsResponse::default());
        }
    };

    let document = match state.renderer.generate(&request.data).await {
        Ok(document) => document,
        Err(e) => {
            log::error!("Certificate generation failed: {}", e);
            return HttpResponse::InternalServerError().json(GenerationFailedResponse::new(&e));
        }
    };

    let body = GenerateCertificateResponse::new(
        document.pdf_bytes.len(),
        document.preview_bytes.len(),
    );

    // Not awaited: email delivery must not hold up the response.
    let handle = state
        .deliveries
        .dispatch(
            state.mailer.clone(),
            request.email,
            document.pdf_bytes,
            document.preview_bytes,
        )
        .await;

    HttpResponse::Ok()
        .insert_header((DELIVERY_ID_HEADER, handle.id.to_string()))
        .json(body)
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}",
    tag = "Certificate",
    params(
        ("id" = Uuid, Path, description = "Delivery ID from the X-Delivery-Id header")
    ),
    responses(
        (status = 200, description = "Delivery state", body = DeliveryStatus),
        (status = 404, description = "Unknown or expired delivery", body = ErrorResponse)
    )
)]
pub async fn get_delivery_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let id = path.into_inner();
    match state.deliveries.status(&id).await {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().json(ErrorResponse::not_found("Delivery not found")),
    }
}

/// JSON extractor settings: malformed bodies get a JSON 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        log::warn!("Rejected malformed JSON body: {}", message);
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message)),
        )
        .into()
    })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/generate-certificate").route(web::post().to(generate_certificate)),
    )
    .service(web::resource("/deliveries/{id}").route(web::get().to(get_delivery_status)));
}
