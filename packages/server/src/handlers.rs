//! HTTP handler functions for the geocoder API.

use std::collections::HashMap;

use actix_web::{Either, HttpResponse, web};
use solr_geocoder::{GeocodeError, ReverseOutcome};
use solr_geocoder_server_models::{
    ApiError, ApiForwardResponse, ApiHealth, ForwardRequest, RawParams, ReverseRequest,
    params_from_pairs,
};

use crate::AppState;

/// Form or JSON body of a POST request.
type PostBody = Either<web::Json<RawParams>, web::Form<HashMap<String, String>>>;

fn post_params(body: PostBody) -> RawParams {
    match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => params_from_pairs(form.into_inner()),
    }
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /geocode`
pub async fn geocode_get(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    geocode(&state, params_from_pairs(query.into_inner())).await
}

/// `POST /geocode`
pub async fn geocode_post(state: web::Data<AppState>, body: PostBody) -> HttpResponse {
    geocode(&state, post_params(body)).await
}

/// `GET /reverse`
pub async fn reverse_get(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    reverse(&state, params_from_pairs(query.into_inner())).await
}

/// `POST /reverse`
pub async fn reverse_post(state: web::Data<AppState>, body: PostBody) -> HttpResponse {
    reverse(&state, post_params(body)).await
}

/// Runs the strategy cascade and echoes the request alongside the result.
async fn geocode(state: &AppState, input: RawParams) -> HttpResponse {
    let request = ForwardRequest::from_params(&input);

    match state
        .geocoder
        .forward_geocode(&request.address, request.rows)
        .await
    {
        Ok(result) => HttpResponse::Ok().json(ApiForwardResponse { input, result }),
        Err(e) => error_response(&e, input),
    }
}

/// Nearest records to a point; 404 when nothing lies inside the radius.
async fn reverse(state: &AppState, input: RawParams) -> HttpResponse {
    let request = ReverseRequest::from_params(&input);

    let outcome = state
        .geocoder
        .reverse_geocode(
            request.lat.as_deref(),
            request.lon.as_deref(),
            request.max_results.as_deref(),
            request.max_radius.as_deref(),
        )
        .await;

    match outcome {
        Ok(ReverseOutcome::Found(results)) => HttpResponse::Ok().json(results),
        Ok(ReverseOutcome::NoMatch) => {
            HttpResponse::NotFound().json(ApiError::new("No match found"))
        }
        Err(e) => error_response(&e, input),
    }
}

fn error_response(err: &GeocodeError, input: RawParams) -> HttpResponse {
    match err {
        GeocodeError::Validation { message } => {
            log::debug!("Rejected request: {message}");
            HttpResponse::BadRequest().json(ApiError::with_input(input, message.clone()))
        }
        GeocodeError::Upstream(_) => {
            log::error!("{err}");
            HttpResponse::ServiceUnavailable().json(ApiError::new(err.to_string()))
        }
        GeocodeError::MalformedDocument { .. } => {
            log::error!("{err}");
            HttpResponse::BadGateway().json(ApiError::new(err.to_string()))
        }
    }
}
