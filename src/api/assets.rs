use actix_web::http::header::{self, CacheControl, CacheDirective};
use actix_web::{get, web, HttpResponse};

use crate::configuration::Settings;
use crate::model::global_error::{AppError, ErrorCode};

const SITE_CSS: &str = include_str!("../../static/site.css");

#[get("/static/site.css")]
pub async fn stylesheet(settings: web::Data<Settings>) -> Result<HttpResponse, AppError> {
    if !settings.serve_static {
        return Err(AppError::new(ErrorCode::PageNotFound));
    }

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/css; charset=utf-8"))
        .insert_header(CacheControl(vec![CacheDirective::Public, CacheDirective::MaxAge(3600)]))
        .body(SITE_CSS))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::new(ErrorCode::PageNotFound))
}
