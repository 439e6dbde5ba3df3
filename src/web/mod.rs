pub mod templates;

use actix_web::http::header::{self, ContentType};
use actix_web::HttpResponse;
use askama::Template;

use crate::model::global_error::AppError;

/// Renders a page with status 200.
pub fn render<T: Template>(template: &T) -> Result<HttpResponse, AppError> {
    let html = template.render()?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}
