use super::subscriptions;
use crate::errors::AppError;
use actix_web::{error, web, HttpRequest, Scope};

// Extractor failures use the same error body as the handlers
fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::invalid_input("body", &err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::invalid_input("query", &err.to_string()).into()
}

pub fn routes() -> Scope {
    web::scope("/api")
        .app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .service(subscriptions::routes())
}
