use super::handlers;
use actix_web::{web, Scope};

/// Every route except the plain listing takes an `AuthUser` first and is
/// rejected with 401 before the handler body runs.
pub fn routes() -> Scope {
    web::scope("/subscriptions")
        .service(handlers::get_subscriptions) // GET / (public)
        .service(handlers::create_subscription) // POST /
        // literal segments before /{sub_id} so they are never read as an id
        .service(handlers::get_upcoming_renewals) // GET /upcoming-renewals
        .service(handlers::get_user_subscriptions) // GET /user/{user_id}
        .service(handlers::get_subscription) // GET /{sub_id}
        .service(handlers::update_subscription) // PUT /{sub_id}
        .service(handlers::delete_subscription) // DELETE /{sub_id}
        .service(handlers::cancel_subscription) // PUT /{sub_id}/cancel
}
