pub mod health;
mod routes;
pub mod subscriptions;

pub use routes::routes;
