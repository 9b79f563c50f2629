pub mod handlers;
mod routes;
pub mod types;

pub use routes::routes;
