pub mod downloads;
pub mod handlers;
pub mod info;
pub mod middleware;
pub mod progress;
pub mod routes;

pub use routes::create_router;
