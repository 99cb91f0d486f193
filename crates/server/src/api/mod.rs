pub mod handlers;
pub mod middleware;
pub mod resources;
pub mod routes;

pub use routes::create_router;
