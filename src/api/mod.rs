/*
 * Responsibility
 * - Public surface of the HTTP api (routes() re-export)
 */
pub mod handlers;
mod routes;

pub use routes::routes;
