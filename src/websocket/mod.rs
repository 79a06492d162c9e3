// WebSocket module
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-socket read/write loops
// - routes: HTTP route setup (ws, health)

mod connection;
mod handler;
mod routes;

pub use handler::websocket_handler;
pub use routes::{create_router, run_server};
