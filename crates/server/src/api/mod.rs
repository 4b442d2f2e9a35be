pub mod handlers;
pub mod middleware;
pub mod playlists;
pub mod routes;
pub mod tracks;
pub mod ws;

pub use routes::create_router;
