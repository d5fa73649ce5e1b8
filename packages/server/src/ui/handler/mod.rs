mod dispatch;
mod http;
mod websocket;

pub use http::{get_game, get_room_detail, get_rooms, get_status, health_check};
pub use websocket::websocket_handler;
