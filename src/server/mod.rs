mod app;
mod state;

pub use app::{create_echo_app, create_login_app, create_ws_app};
pub use state::{EchoState, LoginState, WsState};
