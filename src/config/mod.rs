mod settings;

pub use settings::{EchoConfig, LoginConfig, OAuthConfig, Settings, WebSocketConfig};
