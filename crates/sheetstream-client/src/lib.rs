pub mod config;
pub mod directory;
pub mod transport;
pub mod wire;

pub use config::{encode_segment, ApiConfig, ClientConfig};
pub use directory::SheetDirectory;
pub use transport::{
    oauth_scope, ApiRequest, ApiResponse, Connector, HttpConnector, HttpTransport, Method,
    Transport, READ_ONLY_SCOPE, READ_WRITE_SCOPE,
};
