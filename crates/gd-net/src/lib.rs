//! Networking contracts: URL normalization, TOFU TLS, and the Gemini client.

pub mod client;
pub mod dns;
pub mod header;
pub mod tls;
pub mod transport;
pub mod url;

pub use client::GeminiClient;
pub use client::ProtocolClient;
pub use client::ResponseBody;
pub use header::ResponseHeader;
pub use header::StatusClass;
pub use header::read_header;
pub use url::GeminiUrl;
pub use url::normalize;
