//! Authentication: bearer-token claims extraction.
//!
//! The SDK never verifies token signatures — the server is the sole trust
//! boundary. Claims are extracted purely to populate the WebSocket
//! handshake identity and for display.

mod claims;

pub use claims::{decode_token, Claims};
