//! Network URL constants for the Alpha Insights SDK.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.alphainsights.app";

/// Default WebSocket URL.
pub const DEFAULT_WS_URL: &str = "wss://rt.alphainsights.app/ws";
