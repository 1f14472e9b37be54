// alarmsync-api: Async Rust client for the security-system web portal
//
// The `Portal` trait is the seam the sync engine consumes. `HttpPortal`
// speaks to the real portal over a cookie session; `MockPortal` (feature
// `test-util`) is a scriptable stand-in for tests.

pub mod auth;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod models;
pub mod portal;
pub mod transport;

pub use auth::{Credentials, Subdomain};
pub use error::Error;
pub use http::HttpPortal;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockPortal;
pub use models::{
    ArmState, GatewayInfo, PanelInfo, PanelStatus, SensorInfo, SensorStatus, SessionInfo,
};
pub use portal::Portal;
pub use transport::TransportConfig;
