//! Access to the remote logs API
//!
//! [`ReportApi`] is the seam between the report lifecycle and the wire:
//! [`LogsApiClient`] speaks HTTP to the real service, tests plug in scripted
//! implementations.

mod http;
mod traits;

pub use http::LogsApiClient;
pub use traits::ReportApi;
