//! Client side of the error contract: calling the API, routing failures, and
//! the server-error view that displays them.

pub mod http;
pub mod interceptor;
pub mod navigation;
pub mod server_error;

pub use http::{ApiClient, ClientError};
pub use interceptor::{route_error, ErrorRoute};
pub use navigation::NavigationState;
pub use server_error::{RenderedError, ServerErrorView};
