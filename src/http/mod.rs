//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (AxumRuntime: listener, worker pool, shutdown)
//!     → request.rs (assign x-request-id)
//!     → middleware/access_log.rs (request/response records via Logger)
//!     → application routes (attached with AxumRuntime::route)
//!     → response.rs (JSON envelope, error mapping)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{AppError, JsonResp, ResponseInfo};
pub use server::AxumRuntime;
