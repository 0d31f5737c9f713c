//! # sshelper-error
//!
//! One error type shared by every sshelper crate.
//!
//! An [`Error`] answers three questions:
//! - what went wrong: [`ErrorKind`] (`ConnectFailed`, `RateLimited`, ...)
//! - whether it might go away: [`ErrorStatus`]
//! - where: the operation name plus key/value context, and the underlying
//!   error kept as an `anyhow` source
//!
//! ```rust
//! use sshelper_error::{Error, ErrorKind};
//!
//! fn connect(host: &str) -> sshelper_error::Result<()> {
//!     Err(Error::connect_failed(host, "connection refused")
//!         .with_operation("session::connect")
//!         .with_context("port", "22"))
//! }
//!
//! let err = connect("10.0.0.7").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ConnectFailed);
//! ```
//!
//! Nothing in sshelper retries; the status only changes how a failure is
//! reported.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

pub type Result<T> = std::result::Result<T, Error>;
