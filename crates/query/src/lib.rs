//! Asynchronous query lambda execution: submit, poll until COMPLETED, then
//! walk the result set's cursor chain to the end.

pub mod config;
pub mod error;
pub mod pager;
pub mod request;
pub mod response;
pub mod session;
pub mod spec;
pub mod status;
pub mod transport;

pub use config::{ConfigError, QueryErrorPolicy, ServiceConfig, SessionOptions};
pub use error::{QueryError, Stage};
pub use pager::PageWalker;
pub use request::{Endpoints, SubmitRequest};
pub use response::{CompletionStart, Page};
pub use session::{QuerySession, SessionReport};
pub use spec::{QuerySpec, Selector};
pub use status::QueryStatus;
pub use transport::{HttpTransport, QueryTransport, TransportError};

pub use lambda_params::QueryParameter;
