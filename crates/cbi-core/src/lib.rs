pub mod config;
pub mod logging;

pub mod checksum;
pub mod control;
pub mod error;
pub mod handler;
pub mod multipart;
pub mod processor;
pub mod request;
pub mod result;
pub mod retry;
pub mod transport;

pub use control::Interrupt;
pub use error::{FailureKind, TransportError};
pub use handler::{CompletionHandler, ErrorReportingHandler};
pub use processor::FileProcessor;
pub use request::{Config, RequestBuilder, RequestDescriptor};
pub use result::{ResponseHead, TransportResult};
pub use retry::{RetryingTransport, TimeUnit};
pub use transport::{CurlTransport, Transport};
