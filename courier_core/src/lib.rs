mod adapter;
pub mod cache;
mod classify;
mod codec;
mod config;
mod debug;
mod endpoint;
pub mod error;
mod multipart;
mod pipeline;
mod policy;
mod request;
mod retry;
mod secret;
mod timeout;
pub mod transfer;
pub mod transport;
mod types;

pub mod prelude {
    pub use crate::adapter::{Adapter, BearerAuthAdapter, HeaderAdapter};
    pub use crate::cache::{CacheConfig, CacheError, Clock, ManualClock, SystemClock, TtlCache};
    pub use crate::classify::{FailureKind, ResponseFailure, ResponseOutcome, classify};
    pub use crate::codec::json::Json;
    pub use crate::codec::text::Text;
    pub use crate::codec::{
        ContentType, Decodes, Encodes, Format, FormatType, NoContent, Raw,
    };
    pub use crate::config::PipelineConfig;
    pub use crate::debug::{DebugLevel, DebugSink, NoopDebugSink, StderrDebugSink, TracingDebugSink};
    pub use crate::endpoint::{Endpoint, Route};
    pub use crate::error::{BuildError, CourierError, FxError};
    pub use crate::multipart::{EncodedMultipart, MimeType, MultipartEncoder, MultipartForm, MultipartPart};
    pub use crate::pipeline::{PipelineBuilder, RequestPipeline, ResumeData};
    pub use crate::policy::Policy;
    pub use crate::request::{CallHandle, PendingCall};
    pub use crate::retry::{BackoffConfig, BackoffRetrier, Retrier, RetryContext, RetryDecision, backoff_delay};
    pub use crate::secret::SecretString;
    pub use crate::timeout::TimeoutOverride;
    pub use crate::transfer::{
        Direction, Progress, ProgressFn, TransferHandle, TransferId, TransferOutput,
        TransferResult, TransferTracker,
    };
    pub use crate::transport::{
        OutgoingRequest, RawResponse, ReqwestTransport, RequestMeta, Transport, TransportBody,
        TransportError, TransportErrorKind, TransportResponse, UploadObserver,
    };
    pub use crate::types::UrlPath;
}
