use core::future::IntoFuture;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::codec::json::Json;
use crate::codec::{ContentType, Decodes};
use crate::debug::DebugLevel;
use crate::endpoint::Endpoint;
use crate::error::CourierError;
use crate::pipeline::{CallOptions, RequestPipeline, decode_response};
use crate::timeout::TimeoutOverride;
use crate::transport::{RawResponse, Transport};

/// Cancels one call, independently of every other call on the pipeline.
#[derive(Clone, Debug)]
pub struct CallHandle {
    call_id: Uuid,
    token: CancellationToken,
}

impl CallHandle {
    #[inline]
    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// Stops the call before its next attempt, or interrupts the one in flight.
    /// The call then resolves with [`CourierError::Cancelled`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct PendingCall<'p, E: Endpoint, T: Transport> {
    pipeline: &'p RequestPipeline<T>,
    ep: E,
    opts: CallOptions,
    token: CancellationToken,
}

impl<'p, E: Endpoint, T: Transport> PendingCall<'p, E, T> {
    #[inline]
    pub(crate) fn new(pipeline: &'p RequestPipeline<T>, ep: E) -> Self {
        Self {
            pipeline,
            ep,
            opts: CallOptions::new(Uuid::new_v4()),
            token: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> CallHandle {
        CallHandle {
            call_id: self.opts.call_id,
            token: self.token.clone(),
        }
    }

    #[inline]
    pub fn debug_level(mut self, level: DebugLevel) -> Self {
        self.opts.debug_level = Some(level);
        self
    }

    #[inline]
    pub fn timeout(mut self, d: Duration) -> Self {
        self.opts.timeout = TimeoutOverride::Set(d);
        self
    }

    #[inline]
    pub fn clear_timeout(mut self) -> Self {
        self.opts.timeout = TimeoutOverride::Clear;
        self
    }

    #[inline]
    pub fn inherit_timeout(mut self) -> Self {
        self.opts.timeout = TimeoutOverride::Inherit;
        self
    }

    pub(crate) fn into_parts(self) -> (E, CallOptions, CancellationToken) {
        (self.ep, self.opts, self.token)
    }

    /// The last attempt's response as-is; HTTP error statuses are not errors here.
    pub async fn execute(self) -> Result<RawResponse, CourierError> {
        self.pipeline.remember_call(&self.token);
        self.pipeline
            .run(&self.ep, &self.opts, &self.token, None)
            .await
    }

    #[inline]
    pub async fn decode<R: DeserializeOwned>(self) -> Result<Option<R>, CourierError> {
        self.decode_with::<Json, R>().await
    }

    /// Classifies the response and decodes a successful body with `C`.
    /// `Ok(None)` for a success without body.
    pub async fn decode_with<C, R>(mut self) -> Result<Option<R>, CourierError>
    where
        C: Decodes<R>,
    {
        self.opts.accept = <C as ContentType>::CONTENT_TYPE;
        let raw = self.execute().await?;
        decode_response::<C, R>(raw)
    }
}

impl<'p, E, T> IntoFuture for PendingCall<'p, E, T>
where
    E: Endpoint,
    T: Transport,
{
    type Output = Result<RawResponse, CourierError>;
    type IntoFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Self::Output> + Send + 'p>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.execute().await })
    }
}
