//! Status code → typed outcome.
//!
//! | status                    | outcome                                      |
//! |---------------------------|----------------------------------------------|
//! | 200–299                   | `Success(body)`, `None` for an empty body     |
//! | 400, 404                  | `Failure(Failed)` + JSON payload if it parses |
//! | 401–500 (not 400/404)     | `Failure(Unauthorized)`                       |
//! | 501–599                   | `Failure(Failed)`                             |
//! | anything else             | `Failure(Failed)`                             |

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::fmt;
use thiserror::Error;

use crate::codec::json::error_payload;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FailureKind {
    NoData,
    Unauthorized,
    BadRequest,
    Outdated,
    Failed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::NoData => "no data",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::BadRequest => "bad request",
            FailureKind::Outdated => "outdated",
            FailureKind::Failed => "failed",
        })
    }
}

#[derive(Error, Clone, Debug)]
#[error("{kind} (status {status})")]
pub struct ResponseFailure {
    pub kind: FailureKind,
    pub status: StatusCode,
    pub payload: Option<serde_json::Value>,
    /// Body preview for diagnostics.
    pub body: String,
}

#[derive(Clone, Debug)]
pub enum ResponseOutcome {
    Success(Option<Bytes>),
    Failure(ResponseFailure),
}

impl ResponseOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<Option<Bytes>, ResponseFailure> {
        match self {
            ResponseOutcome::Success(body) => Ok(body),
            ResponseOutcome::Failure(f) => Err(f),
        }
    }
}

pub fn classify(status: StatusCode, headers: &HeaderMap, body: &Bytes) -> ResponseOutcome {
    let code = status.as_u16();
    let failure = |kind: FailureKind, payload: Option<serde_json::Value>| {
        ResponseOutcome::Failure(ResponseFailure {
            kind,
            status,
            payload,
            body: crate::error::body_as_text(headers, body, Some(body.len())),
        })
    };
    match code {
        200..=299 => {
            if body.is_empty() {
                ResponseOutcome::Success(None)
            } else {
                ResponseOutcome::Success(Some(body.clone()))
            }
        }
        400 | 404 => failure(FailureKind::Failed, error_payload(body)),
        401..=500 => failure(FailureKind::Unauthorized, None),
        // Server errors above 500 stay generic failures; `BadRequest` is never
        // produced from a status code.
        501..=599 => failure(FailureKind::Failed, None),
        _ => failure(FailureKind::Failed, None),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    fn kind_of(code: u16) -> Option<FailureKind> {
        match classify(status(code), &HeaderMap::new(), &Bytes::from_static(b"x")) {
            ResponseOutcome::Success(_) => None,
            ResponseOutcome::Failure(f) => Some(f.kind),
        }
    }

    #[test]
    fn every_2xx_is_success() {
        for code in 200..=299 {
            assert_eq!(kind_of(code), None, "status {code}");
        }
    }

    #[test]
    fn empty_success_body_is_none() {
        let out = classify(StatusCode::NO_CONTENT, &HeaderMap::new(), &Bytes::new());
        assert!(matches!(out, ResponseOutcome::Success(None)));
    }

    #[test]
    fn not_found_and_bad_request_are_generic_with_payload() {
        for code in [400, 404] {
            let body = Bytes::from_static(b"{\"message\":\"nope\"}");
            match classify(status(code), &HeaderMap::new(), &body) {
                ResponseOutcome::Failure(f) => {
                    assert_eq!(f.kind, FailureKind::Failed);
                    assert_eq!(f.payload.unwrap()["message"], "nope");
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            match classify(status(code), &HeaderMap::new(), &Bytes::from_static(b"plain")) {
                ResponseOutcome::Failure(f) => assert!(f.payload.is_none()),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn rest_of_401_to_500_is_unauthorized() {
        for code in 401..=500 {
            if code == 404 {
                continue;
            }
            assert_eq!(kind_of(code), Some(FailureKind::Unauthorized), "status {code}");
        }
    }

    #[test]
    fn outside_200_to_500_is_generic_without_payload() {
        for code in [100, 101, 301, 304, 399, 501, 503, 599, 600, 999] {
            match classify(status(code), &HeaderMap::new(), &Bytes::from_static(b"{\"a\":1}")) {
                ResponseOutcome::Failure(f) => {
                    assert_eq!(f.kind, FailureKind::Failed, "status {code}");
                    assert!(f.payload.is_none(), "status {code}");
                }
                other => panic!("status {code}: unexpected outcome {other:?}"),
            }
        }
    }
}
