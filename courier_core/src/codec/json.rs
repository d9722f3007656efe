use crate::codec::*;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub struct Json;

impl ContentType for Json {
    const CONTENT_TYPE: &'static str = "application/json";
}

impl FormatType for Json {
    const FORMAT_TYPE: Format = Format::Text;
}

impl<T> Encodes<T> for Json
where
    T: Serialize,
{
    type Error = serde_json::Error;
    fn encode(value: &T) -> Result<Bytes, Self::Error> {
        serde_json::to_vec(value).map(Bytes::from)
    }
}

impl<T> Decodes<T> for Json
where
    T: DeserializeOwned,
{
    type Error = serde_json::Error;
    fn decode(bytes: &Bytes) -> Result<T, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Best-effort structured error payload: `None` for empty or non-JSON bodies.
pub(crate) fn error_payload(bytes: &Bytes) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        return None;
    }
    <Json as Decodes<serde_json::Value>>::decode(bytes).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_payload_ignores_empty_and_garbage() {
        assert!(error_payload(&Bytes::new()).is_none());
        assert!(error_payload(&Bytes::from_static(b"<html>")).is_none());
        let v = error_payload(&Bytes::from_static(b"{\"code\":7}")).unwrap();
        assert_eq!(v["code"], 7);
    }
}
