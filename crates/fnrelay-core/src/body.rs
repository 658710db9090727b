use std::fmt;
use std::io;

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Raw request payload that is either a single `Bytes` buffer or a streaming source of
/// chunks. The streaming variant is `Send`-boxed because activations are spawned onto a
/// multi-threaded runtime and may migrate between worker threads.
pub enum Body {
    Once(Bytes),
    Stream(BoxStream<'static, Result<Bytes, anyhow::Error>>),
}

impl Body {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes<B>(bytes: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self::Once(bytes.into())
    }

    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        anyhow::Error: From<E>,
    {
        Self::Stream(stream.map(|res| res.map_err(anyhow::Error::from)).boxed())
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Bytes> + Send + 'static,
    {
        Self::Stream(stream.map(Ok::<Bytes, anyhow::Error>).boxed())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Once(bytes) => bytes.as_ref(),
            Body::Stream(_) => panic!("streaming body does not expose in-memory bytes"),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Body::Once(bytes) => bytes,
            Body::Stream(_) => panic!("streaming body cannot be converted into bytes"),
        }
    }

    pub fn into_stream(self) -> Option<BoxStream<'static, Result<Bytes, anyhow::Error>>> {
        match self {
            Body::Once(_) => None,
            Body::Stream(stream) => Some(stream),
        }
    }

    /// Drain the body into a single buffer, whichever variant it is.
    pub async fn collect(self) -> Result<Bytes, anyhow::Error> {
        match self {
            Body::Once(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    pub fn text<S>(text: S) -> Self
    where
        S: Into<String>,
    {
        Self::from_bytes(text.into().into_bytes())
    }

    pub fn json<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        serde_json::to_vec(value).map(Self::from_bytes)
    }

    pub fn to_json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        match self {
            Body::Once(bytes) => serde_json::from_slice(bytes.as_ref()),
            Body::Stream(_) => Err(serde_json::Error::io(io::Error::other(
                "streaming body cannot be materialised as JSON",
            ))),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Once(bytes) => f
                .debug_struct("Body::Once")
                .field("len", &bytes.len())
                .finish(),
            Body::Stream(_) => f.debug_tuple("Body::Stream").finish(),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::from_bytes(value)
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::from_bytes(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::text(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::text(value)
    }
}
