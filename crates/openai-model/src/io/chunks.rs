#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

/// Failure to read the next chunk from the transport.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(pub String);

/// An adapter for streaming byte chunks.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Scripted(VecDeque<Bytes>),
}

impl Chunks {
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Chunks::Scripted(chunks.into_iter().collect())
    }

    #[inline]
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Response(response) => match response.chunk().await {
                Ok(chunk) => Ok(chunk),
                Err(err) => Err(Error(format!("{err}"))),
            },
            #[cfg(test)]
            Chunks::Scripted(chunks) => Ok(chunks.pop_front()),
        }
    }
}
