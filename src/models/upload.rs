//! Represents a single file handed to the gateway for upload.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, pin_mut};
use std::io;

/// An inbound file, fully buffered.
///
/// Built once from a multipart part and consumed by `StorageGateway::save`.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Filename as sent by the client, before sanitization.
    pub filename: String,

    /// Declared content type (MIME type), if the client sent one.
    pub content_type: Option<String>,

    /// File content.
    pub content: Bytes,
}

impl UploadRequest {
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            content: content.into(),
        }
    }

    /// Drain `stream` into memory. The stream is dropped before returning,
    /// on success and on error.
    pub async fn from_stream<S>(
        filename: impl Into<String>,
        content_type: Option<String>,
        stream: S,
    ) -> io::Result<Self>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let mut buffer = BytesMut::new();
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        Ok(Self::new(filename, content_type, buffer.freeze()))
    }

    /// Content length in bytes.
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }
}
