//! HTTP video fetcher.
//!
//! Streams a remote video into a local file with reqwest. When part of an
//! earlier attempt is already on disk, a `Range` request asks the server for
//! the remainder; servers that ignore the range get the file rewritten.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode, header};
use tokio::io::AsyncWriteExt;

use feedbuf_core::{FeedError, FeedResult, ProgressFn, VideoFetcherPort};

/// How the response body is written to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePlan {
    /// Append after the `offset` bytes already on disk.
    Append {
        /// Bytes kept from the earlier attempt.
        offset: u64,
        /// Expected final size, if known.
        total: Option<u64>,
    },
    /// Truncate the destination and write the full body.
    Rewrite {
        /// Expected final size, if known.
        total: Option<u64>,
    },
}

impl WritePlan {
    /// Decide how to write a response with `status` and `content_length`.
    pub fn for_response(
        status: StatusCode,
        resume_from: u64,
        content_length: Option<u64>,
    ) -> Result<Self, String> {
        if status == StatusCode::PARTIAL_CONTENT && resume_from > 0 {
            Ok(Self::Append {
                offset: resume_from,
                total: content_length.map(|len| len + resume_from),
            })
        } else if status.is_success() {
            Ok(Self::Rewrite {
                total: content_length,
            })
        } else {
            Err(format!("HTTP {status}"))
        }
    }

    /// Bytes on disk before the body is written.
    pub const fn offset(&self) -> u64 {
        match self {
            Self::Append { offset, .. } => *offset,
            Self::Rewrite { .. } => 0,
        }
    }

    /// Expected final size, if known.
    pub const fn total(&self) -> Option<u64> {
        match self {
            Self::Append { total, .. } | Self::Rewrite { total } => *total,
        }
    }
}

/// `VideoFetcherPort` over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpVideoFetcher {
    client: Client,
}

impl HttpVideoFetcher {
    /// Create a fetcher whose connections give up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("feedbuf/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn network_error(e: &reqwest::Error) -> FeedError {
    FeedError::Io {
        kind: "Network".to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl VideoFetcherPort for HttpVideoFetcher {
    async fn fetch_to_path(
        &self,
        url: &str,
        dest: &Path,
        resume_from: u64,
        progress: &ProgressFn<'_>,
    ) -> FeedResult<u64> {
        let mut request = self.client.get(url);
        if resume_from > 0 {
            request = request.header(header::RANGE, format!("bytes={resume_from}-"));
        }
        let response = request.send().await.map_err(|e| network_error(&e))?;

        let plan = WritePlan::for_response(response.status(), resume_from, response.content_length())
            .map_err(|message| FeedError::Io {
                kind: "Http".to_string(),
                message,
            })?;
        if resume_from > 0 && plan.offset() == 0 {
            tracing::debug!(url, resume_from, "Server ignored range request, restarting");
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        if plan.offset() > 0 {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let mut file = options.open(dest).await?;

        let total = plan.total();
        let mut downloaded = plan.offset();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network_error(&e))?;
            file.write_all(&chunk).await?;
            downloaded += u64::try_from(chunk.len()).unwrap_or(u64::MAX);
            progress(downloaded, total);
        }
        file.flush().await?;

        Ok(downloaded)
    }
}
