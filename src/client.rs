use crate::error::StreamError;
use bytes::Bytes;
use futures::stream::Stream;
use futures::{
    StreamExt,
    stream::{self},
};
use reqwest::header::HeaderMap;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Debug, pin::Pin};
use tracing::{Level, event, instrument};

#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
}

pub type BoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Disposition of one complete protocol line, decided by the caller.
pub enum LineEvent<'a> {
    /// The line carries an event payload to be parsed
    Data(&'a str),
    /// Blank, keep-alive, or otherwise uninteresting line
    Ignore,
    /// End-of-stream sentinel: stop processing the current read buffer.
    /// The transport loop keeps reading until the connection completes.
    Done,
}

struct DecodeState {
    buffer: String,
    failed: bool,
}

/// Reassemble newline-delimited events from a raw byte stream.
///
/// Bytes are appended to a carry-over buffer and only complete lines
/// (terminated by `\n` somewhere in the accumulated buffer) are handed to
/// `classify`; the trailing incomplete line survives across reads. Payload
/// lines that fail to parse are skipped; backends interleave keep-alive and
/// partial lines that carry no content. A transport error mid-stream yields
/// one final `Err` item and fuses the stream.
fn decode_event_stream<B, E, F, T>(
    bytes: B,
    classify: F,
) -> impl Stream<Item = Result<T, StreamError>>
where
    B: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
    F: for<'a> Fn(&'a str) -> LineEvent<'a>,
    T: DeserializeOwned,
{
    let state = DecodeState {
        buffer: String::new(),
        failed: false,
    };

    bytes
        .scan(state, move |state, chunk| {
            if state.failed {
                return futures::future::ready(None);
            }

            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    state.failed = true;
                    let err = StreamError::Transport(e.to_string());
                    return futures::future::ready(Some(vec![Err(err)]));
                }
            };

            // Append new chunk data to buffer
            state.buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete lines (ending with \n)
            let mut items: Vec<Result<T, StreamError>> = vec![];
            let mut last_newline_pos = 0;

            for (idx, _) in state.buffer.match_indices('\n') {
                let line = &state.buffer[last_newline_pos..idx];
                last_newline_pos = idx + 1;

                match classify(line) {
                    LineEvent::Data(payload) => {
                        if !payload.trim().is_empty() {
                            match serde_json::from_str::<T>(payload) {
                                Ok(parsed) => items.push(Ok(parsed)),
                                Err(e) => {
                                    event!(Level::TRACE, line = payload, error = %e, "skipping unparseable line");
                                }
                            }
                        }
                    }
                    LineEvent::Ignore => {}
                    LineEvent::Done => break,
                }
            }

            // Keep incomplete line in buffer
            state.buffer = state.buffer[last_newline_pos..].to_string();

            futures::future::ready(Some(items))
        })
        .flat_map(|items| stream::iter(items))
}

impl Client {
    pub fn default() -> Self {
        Client {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_headers(headers: HeaderMap) -> Self {
        Client {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()
                .expect("Failed to build headers"),
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn get<U, T>(&self, url: U) -> anyhow::Result<T>
    where
        U: reqwest::IntoUrl + std::fmt::Debug,
        T: DeserializeOwned,
    {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(anyhow::anyhow!(
                "Request failed with status {}: {}",
                status,
                error_body
            ));
        }
        let text = response.text().await?;
        event!(Level::TRACE, response = text);

        Ok(serde_json::from_str::<T>(&text)?)
    }

    #[instrument(level = "trace", skip(self, request), fields(json_request = serde_json::to_string(request).unwrap()))]
    pub async fn post<U, S, T>(&self, url: U, request: &S) -> anyhow::Result<T>
    where
        U: reqwest::IntoUrl + std::fmt::Debug,
        S: Serialize + Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(url).json(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(anyhow::anyhow!(
                "Request failed with status {}: {}",
                status,
                error_body
            ));
        }
        let text = response.text().await?;
        event!(Level::TRACE, response = text);

        Ok(serde_json::from_str::<T>(&text)?)
    }

    /// POST a JSON request and lazily decode the chunked event-stream reply.
    ///
    /// Returns a finite, non-restartable stream of parsed events in arrival
    /// order, exactly once per event. An initial rejection fails this call;
    /// a failure after the stream starts is delivered in-band as the final
    /// `Err` item (the await side of the stream never raises).
    #[instrument(level = "trace", skip(self, request, classify), fields(json_request = serde_json::to_string(request).unwrap()))]
    pub async fn post_stream<U, S, F, T>(
        &self,
        url: U,
        request: &S,
        classify: F,
    ) -> Result<BoxedStream<Result<T, StreamError>>, StreamError>
    where
        U: reqwest::IntoUrl + Debug,
        S: Serialize + Sized,
        T: DeserializeOwned + Send + 'static,
        F: for<'a> Fn(&'a str) -> LineEvent<'a> + Send + 'static,
    {
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(StreamError::Rejected { status, body });
        }

        Ok(Box::pin(decode_event_stream(
            response.bytes_stream(),
            classify,
        )))
    }
}
