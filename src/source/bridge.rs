use super::*;
use serde::Deserialize;
use std::time::Instant;

/// Source backed by a connector bridge that streams platform events as
/// Server-Sent Events.
///
/// The bridge is asked for a stream with `POST <url> {"username": ...}` and
/// answers with `text/event-stream`, one JSON payload per `data:` field:
///
/// ```text
/// data: {"type":"comment","data":{"username":"a","text":"hi","avatar":null}}
/// data: {"type":"like","data":3}
/// data: {"type":"streamEnd"}
/// ```
pub struct BridgeSource {
    url: String,
    client: reqwest::Client,
    connect_timeout: Duration,
}

impl BridgeSource {
    pub fn new(url: String, connect_timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SourceError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            client,
            connect_timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
enum BridgePayload {
    #[serde(alias = "chat")]
    Comment(BridgeComment),
    Like(BridgeLike),
    Connected,
    #[serde(alias = "disconnected")]
    StreamEnd,
}

#[derive(Debug, Deserialize)]
struct BridgeComment {
    #[serde(alias = "nickname", alias = "uniqueId")]
    username: String,
    #[serde(alias = "comment")]
    text: String,
    #[serde(default, alias = "profilePictureUrl", alias = "avatarUrl")]
    avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BridgeLike {
    Count(u64),
    Object {
        #[serde(alias = "likeCount")]
        count: u64,
    },
}

/// What a single SSE payload means for the subscription
#[derive(Debug, PartialEq)]
enum Decoded {
    Event(SourceEvent),
    End,
}

fn decode_payload(payload: &str) -> Result<Decoded, serde_json::Error> {
    let decoded = match serde_json::from_str::<BridgePayload>(payload)? {
        BridgePayload::Comment(c) => Decoded::Event(SourceEvent::Chat(ChatEvent {
            author_name: c.username,
            text: c.text,
            avatar_url: c.avatar.filter(|a| !a.is_empty()),
        })),
        BridgePayload::Like(BridgeLike::Count(count))
        | BridgePayload::Like(BridgeLike::Object { count }) => {
            Decoded::Event(SourceEvent::Like { count })
        }
        BridgePayload::Connected => Decoded::Event(SourceEvent::Connected),
        BridgePayload::StreamEnd => Decoded::End,
    };
    Ok(decoded)
}

#[async_trait]
impl LiveSource for BridgeSource {
    async fn subscribe(
        &self,
        username: &str,
        events: mpsc::Sender<SourceEvent>,
    ) -> SourceResult<()> {
        let start = Instant::now();

        let mut response = tokio::time::timeout(
            self.connect_timeout,
            self.client
                .post(&self.url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .json(&serde_json::json!({ "username": username }))
                .send(),
        )
        .await
        .map_err(|_| SourceError::Timeout(self.connect_timeout))?
        .map_err(|e| SourceError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Connect(format!(
                "bridge returned {}: {}",
                status, body
            )));
        }

        tracing::info!(
            "Bridge stream for {} opened in {}ms",
            username,
            start.elapsed().as_millis()
        );
        if events.send(SourceEvent::Connected).await.is_err() {
            return Ok(());
        }

        let mut decoder = SseDecoder::default();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SourceError::Stream(e.to_string()))?
        {
            for payload in decoder.push(&chunk) {
                match decode_payload(&payload) {
                    Ok(Decoded::Event(event)) => {
                        if events.send(event).await.is_err() {
                            // Nobody is listening anymore
                            return Ok(());
                        }
                    }
                    Ok(Decoded::End) => {
                        tracing::info!("Stream of {} ended", username);
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::debug!("Skipping bridge payload ({}): {}", e, payload);
                    }
                }
            }
        }

        Err(SourceError::Stream("bridge closed the stream".to_string()))
    }

    fn name(&self) -> &str {
        "bridge"
    }
}

/// Largest event the decoder buffers. Anything bigger is dropped up to the
/// next event boundary.
pub const MAX_EVENT_BYTES: usize = 64 * 1024;

/// Incremental Server-Sent Events parser. Feed it raw body chunks, get back
/// the `data` of every complete event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    /// Inside an oversized event whose head was already thrown away
    discarding: bool,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(end) = find_event_end(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..end + 2).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            let text = String::from_utf8_lossy(&block);

            let data: Vec<&str> = text
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
                .collect();

            if !data.is_empty() {
                payloads.push(data.join("\n"));
            }
        }

        if self.buf.len() > MAX_EVENT_BYTES {
            tracing::warn!("Dropping SSE event larger than {} bytes", MAX_EVENT_BYTES);
            // A trailing newline may be the first half of the boundary
            let ends_with_newline = self.buf.last() == Some(&b'\n');
            self.buf.clear();
            if ends_with_newline {
                self.buf.push(b'\n');
            }
            self.discarding = true;
        }

        payloads
    }
}

fn find_event_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}
