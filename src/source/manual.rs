use super::*;

/// Source whose events are pushed in-process with [`ManualSource::emit`].
/// Used by tests and for rehearsing a show without a live stream.
pub struct ManualSource {
    sink: Mutex<Option<mpsc::Sender<SourceEvent>>>,
    /// When set, every subscribe attempt fails with this message
    failure: Option<String>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self {
            sink: Mutex::new(None),
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            sink: Mutex::new(None),
            failure: Some(message.to_string()),
        }
    }

    /// Deliver an event to the current subscriber.
    /// Returns false if nobody is subscribed.
    pub async fn emit(&self, event: SourceEvent) -> bool {
        let sink = self.sink.lock().await.clone();
        match sink {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    pub async fn chat(&self, author: &str, text: &str) -> bool {
        self.emit(SourceEvent::Chat(ChatEvent {
            author_name: author.to_string(),
            text: text.to_string(),
            avatar_url: None,
        }))
        .await
    }

    pub async fn like(&self, count: u64) -> bool {
        self.emit(SourceEvent::Like { count }).await
    }
}

impl Default for ManualSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiveSource for ManualSource {
    async fn subscribe(
        &self,
        username: &str,
        events: mpsc::Sender<SourceEvent>,
    ) -> SourceResult<()> {
        if let Some(message) = &self.failure {
            return Err(SourceError::Connect(message.clone()));
        }

        tracing::debug!("Manual source subscribed for {}", username);
        *self.sink.lock().await = Some(events.clone());

        if events.send(SourceEvent::Connected).await.is_err() {
            return Ok(());
        }

        // Stay subscribed until the receiving side goes away
        events.closed().await;
        Ok(())
    }

    fn name(&self) -> &str {
        "manual"
    }
}
