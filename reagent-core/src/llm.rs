use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::AgentError;

/// One completion call against the model boundary. `stop` carries the
/// literal markers the provider should halt generation on; providers that
/// cannot honor them may ignore the field, the parser strips them anyway.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, stop: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            stop,
        }
    }
}

/// Opaque completion boundary. The graph only ever consumes the token
/// stream so partial output can be surfaced while a node is in flight;
/// `complete` is a convenience that folds the stream.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    fn stream(&self, request: CompletionRequest) -> BoxStream<'_, Result<String, AgentError>>;

    async fn complete(&self, request: CompletionRequest) -> Result<String, AgentError> {
        let mut stream = self.stream(request);
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}
