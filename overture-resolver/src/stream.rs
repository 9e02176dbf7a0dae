use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::oneshot;

use overture_core::{
    ApiChunk, ChatStreamEvent, ChunkStream, ContentDelta, FeedbackKey, ProviderError,
    ResponseMetrics, Usage,
};

use crate::ResolvedApiResult;

/// Decorates a live chunk stream. Every chunk passes through unchanged
/// (same order, same content, feedback key added); the aggregator only
/// observes each chunk on its way to the consumer.
///
/// Finalization is exactly-once: the sender latch is taken on normal
/// end-of-stream, on an upstream error, or in `Drop` when the consumer
/// stops early. Whatever partial text was accumulated is what resolves.
pub struct StreamAggregator {
    inner: ChunkStream,
    feedback_key: FeedbackKey,
    accumulated: Vec<String>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
    finish: Option<oneshot::Sender<ResolvedApiResult>>,
}

impl StreamAggregator {
    pub fn new(inner: ChunkStream, feedback_key: FeedbackKey) -> (Self, FinalResult) {
        let (sender, receiver) = oneshot::channel();
        let aggregator = Self {
            inner,
            feedback_key,
            accumulated: Vec::new(),
            stop_reason: None,
            usage: None,
            finish: Some(sender),
        };
        (aggregator, FinalResult::pending(receiver))
    }

    fn observe(&mut self, chunk: &mut ApiChunk) {
        match chunk {
            ApiChunk::Chat(chunk) => {
                chunk.feedback_key = Some(self.feedback_key.clone());
                match &chunk.event {
                    ChatStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                        ContentDelta::TextDelta { text } => self.accumulated.push(text.clone()),
                        ContentDelta::InputJsonDelta { partial_json } => {
                            self.accumulated.push(partial_json.clone())
                        }
                    },
                    ChatStreamEvent::MessageDelta { delta, usage } => {
                        if let Some(reason) = &delta.stop_reason {
                            self.stop_reason = Some(reason.clone());
                        }
                        if let Some(usage) = usage {
                            self.usage = Some(usage.clone());
                        }
                    }
                    _ => {}
                }
            }
            ApiChunk::Completion(completion) => {
                completion.feedback_key = Some(self.feedback_key.clone());
                if let Some(fragment) = &completion.completion {
                    self.accumulated.push(fragment.clone());
                }
                self.stop_reason = completion.stop_reason.clone();
            }
        }
    }

    // Single transition out of the streaming state. Sending never panics;
    // a receiver that went away is ignored.
    fn finalize(&mut self) {
        if let Some(sender) = self.finish.take() {
            let result = ResolvedApiResult {
                text: Some(self.accumulated.join("")),
                metrics: ResponseMetrics {
                    usage: self.usage.take(),
                    stop_reason: self.stop_reason.take(),
                },
                tool_calls: Vec::new(),
            };
            let _ = sender.send(result);
        }
    }
}

impl Stream for StreamAggregator {
    type Item = Result<ApiChunk, ProviderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(mut chunk))) => {
                this.observe(&mut chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.finalize();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finalize();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamAggregator {
    fn drop(&mut self) {
        self.finalize();
    }
}

/// Resolves once with the normalized aggregate. Never errors and never
/// hangs once the aggregator has been dropped or has finished.
pub struct FinalResult(FinalResultInner);

enum FinalResultInner {
    Ready(Option<ResolvedApiResult>),
    Pending(oneshot::Receiver<ResolvedApiResult>),
}

impl FinalResult {
    pub fn ready(result: ResolvedApiResult) -> Self {
        Self(FinalResultInner::Ready(Some(result)))
    }

    fn pending(receiver: oneshot::Receiver<ResolvedApiResult>) -> Self {
        Self(FinalResultInner::Pending(receiver))
    }
}

impl Future for FinalResult {
    type Output = ResolvedApiResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().0 {
            FinalResultInner::Ready(slot) => Poll::Ready(slot.take().unwrap_or_default()),
            FinalResultInner::Pending(receiver) => {
                Pin::new(receiver).poll(cx).map(|r| r.unwrap_or_default())
            }
        }
    }
}
