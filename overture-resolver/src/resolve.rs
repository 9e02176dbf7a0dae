use overture_core::{ApiResponse, CallOutcome, FeedbackKey};

use crate::{resolve_static, FinalResult, ResolvedApiResult, StreamAggregator};

/// What the caller gets back: the annotated response, or the decorated
/// stream it iterates exactly as it would the undecorated one.
pub enum ResolvedReturn {
    Complete(ApiResponse),
    Streaming(StreamAggregator),
}

pub struct ResolvedCall {
    pub return_value: ResolvedReturn,
    /// Side channel only; resolves once, whether or not the caller ever
    /// finishes consuming `return_value`.
    pub final_result: FinalResult,
}

/// Split a call outcome into an immediate return value and a
/// background-resolving aggregate.
pub fn resolve_response(outcome: CallOutcome, feedback_key: FeedbackKey) -> ResolvedCall {
    match outcome {
        CallOutcome::Complete(mut response) => {
            let resolved: ResolvedApiResult = resolve_static(&mut response, &feedback_key);
            ResolvedCall {
                return_value: ResolvedReturn::Complete(response),
                final_result: FinalResult::ready(resolved),
            }
        }
        CallOutcome::Streaming(stream) => {
            let (aggregator, final_result) = StreamAggregator::new(stream, feedback_key);
            ResolvedCall {
                return_value: ResolvedReturn::Streaming(aggregator),
                final_result,
            }
        }
    }
}
