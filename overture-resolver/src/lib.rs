//! Response resolution: papers over the difference between streamed and
//! unstreamed responses. The caller gets a return value it can use exactly
//! as it would the undecorated one; a side-channel future resolves once
//! with the normalized aggregate used for reporting.

mod aggregate;
mod resolve;
mod stream;

pub use aggregate::{resolve_static, ResolvedApiResult};
pub use resolve::{resolve_response, ResolvedCall, ResolvedReturn};
pub use stream::{FinalResult, StreamAggregator};
