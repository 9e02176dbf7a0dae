use async_trait::async_trait;

use crate::{ApiResponse, ChatRequest, ChunkStream, ProviderError};

/// The remote text-generation collaborator. Transport and auth live behind
/// this seam; the middleware only needs the two call shapes.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ApiResponse, ProviderError>;

    async fn stream(&self, request: ChatRequest) -> Result<ChunkStream, ProviderError>;
}
