// ViewerContext Middleware - request identity resolution and extractors

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::*;
pub use viewer_context_middleware::*;
