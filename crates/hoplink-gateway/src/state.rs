use std::sync::Arc;

use hoplink_allocator::AllocatorService;
use hoplink_redirector::ResolverService;

/// Shared handler state, generic over the deployment's store and cache
/// backends.
pub struct AppState<S, C> {
    pub allocator: AllocatorService<S, C>,
    pub resolver: ResolverService<S, C>,
    pub store: Arc<S>,
    pub cache: Arc<C>,
    pub base_url: String,
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            allocator: self.allocator.clone(),
            resolver: self.resolver.clone(),
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            base_url: self.base_url.clone(),
        }
    }
}
