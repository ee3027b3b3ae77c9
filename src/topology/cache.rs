//! Cache invalidation shared by the discretization layer.

/// Anything holding computed meshes that must be recomputable on demand
/// implements this.
pub trait InvalidateCache {
    /// Drop every cached result so the next compute starts over.
    fn invalidate_cache(&mut self);
}

impl<T: InvalidateCache> InvalidateCache for [T] {
    fn invalidate_cache(&mut self) {
        for item in self {
            item.invalidate_cache();
        }
    }
}
