use parking_lot::RwLock;
use std::sync::Arc;

pub type Atomic<T> = Arc<RwLock<T>>;

pub fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}
