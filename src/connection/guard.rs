// src/connection/guard.rs

//! RAII guard tying a connection's lifetime to the `active_connections`
//! counter, so the counter is decremented exactly once regardless of which
//! exit path (normal close, error, panic unwind) a handler takes.

use std::sync::Arc;

use crate::core::stats::Statistics;

pub struct ConnectionGuard {
    stats: Arc<Statistics>,
}

impl ConnectionGuard {
    /// Wraps a connection already counted via `Statistics::connection_opened`
    /// (done by the acceptor at admission time). The matching decrement
    /// happens in `Drop`, however the guard's owning task exits.
    pub fn new(stats: Arc<Statistics>) -> Self {
        Self { stats }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.stats.connection_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrements_on_drop() {
        let stats = Arc::new(Statistics::new());
        stats.connection_opened();
        {
            let _guard = ConnectionGuard::new(Arc::clone(&stats));
            assert_eq!(stats.snapshot().active_connections, 1);
        }
        assert_eq!(stats.snapshot().active_connections, 0);
    }
}
