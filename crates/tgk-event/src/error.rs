//! Error types for event dispatch

/// Errors raised while wiring or dispatching events
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// No tokio runtime is running on the calling thread
    #[error("no async runtime available: {0}")]
    NoRuntime(String),

    /// The serial queue consumer has stopped
    #[error("serial queue '{0}' is closed")]
    QueueClosed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_closed_display() {
        let err = EventError::QueueClosed("main".to_string());
        assert_eq!(err.to_string(), "serial queue 'main' is closed");
    }
}
