//! User-notification seam.
//!
//! The toast system is an external collaborator; the state layer reports
//! mutation outcomes through this narrow interface and never renders
//! anything itself.

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// Build a success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Build an error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Sink for user-facing notices.
pub trait Notifier: Send + Sync {
    /// Surface a notice to the user.
    fn notify(&self, notice: Notice);
}

/// Default notifier that writes notices to the log.
///
/// Useful for headless contexts and tests that don't care about notices;
/// interactive front ends install their own implementation.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::info!(message = %notice.message, "notice"),
            NoticeLevel::Error => tracing::warn!(message = %notice.message, "notice"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_constructors() {
        let notice = Notice::success("Added to wishlist");
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Added to wishlist");

        let notice = Notice::error("Could not update wishlist");
        assert_eq!(notice.level, NoticeLevel::Error);
    }
}
