use tracing::warn;

/// Best-effort desktop notifications. Failures are logged and swallowed; a
/// missing notification daemon must never fail a sync.
#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// A notifier that drops everything, for tests and headless hosts.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn notify(&self, summary: &str, body: &str) {
        if !self.enabled {
            return;
        }

        if let Err(e) = notify_rust::Notification::new()
            .appname("Auraxsync")
            .summary(summary)
            .body(body)
            .show()
        {
            warn!("Failed to deliver desktop notification: {}", e);
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
