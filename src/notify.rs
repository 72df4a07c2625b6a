//! System notifications.

use notify_rust::Notification;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, error};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::{APP_NAME, APP_NAME_PRETTY};

/// Freedesktop icon name, ignored on platforms without icon themes.
const NOTIFICATION_ICON: &str = "audio-input-microphone";

/// Send a system notification with a summary and body.
pub fn notify(summary: &str, body: &str) {
    Notification::new()
        .icon(NOTIFICATION_ICON)
        .appname(APP_NAME)
        .summary(&format!("{} - {}", APP_NAME_PRETTY, summary))
        .body(body)
        .show()
        .map_err(|e| error!(target: "voxpaste::notify", "Failed to send notification: {}", e))
        .ok();
}

/// Visitor to extract the message field from tracing events.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        }
    }
}

/// Tracing layer that sends notifications for warnings and errors.
#[derive(Debug, Default)]
pub struct NotificationLayer {}

impl NotificationLayer {
    pub fn new() -> Self {
        Self {}
    }
}

fn should_notify(level: Level, target: &str) -> Option<&'static str> {
    // A failing notification must not try to notify about itself.
    if target == "voxpaste::notify" {
        return None;
    }
    match level {
        Level::ERROR => Some("error"),
        Level::WARN => Some("warning"),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for NotificationLayer {
    fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
        let metadata = event.metadata();

        if let Some(summary) = should_notify(*metadata.level(), metadata.target()) {
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);

            if let Some(message) = visitor.message {
                notify(summary, &message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_warnings_and_errors_notify() {
        assert_eq!(should_notify(Level::ERROR, "voxpaste"), Some("error"));
        assert_eq!(should_notify(Level::WARN, "voxpaste::process"), Some("warning"));
        assert_eq!(should_notify(Level::INFO, "voxpaste"), None);
        assert_eq!(should_notify(Level::DEBUG, "voxpaste"), None);
    }

    #[test]
    fn test_notification_failures_do_not_recurse() {
        assert_eq!(should_notify(Level::ERROR, "voxpaste::notify"), None);
    }
}
