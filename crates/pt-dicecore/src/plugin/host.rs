//! Callbacks into the chat host.

use async_trait::async_trait;

use crate::command::Command;

/// Functions the host supplies to the engine and to plugin hooks.
///
/// Every method has a no-op default, so hosts implement only what their
/// platform supports.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Post a message to a channel.
    async fn send_to_channel(&self, _channel_id: &str, _message: &str) {}

    /// Send a private message to a user.
    async fn send_to_user(&self, _user_id: &str, _message: &str) {}

    /// Fetch the text of an earlier message.
    async fn fetch_message_content(&self, _channel_id: &str, _message_id: &str) -> Option<String> {
        None
    }

    /// Run a command as if a user had typed it.
    async fn dispatch_user_command(&self, _command: Command) {}
}

/// A host that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

#[async_trait]
impl HostApi for NoopHost {}
