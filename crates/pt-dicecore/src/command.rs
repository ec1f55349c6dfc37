//! Normalized inbound commands.

use serde::{Deserialize, Serialize};

/// The sender's standing in the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// A regular member.
    #[default]
    User,
    /// A channel administrator.
    Admin,
    /// The channel owner.
    Owner,
}

/// Who sent a command, and where.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandContext {
    /// Platform user id.
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Role of the sender.
    pub user_role: UserRole,
    /// Platform-qualified channel id.
    pub channel_id: String,
    /// Id of the message carrying the command, if known.
    pub message_id: Option<String>,
    /// Id of the message this command replies to.
    pub reply_to: Option<String>,
}

impl CommandContext {
    /// Create a context for a regular user.
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            channel_id: channel_id.into(),
            ..Self::default()
        }
    }

    /// Set the sender's role.
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.user_role = role;
        self
    }

    /// Set the id of the message carrying the command.
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Mark the command as a reply to another message.
    pub fn with_reply_to(mut self, id: impl Into<String>) -> Self {
        self.reply_to = Some(id.into());
        self
    }

    /// Admins and owners may act on other users' cards.
    pub fn is_admin(&self) -> bool {
        matches!(self.user_role, UserRole::Admin | UserRole::Owner)
    }

    /// Neutral mention token for the sender.
    pub fn mention(&self) -> String {
        mention(&self.user_id)
    }
}

/// A command with its prefix already stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command text, e.g. `r d100 侦查`. Hooks may rewrite it.
    pub command: String,
    /// Sender and channel.
    pub context: CommandContext,
}

impl Command {
    /// Create a command.
    pub fn new(command: impl Into<String>, context: CommandContext) -> Self {
        Self {
            command: command.into(),
            context,
        }
    }
}

/// A reaction added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// The reacting user and the channel.
    pub context: CommandContext,
    /// The message reacted to.
    pub message_id: String,
    /// The emoji used.
    pub emoji: String,
}

/// Neutral mention token for a user id.
pub fn mention(user_id: &str) -> String {
    format!("<at id=\"{user_id}\"/>")
}

/// Strip a leading `.` or `。` command prefix.
pub fn strip_command_prefix(text: &str) -> Option<&str> {
    let text = text.trim_start();
    text.strip_prefix('.')
        .or_else(|| text.strip_prefix('。'))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_stripping() {
        assert_eq!(strip_command_prefix(".r d100"), Some("r d100"));
        assert_eq!(strip_command_prefix("。st 力量60"), Some("st 力量60"));
        assert_eq!(strip_command_prefix("hello"), None);
    }

    #[test]
    fn admin_roles() {
        let ctx = CommandContext::new("u1", "Maca", "c1");
        assert!(!ctx.is_admin());
        assert!(ctx.clone().with_role(UserRole::Admin).is_admin());
        assert!(ctx.with_role(UserRole::Owner).is_admin());
    }

    #[test]
    fn mention_token() {
        assert_eq!(mention("42"), "<at id=\"42\"/>");
    }
}
