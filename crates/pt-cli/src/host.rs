use async_trait::async_trait;
use colored::Colorize;

use pt_dicecore::HostApi;

/// Prints engine callbacks to the terminal.
pub struct TerminalHost;

#[async_trait]
impl HostApi for TerminalHost {
    async fn send_to_channel(&self, _channel_id: &str, message: &str) {
        println!("{message}");
    }

    async fn send_to_user(&self, user_id: &str, message: &str) {
        println!("{} {message}", format!("[私聊 {user_id}]").dimmed());
    }
}
