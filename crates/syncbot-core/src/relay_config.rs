/// Values the relay needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Label that marks a pull request as a submission.
    pub submission_label: String,
    /// Channel that receives new submission threads.
    pub chat_channel: String,
    /// Author of integration-owned thread roots.
    pub root_author_id: String,
    /// Slack user the integration posts as; its own messages are never relayed.
    pub bot_user_id: String,
    /// Base URL for the "Play Preview" button; no button when unset.
    pub preview_base_url: Option<String>,
}

impl RelayConfig {
    pub fn is_submission_label(&self, label: &str) -> bool {
        let configured = self.submission_label.trim();
        !configured.is_empty() && label.trim() == configured
    }
}
