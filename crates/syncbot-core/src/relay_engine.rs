//! Side effects for classified events.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::correlation_token::{encode_for_review_body, ChatThreadLink, CorrelationToken};
use crate::event_classifier::{
    classify_chat_message, classify_review_event, IgnoreReason, RelayDecision,
};
use crate::message_layout::{
    description_fallback_text, render_description_blocks, render_github_relay_text,
    render_slack_relay_text, render_submission_blocks, submission_fallback_text,
};
use crate::platform_api::{ChatApi, ChatPostMessage, RelayError, ReviewApi};
use crate::relay_config::RelayConfig;
use crate::relay_event::{ChatMessagePosted, ReviewEvent, SubmissionOpened};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Ignored(IgnoreReason),
    LinkCreated { token: CorrelationToken },
    RelayedToChat { token: CorrelationToken },
    RelayedToReview { link: ChatThreadLink },
}

impl RelayOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Ignored(_) => "ignored",
            Self::LinkCreated { .. } => "link_created",
            Self::RelayedToChat { .. } => "relayed_to_chat",
            Self::RelayedToReview { .. } => "relayed_to_review",
        }
    }
}

#[derive(Clone)]
/// Classifies events and performs the platform calls they require.
pub struct RelayEngine {
    config: RelayConfig,
    chat: Arc<dyn ChatApi>,
    review: Arc<dyn ReviewApi>,
}

impl RelayEngine {
    pub fn new(config: RelayConfig, chat: Arc<dyn ChatApi>, review: Arc<dyn ReviewApi>) -> Self {
        Self {
            config,
            chat,
            review,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub async fn handle_review_event(&self, event: &ReviewEvent) -> Result<RelayOutcome, RelayError> {
        let decision = classify_review_event(event, &self.config);
        debug!(
            kind = event.kind(),
            number = event.number(),
            role = decision.role(),
            "classified github event"
        );
        self.execute(decision).await
    }

    pub async fn handle_chat_message(
        &self,
        message: &ChatMessagePosted,
    ) -> Result<RelayOutcome, RelayError> {
        let decision = classify_chat_message(message, &self.config, self.chat.as_ref()).await?;
        debug!(
            channel = %message.channel_id,
            ts = %message.ts,
            role = decision.role(),
            "classified slack message"
        );
        self.execute(decision).await
    }

    async fn execute(&self, decision: RelayDecision) -> Result<RelayOutcome, RelayError> {
        match decision {
            RelayDecision::CreateLink(submission) => self.create_link(&submission).await,
            RelayDecision::RelayToChat {
                token,
                actor_login,
                text,
            } => self.relay_to_chat(token, &actor_login, &text).await,
            RelayDecision::RelayToReview {
                link,
                user_id,
                text,
            } => self.relay_to_review(link, &user_id, &text).await,
            RelayDecision::Ignore(reason) => {
                debug!(reason = reason.as_str(), "event ignored");
                Ok(RelayOutcome::Ignored(reason))
            }
        }
    }

    /// Posts the thread root, records the marker in the pull-request body, then
    /// posts the description as the first reply.
    ///
    /// Nothing is written to GitHub unless the root post succeeds.
    pub async fn create_link(
        &self,
        submission: &SubmissionOpened,
    ) -> Result<RelayOutcome, RelayError> {
        let root = ChatPostMessage::text(
            self.config.chat_channel.clone(),
            submission_fallback_text(submission),
        )
        .with_blocks(render_submission_blocks(
            submission,
            self.config.preview_base_url.as_deref(),
        ));
        let posted = self.chat.post_message(&root).await?;
        let token = CorrelationToken::new(posted.channel, posted.ts);

        let linked_body = encode_for_review_body(&token, &submission.body);
        if let Err(error) = self
            .review
            .update_pull_request_body(&submission.repository, submission.number, &linked_body)
            .await
        {
            warn!(
                repo = %submission.repository,
                number = submission.number,
                channel = %token.channel_id,
                thread_ts = %token.thread_ts,
                error = %error,
                "slack thread created but pull request body was not linked"
            );
            return Err(error);
        }

        let description = ChatPostMessage::text(
            token.channel_id.clone(),
            description_fallback_text(&submission.body),
        )
        .in_thread(token.thread_ts.clone())
        .with_blocks(render_description_blocks(&submission.body));
        self.chat.post_message(&description).await?;

        info!(
            repo = %submission.repository,
            number = submission.number,
            channel = %token.channel_id,
            thread_ts = %token.thread_ts,
            "linked pull request to slack thread"
        );
        Ok(RelayOutcome::LinkCreated { token })
    }

    pub async fn relay_to_chat(
        &self,
        token: CorrelationToken,
        actor_login: &str,
        text: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let message = ChatPostMessage::text(
            token.channel_id.clone(),
            render_github_relay_text(actor_login, text),
        )
        .in_thread(token.thread_ts.clone());
        self.chat.post_message(&message).await?;
        info!(
            channel = %token.channel_id,
            thread_ts = %token.thread_ts,
            actor = actor_login,
            "relayed github comment to slack"
        );
        Ok(RelayOutcome::RelayedToChat { token })
    }

    pub async fn relay_to_review(
        &self,
        link: ChatThreadLink,
        user_id: &str,
        text: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let profile = self.chat.user_profile(user_id).await?;
        let body = render_slack_relay_text(&profile.attribution_name(user_id), text);
        self.review
            .create_issue_comment(&link.repo, link.pr_number, &body)
            .await?;
        info!(
            repo = %link.repo,
            number = link.pr_number,
            user = user_id,
            "relayed slack reply to github"
        );
        Ok(RelayOutcome::RelayedToReview { link })
    }
}
