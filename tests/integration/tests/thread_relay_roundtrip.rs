use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use serde_json::{json, Value};
use syncbot_core::{
    decode_from_review_body, ChatApi, ChatPostMessage, ChatPostedMessage, ChatThreadRoot,
    ChatUserProfile, IgnoreReason, RelayConfig, RelayEngine, RelayError, RelayOutcome, RepoRef,
    ReviewApi, ReviewEvent,
};
use syncbot_github::parse_github_webhook;
use syncbot_slack::{normalize_socket_envelope, SlackSocketEnvelope};
use tokio::sync::Mutex as AsyncMutex;

const BOT_USER: &str = "UBOT";
const CHANNEL: &str = "CSUB";

/// Slack workspace that keeps every posted message so thread roots can be
/// read back the way `conversations.history` would return them.
struct ScriptedChat {
    posts: AsyncMutex<Vec<(String, ChatPostMessage)>>,
    next_ts: AtomicU64,
    fail_posts: bool,
}

impl ScriptedChat {
    fn new(fail_posts: bool) -> Self {
        Self {
            posts: AsyncMutex::new(Vec::new()),
            next_ts: AtomicU64::new(100),
            fail_posts,
        }
    }

    async fn posts(&self) -> Vec<(String, ChatPostMessage)> {
        self.posts.lock().await.clone()
    }
}

#[async_trait]
impl ChatApi for ScriptedChat {
    async fn post_message(
        &self,
        message: &ChatPostMessage,
    ) -> Result<ChatPostedMessage, RelayError> {
        if self.fail_posts {
            return Err(RelayError::upstream("chat.postMessage", "not_in_channel"));
        }
        let ts = format!(
            "1700000000.{:06}",
            self.next_ts.fetch_add(1, Ordering::Relaxed)
        );
        self.posts.lock().await.push((ts.clone(), message.clone()));
        Ok(ChatPostedMessage {
            channel: message.channel.clone(),
            ts,
        })
    }

    async fn fetch_thread_root(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Option<ChatThreadRoot>, RelayError> {
        let posts = self.posts.lock().await;
        Ok(posts
            .iter()
            .filter(|(ts, post)| post.channel == channel && ts.as_str() <= thread_ts)
            .max_by(|left, right| left.0.cmp(&right.0))
            .map(|(ts, post)| ChatThreadRoot {
                ts: ts.clone(),
                user_id: Some(BOT_USER.to_string()),
                header_block_id: post
                    .blocks
                    .as_ref()
                    .and_then(|blocks| blocks.get(0))
                    .and_then(|block| block.get("block_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }))
    }

    async fn user_profile(&self, user_id: &str) -> Result<ChatUserProfile, RelayError> {
        let display_name = if user_id == "UADA" { "Ada" } else { "" };
        Ok(ChatUserProfile {
            display_name: display_name.to_string(),
            real_name: String::new(),
        })
    }
}

#[derive(Default)]
struct ScriptedReview {
    bodies: AsyncMutex<HashMap<u64, String>>,
    comments: AsyncMutex<Vec<(RepoRef, u64, String)>>,
}

#[async_trait]
impl ReviewApi for ScriptedReview {
    async fn update_pull_request_body(
        &self,
        _repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), RelayError> {
        self.bodies.lock().await.insert(number, body.to_string());
        Ok(())
    }

    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<(), RelayError> {
        self.comments
            .lock()
            .await
            .push((repo.clone(), number, body.to_string()));
        Ok(())
    }
}

fn relay_config() -> RelayConfig {
    RelayConfig {
        submission_label: "submission".to_string(),
        chat_channel: CHANNEL.to_string(),
        root_author_id: BOT_USER.to_string(),
        bot_user_id: BOT_USER.to_string(),
        preview_base_url: Some("https://sprig.example".to_string()),
    }
}

fn github_event(event: &str, payload: Value) -> ReviewEvent {
    parse_github_webhook(event, payload.to_string().as_bytes())
        .expect("parse webhook")
        .expect("handled event")
}

fn labeled(body: &str) -> ReviewEvent {
    github_event(
        "pull_request",
        json!({
            "action": "labeled",
            "label": {"name": "submission"},
            "pull_request": {
                "number": 42,
                "title": "Maze",
                "body": body,
                "html_url": "https://github.com/org/repo/pull/42",
                "head": {"repo": {"full_name": "player/repo"}}
            },
            "repository": {"full_name": "org/repo"},
            "sender": {"login": "maintainer", "type": "User"}
        }),
    )
}

fn commented(thread_body: &str, login: &str, sender_type: &str, text: &str) -> ReviewEvent {
    github_event(
        "issue_comment",
        json!({
            "action": "created",
            "issue": {"number": 42, "body": thread_body},
            "comment": {"body": text},
            "sender": {"login": login, "type": sender_type},
            "repository": {"full_name": "org/repo"}
        }),
    )
}

fn slack_envelope(event: Value) -> SlackSocketEnvelope {
    serde_json::from_value(json!({
        "envelope_id": "env",
        "type": "events_api",
        "payload": {"type": "event_callback", "event_id": "Ev", "event_time": 1, "event": event}
    }))
    .expect("envelope")
}

#[tokio::test]
async fn integration_submission_thread_round_trips_between_platforms() {
    let chat = Arc::new(ScriptedChat::new(false));
    let review = Arc::new(ScriptedReview::default());
    let engine = RelayEngine::new(relay_config(), chat.clone(), review.clone());

    let outcome = engine
        .handle_review_event(&labeled("Fun game!"))
        .await
        .expect("link");
    let RelayOutcome::LinkCreated { token } = outcome else {
        panic!("expected link, got {outcome:?}");
    };
    let linked_body = review
        .bodies
        .lock()
        .await
        .get(&42)
        .cloned()
        .expect("linked body");
    assert_eq!(decode_from_review_body(&linked_body), Some(token.clone()));
    assert!(linked_body.ends_with("\nFun game!"));

    let posts = chat.posts().await;
    assert_eq!(posts.len(), 2);
    assert!(posts[0].1.text.contains("[#42]"));
    assert_eq!(posts[1].1.thread_ts.as_deref(), Some(token.thread_ts.as_str()));
    assert!(posts[1].1.text.contains("Fun game!"));

    // Re-labeling the linked pull request is a no-op.
    assert_eq!(
        engine
            .handle_review_event(&labeled(&linked_body))
            .await
            .expect("relabel"),
        RelayOutcome::Ignored(IgnoreReason::AlreadyLinked)
    );

    engine
        .handle_review_event(&commented(&linked_body, "octocat", "User", "nice work"))
        .await
        .expect("github to slack");
    let posts = chat.posts().await;
    assert_eq!(posts.len(), 3);
    let (relayed_ts, relayed) = &posts[2];
    assert_eq!(relayed.text, "[Github] octocat: nice work");
    assert_eq!(relayed.thread_ts.as_deref(), Some(token.thread_ts.as_str()));

    // The relayed post echoes back over Socket Mode as the bot's own message.
    let echo = normalize_socket_envelope(&slack_envelope(json!({
        "type": "message",
        "user": BOT_USER,
        "bot_id": "B1",
        "parent_user_id": BOT_USER,
        "channel": CHANNEL,
        "text": relayed.text,
        "ts": relayed_ts,
        "thread_ts": token.thread_ts,
    })))
    .expect("normalize")
    .expect("message");
    assert_eq!(
        engine.handle_chat_message(&echo).await.expect("echo"),
        RelayOutcome::Ignored(IgnoreReason::SelfEcho)
    );

    let reply = normalize_socket_envelope(&slack_envelope(json!({
        "type": "message",
        "user": "UADA",
        "parent_user_id": BOT_USER,
        "channel": CHANNEL,
        "text": "looks good",
        "ts": "1700000000.999999",
        "thread_ts": token.thread_ts,
    })))
    .expect("normalize")
    .expect("message");
    engine
        .handle_chat_message(&reply)
        .await
        .expect("slack to github");
    assert_eq!(
        review.comments.lock().await.clone(),
        vec![(
            RepoRef::new("org", "repo"),
            42,
            "[Slack] Ada: looks good".to_string()
        )]
    );

    // GitHub delivers the relayed comment back, authored by the app.
    assert_eq!(
        engine
            .handle_review_event(&commented(
                &linked_body,
                "sync-bot[bot]",
                "Bot",
                "[Slack] Ada: looks good"
            ))
            .await
            .expect("bot comment"),
        RelayOutcome::Ignored(IgnoreReason::AutomationActor)
    );
    assert_eq!(chat.posts().await.len(), 3);
}

#[tokio::test]
async fn integration_chat_failure_leaves_pull_request_unlinked() {
    let chat = Arc::new(ScriptedChat::new(true));
    let review = Arc::new(ScriptedReview::default());
    let engine = RelayEngine::new(relay_config(), chat.clone(), review.clone());

    let error = engine
        .handle_review_event(&labeled("Fun game!"))
        .await
        .expect_err("chat post fails");
    assert!(matches!(error, RelayError::Upstream { .. }));
    assert!(review.bodies.lock().await.is_empty());
    assert!(chat.posts().await.is_empty());

    // Without a marker, comments on the pull request go nowhere.
    assert_eq!(
        engine
            .handle_review_event(&commented("Fun game!", "octocat", "User", "hello?"))
            .await
            .expect("unlinked comment"),
        RelayOutcome::Ignored(IgnoreReason::NoLink)
    );
}

#[tokio::test]
async fn integration_replies_in_unrelated_threads_are_not_relayed() {
    let chat = Arc::new(ScriptedChat::new(false));
    let review = Arc::new(ScriptedReview::default());
    let engine = RelayEngine::new(relay_config(), chat.clone(), review.clone());

    let posted = chat
        .post_message(&ChatPostMessage::text(CHANNEL, "standup notes"))
        .await
        .expect("plain post");
    let reply = normalize_socket_envelope(&slack_envelope(json!({
        "type": "message",
        "user": "UADA",
        "parent_user_id": BOT_USER,
        "channel": CHANNEL,
        "text": "ack",
        "ts": "1700000000.999999",
        "thread_ts": posted.ts,
    })))
    .expect("normalize")
    .expect("message");
    assert_eq!(
        engine.handle_chat_message(&reply).await.expect("reply"),
        RelayOutcome::Ignored(IgnoreReason::NoLink)
    );

    let other_author = normalize_socket_envelope(&slack_envelope(json!({
        "type": "message",
        "user": "UADA",
        "parent_user_id": "USOMEONE",
        "channel": CHANNEL,
        "text": "ack",
        "ts": "1700000000.999998",
        "thread_ts": posted.ts,
    })))
    .expect("normalize")
    .expect("message");
    assert_eq!(
        engine
            .handle_chat_message(&other_author)
            .await
            .expect("reply"),
        RelayOutcome::Ignored(IgnoreReason::UnrelatedThread)
    );
    assert!(review.comments.lock().await.is_empty());
}
