//! Slack side of sync-bot: Web API client and Socket Mode ingestion.

pub mod slack_api_client;
pub mod slack_socket;
pub mod slack_socket_runtime;

pub use slack_api_client::SlackApiClient;
pub use slack_socket::{
    ack_payload, normalize_socket_envelope, parse_socket_envelope, SlackSocketEnvelope,
};
pub use slack_socket_runtime::{run_socket_mode, run_socket_session, SocketSessionEnd};
