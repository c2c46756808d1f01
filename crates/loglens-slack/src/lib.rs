//! Slack Web API client used by LogLens to announce errors and post threaded
//! analysis replies.

pub mod slack_api_client;

pub use slack_api_client::{SlackApiClient, SlackPostedMessage, DEFAULT_SLACK_API_BASE};
