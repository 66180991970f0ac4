//! Subscription management for WebSocket clients.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Available subscription topics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTopic {
    /// Challenge lifecycle events.
    Challenge,
    /// Settlement events.
    Settlement,
}

impl fmt::Display for SubscriptionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionTopic::Challenge => write!(f, "challenge"),
            SubscriptionTopic::Settlement => write!(f, "settlement"),
        }
    }
}

/// Optional filter for subscriptions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    /// Only receive events for these challenge ids.
    pub challenges: Option<Vec<String>>,
}

/// A message from the client.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        topic: SubscriptionTopic,
        #[serde(default)]
        filter: Option<SubscriptionFilter>,
    },
    Unsubscribe {
        topic: SubscriptionTopic,
    },
    Ping,
}

/// A message to the client.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack {
        action: String,
        topic: SubscriptionTopic,
    },
    Error {
        message: String,
    },
    Pong,
}

/// An event envelope sent to subscribed clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub topic: String,
    pub challenge_id: String,
    pub data: serde_json::Value,
    pub timestamp: u64,
}

/// Tracks a single client's active subscriptions and their filters.
#[derive(Default)]
pub struct ClientSubscriptions {
    topics: HashMap<SubscriptionTopic, Option<SubscriptionFilter>>,
}

impl ClientSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: SubscriptionTopic, filter: Option<SubscriptionFilter>) {
        self.topics.insert(topic, filter);
    }

    /// Returns whether the client was subscribed.
    pub fn unsubscribe(&mut self, topic: &SubscriptionTopic) -> bool {
        self.topics.remove(topic).is_some()
    }

    /// Whether an event passes the client's filter for the topic.
    pub fn matches_filter(&self, topic: &SubscriptionTopic, event: &SubscriptionEvent) -> bool {
        match self.topics.get(topic) {
            Some(Some(filter)) => match &filter.challenges {
                Some(ids) => ids.iter().any(|id| id == &event.challenge_id),
                None => true,
            },
            Some(None) => true,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> SubscriptionEvent {
        SubscriptionEvent {
            topic: "challenge".to_string(),
            challenge_id: id.to_string(),
            data: serde_json::json!({}),
            timestamp: 0,
        }
    }

    #[test]
    fn unfiltered_subscription_matches_everything() {
        let mut subs = ClientSubscriptions::new();
        subs.subscribe(SubscriptionTopic::Challenge, None);
        assert!(subs.matches_filter(&SubscriptionTopic::Challenge, &event("c1")));
        assert!(!subs.matches_filter(&SubscriptionTopic::Settlement, &event("c1")));
    }

    #[test]
    fn challenge_filter_restricts_delivery() {
        let mut subs = ClientSubscriptions::new();
        subs.subscribe(
            SubscriptionTopic::Challenge,
            Some(SubscriptionFilter {
                challenges: Some(vec!["c1".to_string()]),
            }),
        );
        assert!(subs.matches_filter(&SubscriptionTopic::Challenge, &event("c1")));
        assert!(!subs.matches_filter(&SubscriptionTopic::Challenge, &event("c2")));
    }

    #[test]
    fn client_messages_parse() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"action":"subscribe","topic":"challenge","filter":{"challenges":["c1"]}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Subscribe {
                topic: SubscriptionTopic::Challenge,
                ..
            }
        ));

        let msg: ClientMessage = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }
}
