//! External decision gateway
//!
//! When a conflict cannot be settled automatically the engine suspends on a
//! [`DecisionGateway`] and resumes with its [`ConflictAnswer`]. Where the
//! answer comes from (a terminal prompt, a policy table, a test script) is
//! invisible to the resolution policies.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{Error, Result};

/// A request for an external decision on one update conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRequest {
    /// Record the conflict is about, for display only
    pub record_id: String,
    /// Local record with id, version and tombstone stripped
    pub candidate: Value,
    /// 1 for the first request, incremented on every re-request
    pub attempt: u32,
    /// Why the previous answer was rejected
    pub rejection: Option<String>,
}

/// Answer to a [`ConflictRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAnswer {
    /// Keep the remote copy
    UseServer,
    /// Push the local copy again
    UseClient,
    /// Leave the operation queued for a later cycle
    Skip,
    /// Push a hand-edited record; identity fields are restored by the engine
    Custom(Value),
}

/// Source of conflict decisions.
///
/// Takes `&mut self`: the engine never has more than one request in flight.
#[allow(async_fn_in_trait)]
pub trait DecisionGateway {
    async fn request_decision(&mut self, request: &ConflictRequest) -> Result<ConflictAnswer>;
}

/// Default-policy stub that answers every request the same way
#[derive(Debug, Clone)]
pub struct FixedAnswerGateway {
    answer: ConflictAnswer,
}

impl FixedAnswerGateway {
    pub const fn new(answer: ConflictAnswer) -> Self {
        Self { answer }
    }

    /// Server wins every conflict
    pub const fn server_wins() -> Self {
        Self::new(ConflictAnswer::UseServer)
    }
}

impl DecisionGateway for FixedAnswerGateway {
    async fn request_decision(&mut self, request: &ConflictRequest) -> Result<ConflictAnswer> {
        tracing::debug!(
            "Answering conflict on {} with default {:?}",
            request.record_id,
            self.answer
        );
        Ok(self.answer.clone())
    }
}

#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<ConflictAnswer>,
    requests: Vec<ConflictRequest>,
}

/// Replays a fixed sequence of answers and records every request.
///
/// Clones share the same script, so a test can keep a handle after moving
/// the gateway into an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

impl ScriptedGateway {
    pub fn new(answers: impl IntoIterator<Item = ConflictAnswer>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                answers: answers.into_iter().collect(),
                requests: Vec::new(),
            })),
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<ConflictRequest> {
        self.script
            .lock()
            .map(|script| script.requests.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.script
            .lock()
            .map(|script| script.requests.len())
            .unwrap_or_default()
    }
}

impl DecisionGateway for ScriptedGateway {
    async fn request_decision(&mut self, request: &ConflictRequest) -> Result<ConflictAnswer> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| Error::Gateway("scripted gateway lock poisoned".to_string()))?;
        script.requests.push(request.clone());
        script
            .answers
            .pop_front()
            .ok_or_else(|| Error::Gateway("no scripted answer left".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ConflictRequest {
        ConflictRequest {
            record_id: "A".to_string(),
            candidate: json!({"text": "foo"}),
            attempt: 1,
            rejection: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fixed_gateway_always_returns_its_answer() {
        let mut gateway = FixedAnswerGateway::server_wins();
        for _ in 0..3 {
            let answer = gateway.request_decision(&request()).await.unwrap();
            assert_eq!(answer, ConflictAnswer::UseServer);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scripted_gateway_replays_in_order_and_records_requests() {
        let handle = ScriptedGateway::new([ConflictAnswer::Skip, ConflictAnswer::UseClient]);
        let mut gateway = handle.clone();

        assert_eq!(
            gateway.request_decision(&request()).await.unwrap(),
            ConflictAnswer::Skip
        );
        assert_eq!(
            gateway.request_decision(&request()).await.unwrap(),
            ConflictAnswer::UseClient
        );
        assert!(gateway.request_decision(&request()).await.is_err());

        assert_eq!(handle.call_count(), 3);
        assert_eq!(handle.requests()[0].candidate, json!({"text": "foo"}));
    }
}
