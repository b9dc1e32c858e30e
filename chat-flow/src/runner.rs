//! FlowRunner – convenience wrapper that loads a session, applies exactly one
//! engine mutation, and persists the updated session back to storage.
//!
//! Interactive services want to run one step per request, return the bot's
//! reply, and have the session saved for the next roundtrip; the runner makes
//! that a one-liner. Use the [`Flow`] methods directly when batching many
//! steps in memory and saving once at the end.
//!
//! Persistence is deliberately fire-and-forget from the engine's point of
//! view: a failed write never blocks or rolls back the in-memory mutation.
//! The runner logs the failure and surfaces it as a warning on the result, so
//! the caller can tell the session is running unpersisted until a later write
//! succeeds. A failed *load* is fatal, since there is nothing to mutate.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{FlowError, Result},
    flow::{Flow, FlowStatus, SubmitOutcome},
    session::Session,
    storage::SessionStorage,
    validate::UserResponse,
};

/// Outcome of a runner call: the engine outcome plus persistence status.
#[derive(Debug, Clone)]
pub struct RunnerResult {
    pub outcome: SubmitOutcome,
    /// Set when the post-mutation write failed. The in-memory mutation
    /// stands; the session continues volatile until a future write succeeds.
    pub persist_warning: Option<String>,
}

/// Orchestrates the common load → mutate → save pattern over one flow.
#[derive(Clone)]
pub struct FlowRunner {
    flow: Arc<Flow>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(flow: Arc<Flow>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { flow, storage }
    }

    pub fn flow(&self) -> &Arc<Flow> {
        &self.flow
    }

    /// Creates a session at the flow's entry step (generating an id when the
    /// caller does not supply one), greets, and persists it.
    pub async fn start_session(&self, session_id: Option<String>) -> Result<(Session, RunnerResult)> {
        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut session = Session::new(id, self.flow.id.clone(), self.flow.entry_step_id());
        let outcome = self.flow.start(&mut session)?;
        let persist_warning = self.persist(&session).await;
        Ok((
            session,
            RunnerResult {
                outcome,
                persist_warning,
            },
        ))
    }

    /// Validates and applies one user response to the session's current step.
    /// Rejections perform no mutation, so nothing is written for them.
    pub async fn submit(&self, session_id: &str, response: &UserResponse) -> Result<RunnerResult> {
        let mut session = self.load(session_id).await?;
        let outcome = self.flow.submit(&mut session, response)?;
        let persist_warning = match outcome.status {
            FlowStatus::Rejected(_) => None,
            _ => self.persist(&session).await,
        };
        Ok(RunnerResult {
            outcome,
            persist_warning,
        })
    }

    /// External completion signal for a loading step.
    pub async fn complete_loading(&self, session_id: &str) -> Result<RunnerResult> {
        let mut session = self.load(session_id).await?;
        let outcome = self.flow.complete_loading(&mut session)?;
        let persist_warning = self.persist(&session).await;
        Ok(RunnerResult {
            outcome,
            persist_warning,
        })
    }

    /// Pointer rollback to the previously visited step.
    pub async fn previous(&self, session_id: &str) -> Result<RunnerResult> {
        let mut session = self.load(session_id).await?;
        self.flow.go_to_previous(&mut session);
        let prompt = self.flow.current_step(&session)?.prompt.clone();
        let persist_warning = self.persist(&session).await;
        Ok(RunnerResult {
            outcome: SubmitOutcome {
                messages: vec![prompt],
                status: FlowStatus::WaitingForInput,
            },
            persist_warning,
        })
    }

    /// Clears the session back to the entry step.
    pub async fn reset(&self, session_id: &str) -> Result<RunnerResult> {
        let mut session = self.load(session_id).await?;
        let outcome = self.flow.reset(&mut session)?;
        let persist_warning = self.persist(&session).await;
        Ok(RunnerResult {
            outcome,
            persist_warning,
        })
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.load(session_id).await
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }

    async fn persist(&self, session: &Session) -> Option<String> {
        match self.storage.save(session.clone()).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %e,
                    "failed to persist session; continuing in memory"
                );
                Some(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        answers::AnswerField,
        flow::FlowBuilder,
        step::{ChoiceOption, InputKind, Step, Transition},
        storage::InMemorySessionStorage,
    };

    fn runner() -> FlowRunner {
        let flow = FlowBuilder::new("quote")
            .add_step(
                Step::choice(
                    "welcome",
                    "Qual seguro?",
                    vec![ChoiceOption::new("health", "Saúde", "health")],
                )
                .with_field(AnswerField::InsuranceType)
                .with_next(Transition::to("get_name")),
            )
            .add_step(
                Step::input("get_name", "Seu nome?", InputKind::Text)
                    .with_field(AnswerField::Name),
            )
            .build()
            .unwrap();
        FlowRunner::new(Arc::new(flow), Arc::new(InMemorySessionStorage::new()))
    }

    #[tokio::test]
    async fn session_state_survives_the_storage_roundtrip() {
        let runner = runner();
        let (session, started) = runner.start_session(None).await.unwrap();
        assert!(started.persist_warning.is_none());
        assert_eq!(started.outcome.messages, vec!["Qual seguro?"]);

        runner
            .submit(&session.id, &UserResponse::Option { id: "health".into() })
            .await
            .unwrap();

        let restored = runner.get_session(&session.id).await.unwrap();
        assert_eq!(restored.current_step_id, "get_name");
        assert_eq!(restored.transcript.len(), 3);
        assert!(restored.answers.insurance_type.is_some());
    }

    #[tokio::test]
    async fn unknown_session_is_a_distinct_error() {
        let runner = runner();
        let err = runner
            .submit("missing", &UserResponse::Acknowledge)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn rejection_does_not_persist_anything() {
        let runner = runner();
        let (session, _) = runner.start_session(None).await.unwrap();
        let before = runner.get_session(&session.id).await.unwrap();

        let result = runner
            .submit(&session.id, &UserResponse::Option { id: "nope".into() })
            .await
            .unwrap();

        assert!(matches!(result.outcome.status, FlowStatus::Rejected(_)));
        let after = runner.get_session(&session.id).await.unwrap();
        assert_eq!(after.transcript, before.transcript);
        assert_eq!(after.current_step_id, before.current_step_id);
    }

    #[tokio::test]
    async fn reset_restores_the_entry_step() {
        let runner = runner();
        let (session, _) = runner.start_session(None).await.unwrap();
        runner
            .submit(&session.id, &UserResponse::Option { id: "health".into() })
            .await
            .unwrap();

        let result = runner.reset(&session.id).await.unwrap();
        assert_eq!(result.outcome.messages, vec!["Qual seguro?"]);

        let restored = runner.get_session(&session.id).await.unwrap();
        assert_eq!(restored.current_step_id, "welcome");
        assert_eq!(restored.transcript.len(), 1);
    }
}
