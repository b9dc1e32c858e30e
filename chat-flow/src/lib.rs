pub mod answers;
pub mod error;
pub mod flow;
pub mod runner;
pub mod session;
pub mod step;
pub mod storage;
pub mod validate;

// Re-export commonly used types
pub use answers::{AnswerField, Answers, InsuranceType, PropertyDetails, VehicleDetails};
pub use error::{FlowError, Result};
pub use flow::{Flow, FlowBuilder, FlowStatus, SubmitOutcome};
pub use runner::{FlowRunner, RunnerResult};
pub use session::{LocationPermission, Session, Speaker, TranscriptEntry};
pub use step::{ChoiceOption, InputKind, Step, StepKind, Transition};
pub use storage::{FileSessionStorage, InMemorySessionStorage, SessionStorage};
pub use validate::{UserResponse, Verdict};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn guided_flow() -> Flow {
        FlowBuilder::new("guided")
            .add_step(
                Step::choice(
                    "welcome",
                    "Qual seguro você procura?",
                    vec![
                        ChoiceOption::new("auto", "Seguro Auto", "auto"),
                        ChoiceOption::new("health", "Plano de Saúde", "health"),
                    ],
                )
                .with_field(AnswerField::InsuranceType)
                .with_next(Transition::to("get_name")),
            )
            .add_step(
                Step::input("get_name", "Qual é o seu nome?", InputKind::Text)
                    .with_field(AnswerField::Name)
                    .with_next(Transition::to("branch")),
            )
            .add_step(
                Step::message("branch", "Certo!").with_next(Transition::ByInsuranceType {
                    auto: "vehicle_make".to_string(),
                    residential: "done".to_string(),
                    otherwise: "done".to_string(),
                }),
            )
            .add_step(
                Step::input("vehicle_make", "Qual a marca do veículo?", InputKind::Text)
                    .with_field(AnswerField::VehicleMake)
                    .with_next(Transition::to("done")),
            )
            .add_step(Step::message("done", "Obrigado!"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn auto_branch_collects_vehicle_details() {
        let flow = Arc::new(guided_flow());
        let storage = Arc::new(InMemorySessionStorage::new());
        let runner = FlowRunner::new(flow, storage);

        let (session, _) = runner.start_session(None).await.unwrap();
        runner
            .submit(&session.id, &UserResponse::Option { id: "auto".into() })
            .await
            .unwrap();
        let result = runner
            .submit(&session.id, &UserResponse::Text { value: "Ana".into() })
            .await
            .unwrap();

        // "branch" is informational and cascades straight into the vehicle
        // question on the auto path.
        assert_eq!(result.outcome.messages, vec!["Certo!", "Qual a marca do veículo?"]);
        assert_eq!(result.outcome.status, FlowStatus::WaitingForInput);

        let result = runner
            .submit(&session.id, &UserResponse::Text { value: "Fiat".into() })
            .await
            .unwrap();
        assert_eq!(result.outcome.status, FlowStatus::Completed);

        let session = runner.get_session(&session.id).await.unwrap();
        assert_eq!(session.answers.vehicle.make.as_deref(), Some("Fiat"));
        assert_eq!(session.current_step_id, "done");
    }

    #[tokio::test]
    async fn health_branch_skips_vehicle_details() {
        let flow = Arc::new(guided_flow());
        let storage = Arc::new(InMemorySessionStorage::new());
        let runner = FlowRunner::new(flow, storage);

        let (session, _) = runner.start_session(None).await.unwrap();
        runner
            .submit(&session.id, &UserResponse::Option { id: "health".into() })
            .await
            .unwrap();
        let result = runner
            .submit(&session.id, &UserResponse::Text { value: "Ana".into() })
            .await
            .unwrap();

        assert_eq!(result.outcome.status, FlowStatus::Completed);
        assert_eq!(result.outcome.messages, vec!["Certo!", "Obrigado!"]);

        let session = runner.get_session(&session.id).await.unwrap();
        assert_eq!(session.current_step_id, "done");
        assert!(session.answers.vehicle.make.is_none());
    }
}
