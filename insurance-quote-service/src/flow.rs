//! The guided insurance-quote flow: which products we quote, what we ask for
//! each of them, and in which order. Prompts are user-facing Portuguese; the
//! engine treats them as opaque text.

use chat_flow::{
    AnswerField, ChoiceOption, Flow, FlowBuilder, InputKind, Step, Transition,
};

pub const FLOW_ID: &str = "insurance_quote";

/// Builds the quote flow. Structural defects (dangling transitions, duplicate
/// ids) fail the build, so a broken definition never reaches a conversation.
pub fn build_quote_flow() -> chat_flow::Result<Flow> {
    FlowBuilder::new(FLOW_ID)
        .add_step(
            Step::choice(
                "welcome",
                "Olá! Eu sou a assistente virtual da Segura. Qual seguro você procura hoje?",
                vec![
                    ChoiceOption::new("auto", "Seguro Auto", "auto"),
                    ChoiceOption::new("residential", "Seguro Residencial", "residential"),
                    ChoiceOption::new("health", "Plano de Saúde", "health"),
                    ChoiceOption::new("life", "Seguro de Vida", "life"),
                ],
            )
            .with_field(AnswerField::InsuranceType)
            .with_next(Transition::to("get_name")),
        )
        .add_step(
            Step::input(
                "get_name",
                "Ótimo! Para começar, qual é o seu nome completo?",
                InputKind::Text,
            )
            .with_field(AnswerField::Name)
            .with_next(Transition::to("get_email")),
        )
        .add_step(
            Step::input("get_email", "Qual é o seu melhor e-mail?", InputKind::Email)
                .with_field(AnswerField::Email)
                .with_next(Transition::to("request_location")),
        )
        .add_step(
            Step::location_request(
                "request_location",
                "Para buscar ofertas na sua região, podemos usar a sua localização?",
                vec![
                    ChoiceOption::new("allow", "Permitir localização", "granted"),
                    ChoiceOption::new("deny", "Agora não", "denied").with_next("ask_city"),
                ],
                "allow",
            )
            .with_next(Transition::to("get_phone")),
        )
        .add_step(
            Step::input(
                "ask_city",
                "Sem problemas! Em qual cidade você mora?",
                InputKind::Text,
            )
            .with_field(AnswerField::Location)
            .with_next(Transition::to("get_phone")),
        )
        .add_step(
            Step::input(
                "get_phone",
                "Qual é o seu telefone com DDD?",
                InputKind::Phone,
            )
            .with_field(AnswerField::Phone)
            .with_next(Transition::to("get_national_id")),
        )
        .add_step(
            Step::input(
                "get_national_id",
                "Para consultar as ofertas, preciso do seu CPF.",
                InputKind::NationalId,
            )
            .with_field(AnswerField::NationalId)
            .with_next(Transition::ByInsuranceType {
                auto: "vehicle_make".to_string(),
                residential: "property_kind".to_string(),
                otherwise: "data_consent".to_string(),
            }),
        )
        .add_step(
            Step::input("vehicle_make", "Qual é a marca do seu veículo?", InputKind::Text)
                .with_field(AnswerField::VehicleMake)
                .with_next(Transition::to("vehicle_model")),
        )
        .add_step(
            Step::input("vehicle_model", "E o modelo?", InputKind::Text)
                .with_field(AnswerField::VehicleModel)
                .with_next(Transition::to("vehicle_year")),
        )
        .add_step(
            Step::input("vehicle_year", "Qual é o ano do veículo?", InputKind::Text)
                .with_field(AnswerField::VehicleYear)
                .with_next(Transition::to("data_consent")),
        )
        .add_step(
            Step::choice(
                "property_kind",
                "O imóvel é casa ou apartamento?",
                vec![
                    ChoiceOption::new("house", "Casa", "house"),
                    ChoiceOption::new("apartment", "Apartamento", "apartment"),
                ],
            )
            .with_field(AnswerField::PropertyKind)
            .with_next(Transition::to("property_postal_code")),
        )
        .add_step(
            Step::input(
                "property_postal_code",
                "Qual é o CEP do imóvel?",
                InputKind::Text,
            )
            .with_field(AnswerField::PropertyPostalCode)
            .with_next(Transition::to("data_consent")),
        )
        .add_step(
            Step::consent(
                "data_consent",
                "Para gerar as cotações, preciso do seu consentimento para o tratamento dos dados informados.",
                "Autorizo o tratamento dos meus dados pessoais para fins de cotação de seguros, nos termos da Lei Geral de Proteção de Dados (LGPD).",
            )
            .with_field(AnswerField::DataConsent)
            .with_next(Transition::to("contact_consent")),
        )
        .add_step(
            Step::consent(
                "contact_consent",
                "Podemos entrar em contato por e-mail e telefone sobre as suas ofertas?",
                "Autorizo o contato sobre as cotações solicitadas.",
            )
            .with_field(AnswerField::ContactConsent)
            .with_next(Transition::to("calculating")),
        )
        .add_step(
            Step::loading(
                "calculating",
                "Perfeito! Estou consultando as melhores ofertas para você…",
            )
            .with_next(Transition::to("quote_ready")),
        )
        .add_step(Step::message(
            "quote_ready",
            "Prontinho! Encontrei estas ofertas para você. Quando quiser uma nova cotação, é só recomeçar.",
        ))
        .entry("welcome")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_flow::{FlowStatus, LocationPermission, Session, UserResponse};

    fn started() -> (Flow, Session) {
        let flow = build_quote_flow().unwrap();
        let mut session = Session::new("s1", FLOW_ID, flow.entry_step_id());
        flow.start(&mut session).unwrap();
        (flow, session)
    }

    fn pick(flow: &Flow, session: &mut Session, id: &str) -> FlowStatus {
        flow.submit(session, &UserResponse::Option { id: id.into() })
            .unwrap()
            .status
    }

    fn say(flow: &Flow, session: &mut Session, value: &str) -> FlowStatus {
        flow.submit(session, &UserResponse::Text { value: value.into() })
            .unwrap()
            .status
    }

    fn accept(flow: &Flow, session: &mut Session) -> FlowStatus {
        flow.submit(session, &UserResponse::Consent { accepted: true })
            .unwrap()
            .status
    }

    #[test]
    fn flow_definition_is_structurally_complete() {
        // build() runs the full static enumeration of transition targets.
        let flow = build_quote_flow().unwrap();
        assert_eq!(flow.entry_step_id(), "welcome");
        assert!(flow.verify().is_ok());
    }

    #[test]
    fn health_quote_walkthrough_up_to_location() {
        let (flow, mut session) = started();

        assert_eq!(pick(&flow, &mut session, "health"), FlowStatus::WaitingForInput);
        assert_eq!(session.current_step_id, "get_name");

        assert_eq!(say(&flow, &mut session, "Ana Silva"), FlowStatus::WaitingForInput);
        assert_eq!(session.current_step_id, "get_email");

        let outcome = flow
            .submit(
                &mut session,
                &UserResponse::Text { value: "not-an-email".into() },
            )
            .unwrap();
        assert_eq!(
            outcome.status,
            FlowStatus::Rejected("Por favor, digite um e-mail válido".to_string())
        );
        assert_eq!(session.current_step_id, "get_email");

        assert_eq!(
            say(&flow, &mut session, "ana@example.com"),
            FlowStatus::WaitingForInput
        );
        assert_eq!(session.current_step_id, "request_location");
        assert_eq!(session.answers.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn auto_quote_runs_through_vehicle_questions_to_completion() {
        let (flow, mut session) = started();

        pick(&flow, &mut session, "auto");
        say(&flow, &mut session, "Ana Silva");
        say(&flow, &mut session, "ana@example.com");
        pick(&flow, &mut session, "allow");
        assert_eq!(session.location_permission, LocationPermission::Granted);
        assert_eq!(session.current_step_id, "get_phone");

        say(&flow, &mut session, "(11) 98765-4321");
        say(&flow, &mut session, "529.982.247-25");
        assert_eq!(session.current_step_id, "vehicle_make");

        say(&flow, &mut session, "Fiat");
        say(&flow, &mut session, "Argo");
        say(&flow, &mut session, "2021");
        assert_eq!(session.current_step_id, "data_consent");

        accept(&flow, &mut session);
        assert_eq!(session.current_step_id, "contact_consent");
        let status = accept(&flow, &mut session);
        assert_eq!(status, FlowStatus::Loading);
        assert_eq!(session.current_step_id, "calculating");
        assert!(session.loading);

        let outcome = flow.complete_loading(&mut session).unwrap();
        assert_eq!(outcome.status, FlowStatus::Completed);
        assert_eq!(session.current_step_id, "quote_ready");
        assert!(session.answers.data_consent && session.answers.contact_consent);
        assert_eq!(session.answers.vehicle.year.as_deref(), Some("2021"));
    }

    #[test]
    fn residential_branch_asks_about_the_property() {
        let (flow, mut session) = started();

        pick(&flow, &mut session, "residential");
        say(&flow, &mut session, "Rui Costa");
        say(&flow, &mut session, "rui@example.com");
        // Declining location routes through the city question.
        pick(&flow, &mut session, "deny");
        assert_eq!(session.location_permission, LocationPermission::Denied);
        assert_eq!(session.current_step_id, "ask_city");

        say(&flow, &mut session, "Curitiba");
        assert_eq!(session.answers.location.as_deref(), Some("Curitiba"));

        say(&flow, &mut session, "4133334444");
        say(&flow, &mut session, "52998224725");
        assert_eq!(session.current_step_id, "property_kind");

        pick(&flow, &mut session, "apartment");
        assert_eq!(session.current_step_id, "property_postal_code");
        say(&flow, &mut session, "80010-000");
        assert_eq!(session.current_step_id, "data_consent");
        assert_eq!(session.answers.property.kind.as_deref(), Some("apartment"));
    }

    #[test]
    fn declining_consent_blocks_progress() {
        let (flow, mut session) = started();

        pick(&flow, &mut session, "life");
        say(&flow, &mut session, "Ana Silva");
        say(&flow, &mut session, "ana@example.com");
        pick(&flow, &mut session, "allow");
        say(&flow, &mut session, "11987654321");
        say(&flow, &mut session, "52998224725");
        // Life has no product-specific questions; straight to consent.
        assert_eq!(session.current_step_id, "data_consent");

        let outcome = flow
            .submit(&mut session, &UserResponse::Consent { accepted: false })
            .unwrap();
        assert!(matches!(outcome.status, FlowStatus::Rejected(_)));
        assert_eq!(session.current_step_id, "data_consent");
        assert!(!session.answers.data_consent);
    }
}
