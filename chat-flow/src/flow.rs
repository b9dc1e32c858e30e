use std::collections::HashMap;

use crate::{
    answers::{Answers, InsuranceType},
    error::{FlowError, Result},
    session::{LocationPermission, Session},
    step::{ChoiceOption, Step, StepKind, Transition},
    validate::{self, UserResponse, Verdict},
};

/// A named, immutable graph of steps. Built once at process start via
/// [`FlowBuilder`]; lookups are pure and side-effect free.
pub struct Flow {
    pub id: String,
    steps: HashMap<String, Step>,
    entry_step_id: String,
}

/// What one engine call produced.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// Bot prompts appended to the transcript by this call, in order.
    pub messages: Vec<String>,
    pub status: FlowStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    /// Validation rejected the response; session state is unchanged. The
    /// message is for user display, verbatim from the validator.
    Rejected(String),
    /// Waiting for the user's answer to the current step.
    WaitingForInput,
    /// A loading step was entered; the caller owns the wait and signals
    /// completion via [`Flow::complete_loading`].
    Loading,
    /// The terminal step was reached.
    Completed,
}

impl SubmitOutcome {
    fn rejected(message: String) -> Self {
        Self {
            messages: Vec::new(),
            status: FlowStatus::Rejected(message),
        }
    }
}

impl Flow {
    /// Looks up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    pub fn entry_step_id(&self) -> &str {
        &self.entry_step_id
    }

    pub fn entry_step(&self) -> &Step {
        // The builder refuses to construct a flow whose entry id is absent.
        &self.steps[&self.entry_step_id]
    }

    /// The step the session currently points at.
    pub fn current_step<'a>(&'a self, session: &Session) -> Result<&'a Step> {
        self.step_or_err(&session.current_step_id)
    }

    /// Statically enumerates every transition target (step-level, branch
    /// arms, per-option overrides) and fails on the first one that does not
    /// name an existing step. Run this from tests and at service startup so
    /// a defective flow definition never surfaces mid-conversation.
    pub fn verify(&self) -> Result<()> {
        for step in self.steps.values() {
            if let Some(options) = step.options() {
                if options.is_empty() {
                    return Err(FlowError::InvalidTransition {
                        from: step.id.clone(),
                        to: "<no options>".to_string(),
                    });
                }
                for option in options {
                    if let Some(next) = &option.next {
                        self.step_checked(&step.id, next)?;
                    }
                }
            }
            if let StepKind::LocationRequest {
                options,
                granting_option,
            } = &step.kind
            {
                if !options.iter().any(|o| &o.id == granting_option) {
                    return Err(FlowError::UnknownStep(format!(
                        "{}: granting option '{}' is not an option",
                        step.id, granting_option
                    )));
                }
            }
            match &step.next {
                None => {}
                Some(Transition::To { step: target }) => {
                    self.step_checked(&step.id, target)?;
                }
                Some(Transition::ByInsuranceType {
                    auto,
                    residential,
                    otherwise,
                }) => {
                    for target in [auto, residential, otherwise] {
                        self.step_checked(&step.id, target)?;
                    }
                }
            }
        }
        self.step_or_err(&self.entry_step_id)?;
        Ok(())
    }

    /// Transition resolver: computes the next step id from the current step
    /// id and the accumulated answers. `Ok(None)` is the terminal sentinel.
    ///
    /// Fails with [`FlowError::UnknownStep`] when `current_step_id` is not in
    /// the graph and with [`FlowError::InvalidTransition`] when the computed
    /// id is not; the latter is a flow definition defect and must never be
    /// swallowed into silently staying put.
    pub fn next_step_id(&self, current_step_id: &str, answers: &Answers) -> Result<Option<String>> {
        let step = self.step_or_err(current_step_id)?;
        let next = self.resolve_transition(step, answers);
        if let Some(id) = &next {
            self.step_checked(&step.id, id)?;
        }
        Ok(next)
    }

    /// Applies the step's transition strategy over the answers. Existence of
    /// the produced id is checked by the callers that follow it.
    fn resolve_transition(&self, step: &Step, answers: &Answers) -> Option<String> {
        match step.next.as_ref()? {
            Transition::To { step } => Some(step.clone()),
            Transition::ByInsuranceType {
                auto,
                residential,
                otherwise,
            } => {
                let target = match answers.insurance_type {
                    Some(InsuranceType::Auto) => auto,
                    Some(InsuranceType::Residential) => residential,
                    _ => otherwise,
                };
                Some(target.clone())
            }
        }
    }

    /// Positions a session at the entry step and greets. Used for fresh
    /// sessions and by [`Flow::reset`].
    pub fn start(&self, session: &mut Session) -> Result<SubmitOutcome> {
        let entry = self.entry_step();
        session.current_step_id = entry.id.clone();
        session.push_bot(entry.prompt.clone());
        let mut messages = vec![entry.prompt.clone()];
        let status = match entry.kind {
            StepKind::Loading => {
                session.loading = true;
                FlowStatus::Loading
            }
            StepKind::Message => self.advance(session, entry, None, &mut messages)?,
            _ => FlowStatus::WaitingForInput,
        };
        Ok(SubmitOutcome { messages, status })
    }

    /// The atomic unit of progress: validate, merge the answer, append the
    /// user entry, resolve the transition, append the next prompt, advance
    /// the pointer. On rejection nothing is mutated and the message is
    /// returned as a value. Persistence is the runner's post-mutation hook,
    /// so a partially applied sequence is never observable in storage.
    pub fn submit(&self, session: &mut Session, response: &UserResponse) -> Result<SubmitOutcome> {
        let step = self.current_step(session)?;
        if matches!(step.kind, StepKind::Loading) {
            // Only the external completion signal moves past a loading step.
            return Ok(SubmitOutcome {
                messages: Vec::new(),
                status: FlowStatus::Loading,
            });
        }
        if let Verdict::Rejected(message) = validate::validate_response(step, response) {
            return Ok(SubmitOutcome::rejected(message));
        }

        let chosen = chosen_option(step, response);
        let option_next = chosen.and_then(|o| o.next.clone());

        if let StepKind::LocationRequest {
            granting_option, ..
        } = &step.kind
        {
            session.location_permission = match chosen {
                Some(option) if &option.id == granting_option => LocationPermission::Granted,
                _ => LocationPermission::Denied,
            };
        }

        if let Some(field) = step.field {
            let value = match (chosen, response) {
                (Some(option), _) => option.value.as_str(),
                (None, UserResponse::Text { value }) => value.as_str(),
                (None, UserResponse::Consent { .. }) => "true",
                (None, _) => "",
            };
            session.answers.apply(field, value);
        }

        if step.requires_response() {
            session.push_user(display_text(response, chosen));
        }

        let mut messages = Vec::new();
        let status = self.advance(session, step, option_next, &mut messages)?;
        Ok(SubmitOutcome { messages, status })
    }

    /// Clears the loading flag and advances through the loading step's
    /// normal transition path. The engine never advances past a loading step
    /// without this external signal; calling it anywhere else is a no-op.
    pub fn complete_loading(&self, session: &mut Session) -> Result<SubmitOutcome> {
        let step = self.current_step(session)?;
        if !matches!(step.kind, StepKind::Loading) {
            return Ok(SubmitOutcome {
                messages: Vec::new(),
                status: FlowStatus::WaitingForInput,
            });
        }
        session.loading = false;
        let mut messages = Vec::new();
        let status = self.advance(session, step, None, &mut messages)?;
        Ok(SubmitOutcome { messages, status })
    }

    /// Pointer rollback to the most recently visited step. Transcript and
    /// answers stay as they are; a later resubmission overwrites the same
    /// answer slot. Returns false when there is nowhere to go back to.
    pub fn go_to_previous(&self, session: &mut Session) -> bool {
        match session.history.pop() {
            Some(previous) => {
                session.current_step_id = previous;
                session.loading = false;
                true
            }
            None => false,
        }
    }

    /// Clears answers, transcript, history, and the transient flags, and
    /// re-enters the flow at the entry step.
    pub fn reset(&self, session: &mut Session) -> Result<SubmitOutcome> {
        session.answers = Answers::default();
        session.transcript.clear();
        session.history.clear();
        session.loading = false;
        session.location_permission = LocationPermission::NotAsked;
        self.start(session)
    }

    /// Walks forward from `from`: follows the resolved transition, appends
    /// each entered step's prompt as a bot entry, and keeps walking through
    /// informational steps until the flow needs input, pauses, or ends.
    /// `Ok(None)` from the resolver means `from` is terminal: the pointer
    /// stays and no bot entry is appended.
    fn advance(
        &self,
        session: &mut Session,
        from: &Step,
        option_next: Option<String>,
        messages: &mut Vec<String>,
    ) -> Result<FlowStatus> {
        let mut current = from;
        let mut option_next = option_next;
        loop {
            let next_id = match option_next.take() {
                Some(id) => id,
                None => match self.resolve_transition(current, &session.answers) {
                    Some(id) => id,
                    None => return Ok(FlowStatus::Completed),
                },
            };
            let next = self.step_checked(&current.id, &next_id)?;
            session.history.push(session.current_step_id.clone());
            session.current_step_id = next.id.clone();
            session.push_bot(next.prompt.clone());
            messages.push(next.prompt.clone());
            match next.kind {
                StepKind::Loading => {
                    session.loading = true;
                    return Ok(FlowStatus::Loading);
                }
                StepKind::Message => current = next,
                _ => return Ok(FlowStatus::WaitingForInput),
            }
        }
    }

    fn step_or_err(&self, id: &str) -> Result<&Step> {
        self.steps
            .get(id)
            .ok_or_else(|| FlowError::UnknownStep(id.to_string()))
    }

    fn step_checked(&self, from: &str, to: &str) -> Result<&Step> {
        self.steps.get(to).ok_or_else(|| FlowError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// The option the response selected, when the step has options.
fn chosen_option<'a>(step: &'a Step, response: &UserResponse) -> Option<&'a ChoiceOption> {
    match response {
        UserResponse::Option { id } => step.options()?.iter().find(|o| &o.id == id),
        _ => None,
    }
}

/// Human-readable form of an accepted response for the transcript.
fn display_text(response: &UserResponse, chosen: Option<&ChoiceOption>) -> String {
    if let Some(option) = chosen {
        return option.label.clone();
    }
    match response {
        UserResponse::Text { value } => value.trim().to_string(),
        UserResponse::Consent { .. } => "Aceito".to_string(),
        UserResponse::Option { id } => id.clone(),
        UserResponse::Acknowledge => String::new(),
    }
}

/// Builder for flows, in dependency order: steps first, then the entry id,
/// then [`FlowBuilder::build`] which refuses structurally broken graphs.
pub struct FlowBuilder {
    id: String,
    steps: Vec<Step>,
    entry_step_id: Option<String>,
}

impl FlowBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            entry_step_id: None,
        }
    }

    pub fn add_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets the entry step. Defaults to the first added step.
    pub fn entry(mut self, step_id: impl Into<String>) -> Self {
        self.entry_step_id = Some(step_id.into());
        self
    }

    /// Builds and verifies the flow. Graph defects (duplicate ids, dangling
    /// transition targets, missing entry) fail here, never at runtime.
    pub fn build(self) -> Result<Flow> {
        let entry_step_id = self
            .entry_step_id
            .or_else(|| self.steps.first().map(|s| s.id.clone()))
            .ok_or_else(|| FlowError::UnknownStep("<empty flow>".to_string()))?;
        let mut steps = HashMap::with_capacity(self.steps.len());
        for step in self.steps {
            let id = step.id.clone();
            if steps.insert(id.clone(), step).is_some() {
                return Err(FlowError::InvalidTransition {
                    from: id.clone(),
                    to: format!("duplicate step id '{id}'"),
                });
            }
        }
        let flow = Flow {
            id: self.id,
            steps,
            entry_step_id,
        };
        flow.verify()?;
        Ok(flow)
    }
}
