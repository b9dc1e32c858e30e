use serde::{Deserialize, Serialize};

use crate::answers::AnswerField;

/// One selectable option of a choice-style step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    /// Label shown to the user and echoed into the transcript on selection.
    pub label: String,
    /// Value merged into the answers under the step's field.
    pub value: String,
    /// Overrides the step-level transition when this option is picked.
    pub next: Option<String>,
}

impl ChoiceOption {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: value.into(),
            next: None,
        }
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }
}

/// Which validator applies to a freeform input step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Email,
    NationalId,
    Phone,
}

/// Step payload, one variant per prompt kind.
///
/// Fields only exist on the variants that use them, so a step's shape is
/// discriminated at compile time instead of by optional-field presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Informational text; auto-advances, no answer required.
    Message,
    /// Pick exactly one of the listed options.
    Choice { options: Vec<ChoiceOption> },
    /// Freeform input routed through the named validator.
    Input { input: InputKind },
    /// Explicit affirmative consent over a disclosure text. A non-affirmative
    /// response is rejected; there is no decline path in the graph.
    Consent { disclosure: String },
    /// Like `Choice`, and additionally records the session's location
    /// permission: picking `granting_option` grants it, any other denies.
    LocationRequest {
        options: Vec<ChoiceOption>,
        granting_option: String,
    },
    /// Externally-timed pause; the caller signals completion.
    Loading,
}

/// How a step decides where the flow goes next.
///
/// A closed set of named strategies keeps the graph data-driven and
/// serializable; nothing in the flow definition executes code. Per-option
/// `next` overrides on choice-style steps take precedence over these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Transition {
    /// Unconditional edge to a fixed step id.
    To { step: String },
    /// Branch on the insurance type collected earlier in the flow.
    ByInsuranceType {
        auto: String,
        residential: String,
        otherwise: String,
    },
}

impl Transition {
    pub fn to(step: impl Into<String>) -> Self {
        Self::To { step: step.into() }
    }
}

/// One node of the flow graph: a prompt plus its input contract, the answer
/// slot it fills, and its transition rule. `next: None` marks a terminal step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub prompt: String,
    pub kind: StepKind,
    pub field: Option<AnswerField>,
    pub next: Option<Transition>,
}

impl Step {
    pub fn message(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(id, prompt, StepKind::Message)
    }

    pub fn choice(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Self {
        Self::new(id, prompt, StepKind::Choice { options })
    }

    pub fn input(id: impl Into<String>, prompt: impl Into<String>, input: InputKind) -> Self {
        Self::new(id, prompt, StepKind::Input { input })
    }

    pub fn consent(
        id: impl Into<String>,
        prompt: impl Into<String>,
        disclosure: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            prompt,
            StepKind::Consent {
                disclosure: disclosure.into(),
            },
        )
    }

    pub fn location_request(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<ChoiceOption>,
        granting_option: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            prompt,
            StepKind::LocationRequest {
                options,
                granting_option: granting_option.into(),
            },
        )
    }

    pub fn loading(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(id, prompt, StepKind::Loading)
    }

    fn new(id: impl Into<String>, prompt: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            kind,
            field: None,
            next: None,
        }
    }

    pub fn with_field(mut self, field: AnswerField) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_next(mut self, next: Transition) -> Self {
        self.next = Some(next);
        self
    }

    /// Whether this step must produce an answer before the flow advances.
    /// Informational and loading steps never do.
    pub fn requires_response(&self) -> bool {
        !matches!(self.kind, StepKind::Message | StepKind::Loading)
    }

    /// The selectable options of choice-style steps.
    pub fn options(&self) -> Option<&[ChoiceOption]> {
        match &self.kind {
            StepKind::Choice { options } | StepKind::LocationRequest { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }
}
