//! Response validation. Pure: a verdict is computed from the step and the raw
//! response alone, and nothing is mutated. Rejections carry the exact message
//! shown to the user, who simply retries the same step.

use serde::{Deserialize, Serialize};

use crate::step::{InputKind, Step, StepKind};

/// Raw user response as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserResponse {
    /// Selected option id of a choice or location-request step.
    Option { id: String },
    /// Freeform text input.
    Text { value: String },
    /// Explicit consent decision.
    Consent { accepted: bool },
    /// Acknowledgement of an informational step.
    Acknowledge,
}

/// Outcome of validating a raw response against a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(String),
}

pub const MSG_INVALID_SELECTION: &str =
    "Seleção inválida. Escolha uma das opções disponíveis";
pub const MSG_INVALID_TEXT: &str = "Por favor, digite uma resposta válida";
pub const MSG_INVALID_EMAIL: &str = "Por favor, digite um e-mail válido";
pub const MSG_INVALID_PHONE: &str = "Por favor, digite um telefone válido com DDD";
pub const MSG_INVALID_NATIONAL_ID: &str =
    "CPF inválido. Verifique os dígitos e tente novamente";
pub const MSG_CONSENT_REQUIRED: &str = "É preciso aceitar para continuar";

/// Decides accept/reject for a raw response against a step, before any
/// transition is attempted.
pub fn validate_response(step: &Step, response: &UserResponse) -> Verdict {
    match &step.kind {
        // Informational steps auto-accept whatever they are handed.
        StepKind::Message | StepKind::Loading => Verdict::Accepted,
        StepKind::Choice { options } | StepKind::LocationRequest { options, .. } => {
            match response {
                UserResponse::Option { id } if options.iter().any(|o| o.id == *id) => {
                    Verdict::Accepted
                }
                _ => Verdict::Rejected(MSG_INVALID_SELECTION.to_string()),
            }
        }
        StepKind::Input { input } => match response {
            UserResponse::Text { value } => validate_input(*input, value),
            _ => Verdict::Rejected(MSG_INVALID_TEXT.to_string()),
        },
        StepKind::Consent { .. } => match response {
            UserResponse::Consent { accepted: true } => Verdict::Accepted,
            _ => Verdict::Rejected(MSG_CONSENT_REQUIRED.to_string()),
        },
    }
}

/// Dispatches a freeform value to the validator selected by the step's input
/// kind.
pub fn validate_input(kind: InputKind, raw: &str) -> Verdict {
    match kind {
        InputKind::Text => validate_text(raw),
        InputKind::Email => validate_email(raw),
        InputKind::NationalId => validate_national_id(raw),
        InputKind::Phone => validate_phone(raw),
    }
}

fn validate_text(raw: &str) -> Verdict {
    if raw.trim().chars().count() >= 2 {
        Verdict::Accepted
    } else {
        Verdict::Rejected(MSG_INVALID_TEXT.to_string())
    }
}

fn validate_email(raw: &str) -> Verdict {
    let value = raw.trim();
    let well_formed = !value.contains(char::is_whitespace)
        && value.matches('@').count() == 1
        && value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
    if well_formed {
        Verdict::Accepted
    } else {
        Verdict::Rejected(MSG_INVALID_EMAIL.to_string())
    }
}

/// Brazilian phone number: 10 digits (landline) or 11 (mobile), DDD included.
/// Punctuation and spacing are ignored.
fn validate_phone(raw: &str) -> Verdict {
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    if digits == 10 || digits == 11 {
        Verdict::Accepted
    } else {
        Verdict::Rejected(MSG_INVALID_PHONE.to_string())
    }
}

/// CPF check-digit validation: 11 digits, not all identical, and two weighted
/// checksums over the first 9 and 10 digits respectively.
fn validate_national_id(raw: &str) -> Verdict {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || digits.iter().all(|&d| d == digits[0]) {
        return Verdict::Rejected(MSG_INVALID_NATIONAL_ID.to_string());
    }
    let first = cpf_check_digit(&digits[..9], 10);
    let second = cpf_check_digit(&digits[..10], 11);
    if first == digits[9] && second == digits[10] {
        Verdict::Accepted
    } else {
        Verdict::Rejected(MSG_INVALID_NATIONAL_ID.to_string())
    }
}

/// Weighted sum with weights `start_weight..=2`; remainders 0 and 1 map to a
/// zero check digit, everything else to `11 - remainder`.
fn cpf_check_digit(digits: &[u32], start_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip((2..=start_weight).rev())
        .map(|(d, w)| d * w)
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}
