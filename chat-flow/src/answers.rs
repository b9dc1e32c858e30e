use serde::{Deserialize, Serialize};

/// Insurance product the user is shopping for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceType {
    Auto,
    Residential,
    Health,
    Life,
}

impl InsuranceType {
    /// Parses an option value ("auto", "residential", ...) as produced by the
    /// flow definition's choice options.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "residential" => Some(Self::Residential),
            "health" => Some(Self::Health),
            "life" => Some(Self::Life),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub kind: Option<String>,
    pub postal_code: Option<String>,
}

/// Structured data accumulated while the user walks through a flow.
///
/// Field names are part of the persisted contract: downstream consumers read
/// `answers.insurance_type` etc. straight from the stored session blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answers {
    pub insurance_type: Option<InsuranceType>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    #[serde(default)]
    pub vehicle: VehicleDetails,
    #[serde(default)]
    pub property: PropertyDetails,
    pub location: Option<String>,
    #[serde(default)]
    pub data_consent: bool,
    #[serde(default)]
    pub contact_consent: bool,
}

/// Answer slot a step writes into when its response is accepted.
///
/// A closed set keeps the flow definition data-driven: a step names its slot
/// instead of carrying a merge closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerField {
    InsuranceType,
    Name,
    Email,
    Phone,
    NationalId,
    VehicleMake,
    VehicleModel,
    VehicleYear,
    PropertyKind,
    PropertyPostalCode,
    Location,
    DataConsent,
    ContactConsent,
}

impl Answers {
    /// Merges an accepted value into the named slot. Answers are additive: a
    /// later submission for the same slot simply overwrites the earlier one.
    ///
    /// Consent slots only ever receive affirmative values since validation
    /// rejects everything else.
    pub fn apply(&mut self, field: AnswerField, value: &str) {
        match field {
            AnswerField::InsuranceType => self.insurance_type = InsuranceType::parse(value),
            AnswerField::Name => self.name = Some(value.to_string()),
            AnswerField::Email => self.email = Some(value.trim().to_string()),
            AnswerField::Phone => self.phone = Some(value.to_string()),
            AnswerField::NationalId => self.national_id = Some(value.to_string()),
            AnswerField::VehicleMake => self.vehicle.make = Some(value.to_string()),
            AnswerField::VehicleModel => self.vehicle.model = Some(value.to_string()),
            AnswerField::VehicleYear => self.vehicle.year = Some(value.to_string()),
            AnswerField::PropertyKind => self.property.kind = Some(value.to_string()),
            AnswerField::PropertyPostalCode => {
                self.property.postal_code = Some(value.to_string())
            }
            AnswerField::Location => self.location = Some(value.to_string()),
            AnswerField::DataConsent => self.data_consent = true,
            AnswerField::ContactConsent => self.contact_consent = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overwrites_previous_value() {
        let mut answers = Answers::default();
        answers.apply(AnswerField::Email, "first@example.com");
        answers.apply(AnswerField::Email, "second@example.com");
        assert_eq!(answers.email.as_deref(), Some("second@example.com"));
    }

    #[test]
    fn insurance_type_parses_known_values_only() {
        assert_eq!(InsuranceType::parse("auto"), Some(InsuranceType::Auto));
        assert_eq!(InsuranceType::parse("health"), Some(InsuranceType::Health));
        assert_eq!(InsuranceType::parse("boat"), None);
    }
}
