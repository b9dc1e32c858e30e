//! Mocked quote computation. Stands in for the real insurer integrations: the
//! offers are derived deterministically from the collected answers so the
//! rest of the product can be exercised end to end. Not a rating engine.

use chat_flow::{Answers, InsuranceType};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub insurer: String,
    pub product: String,
    /// Monthly premium in BRL.
    pub monthly_premium: f64,
}

struct Insurer {
    name: &'static str,
    multiplier: f64,
}

const INSURERS: [Insurer; 3] = [
    Insurer { name: "Aurora Seguros", multiplier: 0.92 },
    Insurer { name: "Horizonte", multiplier: 1.0 },
    Insurer { name: "Atlas Proteção", multiplier: 1.18 },
];

/// Derives the offer list from the accumulated answers. Empty when the flow
/// has not collected an insurance type yet.
pub fn quotes_for(answers: &Answers) -> Vec<Quote> {
    let Some(insurance_type) = answers.insurance_type else {
        return Vec::new();
    };

    let (product, base) = match insurance_type {
        InsuranceType::Auto => ("Seguro Auto", 187.0),
        InsuranceType::Residential => ("Seguro Residencial", 68.0),
        InsuranceType::Health => ("Plano de Saúde", 329.0),
        InsuranceType::Life => ("Seguro de Vida", 54.0),
    };

    let adjusted = base * risk_factor(insurance_type, answers);

    INSURERS
        .iter()
        .map(|insurer| Quote {
            insurer: insurer.name.to_string(),
            product: product.to_string(),
            monthly_premium: round_brl(adjusted * insurer.multiplier),
        })
        .collect()
}

/// Coarse premium adjustment from the product-specific answers. Old vehicles
/// and houses quote higher; everything else is the base rate.
fn risk_factor(insurance_type: InsuranceType, answers: &Answers) -> f64 {
    match insurance_type {
        InsuranceType::Auto => {
            let year: Option<u32> = answers.vehicle.year.as_deref().and_then(|y| y.parse().ok());
            match year {
                Some(y) if y < 2015 => 1.25,
                Some(_) => 1.0,
                None => 1.1,
            }
        }
        InsuranceType::Residential => match answers.property.kind.as_deref() {
            Some("house") => 1.2,
            _ => 1.0,
        },
        InsuranceType::Health | InsuranceType::Life => 1.0,
    }
}

fn round_brl(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_insurance_type_means_no_quotes() {
        assert!(quotes_for(&Answers::default()).is_empty());
    }

    #[test]
    fn every_insurer_quotes_the_chosen_product() {
        let mut answers = Answers::default();
        answers.apply(chat_flow::AnswerField::InsuranceType, "health");
        let quotes = quotes_for(&answers);
        assert_eq!(quotes.len(), 3);
        assert!(quotes.iter().all(|q| q.product == "Plano de Saúde"));
        // Deterministic: the same answers always produce the same offers.
        assert_eq!(quotes[1].monthly_premium, 329.0);

        let blob = serde_json::to_value(&quotes[0]).unwrap();
        assert_eq!(blob["insurer"], "Aurora Seguros");
    }

    #[test]
    fn older_vehicles_quote_higher() {
        let mut newer = Answers::default();
        newer.apply(chat_flow::AnswerField::InsuranceType, "auto");
        newer.apply(chat_flow::AnswerField::VehicleYear, "2021");
        let mut older = newer.clone();
        older.apply(chat_flow::AnswerField::VehicleYear, "2009");

        let newer_premium = quotes_for(&newer)[0].monthly_premium;
        let older_premium = quotes_for(&older)[0].monthly_premium;
        assert!(older_premium > newer_premium);
    }
}
