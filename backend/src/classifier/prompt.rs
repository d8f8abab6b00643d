use super::{Expectation, Strictness};

pub fn identify() -> String {
    r#"You are a strict waste management and recycling expert. Your task is to accurately identify and quantify waste in images.

Analyze this image and provide:
1. The SPECIFIC type of waste (e.g., PET plastic, cardboard, aluminum cans) - be precise
2. An accurate estimate of the quantity in kilograms (kg)
3. Your confidence level in this assessment
4. Verify this is a real waste collection photo (not staged or stock photo)

Respond with only a JSON object in this exact format (no markdown, no backticks):
{
  "wasteType": "specific type of waste",
  "quantity": "estimated quantity in kg",
  "confidence": 0.95
}

Be conservative in your estimates and only report high confidence when truly certain."#
        .to_string()
}

pub fn verify(expectation: &Expectation, strictness: Strictness) -> String {
    let mut checks = Vec::new();

    match (&expectation.waste_type, strictness) {
        (Some(waste_type), Strictness::Strict) => checks.push(format!(
            "If it CLEARLY shows collection/cleanup of {waste_type} waste (be strict about waste type matching)"
        )),
        (Some(waste_type), Strictness::Lenient) => checks.push(format!(
            "If it shows collection/cleanup of {waste_type} waste (be lenient in verification)"
        )),
        (None, Strictness::Strict) => {
            checks.push("If it CLEARLY shows collection/cleanup of waste".to_string())
        }
        (None, Strictness::Lenient) => checks
            .push("If it shows collection/cleanup of waste (be lenient in verification)".to_string()),
    }

    checks.push("Provide a precise quantity estimate in kilograms (kg)".to_string());

    if let Some(difficulty) = expectation.difficulty {
        checks.push(format!(
            "Assess if the cleanup effort matches the {difficulty} difficulty level"
        ));
    }

    if strictness == Strictness::Strict {
        checks.push("Look for clear evidence of actual waste collection (not just random photos)".to_string());
        checks.push("Verify the image shows recent activity (not old or stock photos)".to_string());
    }

    let numbered: String = checks
        .iter()
        .enumerate()
        .map(|(i, check)| format!("{}. {}\n", i + 1, check))
        .collect();

    let closing = match strictness {
        Strictness::Strict => {
            "Be strict and conservative in your assessment. Only return verified: true if you are highly confident."
        }
        Strictness::Lenient => "Keep the assessment brief.",
    };

    format!(
        r#"You are a waste verification expert. Your task is to verify waste collection efforts.

Analyze this image and verify:
{numbered}
Respond with only a JSON object in this exact format (no markdown, no backticks):
{{
  "verified": true/false,
  "confidence": 0.95,
  "quantity": "2.5 kg",
  "matchesDifficulty": true/false,
  "assessment": "explanation of the verification decision"
}}

{closing}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::Difficulty;

    #[test]
    fn verify_prompt_names_expectations() {
        let expectation = Expectation {
            waste_type: Some("Electronic".to_string()),
            difficulty: Some(Difficulty::Hard),
        };
        let prompt = verify(&expectation, Strictness::Strict);

        assert!(prompt.contains("Electronic waste"));
        assert!(prompt.contains("Hard difficulty level"));
        assert!(prompt.contains("\"matchesDifficulty\""));
        assert!(prompt.contains("5. Verify the image shows recent activity"));
    }

    #[test]
    fn lenient_prompt_skips_forensics() {
        let expectation = Expectation {
            waste_type: None,
            difficulty: Some(Difficulty::Easy),
        };
        let prompt = verify(&expectation, Strictness::Lenient);

        assert!(prompt.contains("be lenient"));
        assert!(!prompt.contains("stock photos"));
    }
}
