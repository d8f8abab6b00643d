use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const BASE_POINTS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 4.0,
            Difficulty::Hard => 8.0,
        }
    }

    /// Flat value shown on a collection task card. Awards still go through
    /// [`calculate_points`].
    pub fn advertised_points(self) -> i64 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 30,
            Difficulty::Hard => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

pub fn derive_difficulty(amount: f64) -> Difficulty {
    if amount <= 5.0 {
        Difficulty::Easy
    } else if amount <= 20.0 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

/// `floor(amount * 5 * multiplier)`. Sign and magnitude of `amount` are not checked.
pub fn calculate_points(difficulty: Difficulty, amount: f64) -> i64 {
    (amount * BASE_POINTS * difficulty.multiplier()).floor() as i64
}

/// [`calculate_points`], or `None` when the award does not fit in an `i64`.
/// The float-to-int cast saturates, so a saturated result means overflow.
pub fn checked_points(difficulty: Difficulty, amount: f64) -> Option<i64> {
    let points = calculate_points(difficulty, amount);
    let fits = amount.is_finite() && points != i64::MAX && points != i64::MIN;
    fits.then_some(points)
}

pub fn level_for_points(points: i64) -> i64 {
    points.div_euclid(100) + 1
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+(\.\d+)?").expect("number pattern is valid"))
}

/// First unsigned number anywhere in a free-text quantity ("about 2.5 kg" -> 2.5), or 0.
pub fn loose_amount(quantity: &str) -> f64 {
    number_pattern()
        .find(quantity)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Longest numeric prefix after leading whitespace ("2.5 kg" -> 2.5, "-3kg" -> -3), or 0.
pub fn leading_amount(quantity: &str) -> f64 {
    let s = quantity.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut digit_count = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if digit_count > 0 || frac_end > end + 1 {
            digit_count += frac_end - (end + 1);
            end = frac_end;
        }
    }

    if digit_count == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_follow_multiplier() {
        assert_eq!(calculate_points(Difficulty::Medium, 10.0), 200);
        assert_eq!(calculate_points(Difficulty::Hard, 2.5), 100);
        assert_eq!(calculate_points(Difficulty::Easy, 1.0), 5);
        assert_eq!(calculate_points(Difficulty::Easy, 0.0), 0);
    }

    #[test]
    fn points_are_floored() {
        assert_eq!(calculate_points(Difficulty::Easy, 1.39), 6);
        assert_eq!(calculate_points(Difficulty::Medium, 0.33), 6);
    }

    #[test]
    fn oversized_awards_do_not_fit() {
        assert_eq!(checked_points(Difficulty::Medium, 10.0), Some(200));
        assert_eq!(checked_points(Difficulty::Easy, -3.0), Some(-15));
        assert_eq!(checked_points(Difficulty::Hard, 1e20), None);
        assert_eq!(checked_points(Difficulty::Hard, f64::INFINITY), None);
        assert_eq!(checked_points(Difficulty::Hard, -1e20), None);
    }

    #[test]
    fn difficulty_derived_from_amount() {
        assert_eq!(derive_difficulty(4.0), Difficulty::Easy);
        assert_eq!(derive_difficulty(5.0), Difficulty::Easy);
        assert_eq!(derive_difficulty(5.01), Difficulty::Medium);
        assert_eq!(derive_difficulty(20.0), Difficulty::Medium);
        assert_eq!(derive_difficulty(21.0), Difficulty::Hard);
    }

    #[test]
    fn difficulty_parse_is_case_sensitive() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("hard".parse::<Difficulty>().is_err());
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(level_for_points(250), 3);
        assert_eq!(level_for_points(-15), 0);
    }

    #[test]
    fn loose_amount_takes_first_number() {
        assert_eq!(loose_amount("2.5 kg"), 2.5);
        assert_eq!(loose_amount("about 12 kilograms"), 12.0);
        assert_eq!(loose_amount("-3 kg"), 3.0);
        assert_eq!(loose_amount("a few bags"), 0.0);
    }

    #[test]
    fn leading_amount_parses_prefix_only() {
        assert_eq!(leading_amount("2.5 kg"), 2.5);
        assert_eq!(leading_amount("  7kg"), 7.0);
        assert_eq!(leading_amount("-3kg"), -3.0);
        assert_eq!(leading_amount(".5 kg"), 0.5);
        assert_eq!(leading_amount("1e2 grams"), 100.0);
        assert_eq!(leading_amount("about 3 kg"), 0.0);
        assert_eq!(leading_amount(""), 0.0);
    }
}
