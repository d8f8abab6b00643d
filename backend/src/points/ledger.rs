use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::formula::level_for_points;

const EARNED_PREFIX: &str = "earned";

/// Ledger kinds as stored in `transactions.type`. The balance fold matches
/// on the string, so a new earning kind must keep the `earned` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    EarnedReport,
    EarnedCollect,
    Redeemed,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::EarnedReport => "earned_report",
            TransactionKind::EarnedCollect => "earned_collect",
            TransactionKind::Redeemed => "redeemed",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earned_report" => Ok(TransactionKind::EarnedReport),
            "earned_collect" => Ok(TransactionKind::EarnedCollect),
            "redeemed" => Ok(TransactionKind::Redeemed),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

pub trait LedgerEntry {
    fn kind(&self) -> &str;
    fn amount(&self) -> i64;
}

impl LedgerEntry for (TransactionKind, i64) {
    fn kind(&self) -> &str {
        self.0.as_str()
    }

    fn amount(&self) -> i64 {
        self.1
    }
}

/// Spendable points: earnings minus redemptions, clamped at zero once at the end.
/// Kinds outside the closed set contribute nothing.
pub fn balance<'a, E, I>(entries: I) -> i64
where
    E: LedgerEntry + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let net = entries.into_iter().fold(0i64, |acc, entry| {
        let kind = entry.kind();
        if kind.starts_with(EARNED_PREFIX) {
            acc.saturating_add(entry.amount())
        } else if kind == TransactionKind::Redeemed.as_str() {
            acc.saturating_sub(entry.amount())
        } else {
            acc
        }
    });

    net.max(0)
}

#[derive(Debug, Clone)]
pub struct Contender {
    pub user_id: i64,
    pub user_name: String,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Standing {
    pub rank: usize,
    pub user_id: i64,
    pub user_name: String,
    pub points: i64,
    pub level: i64,
}

/// Sorts by points descending; `sort_by` is stable so ties keep input order.
pub fn rank_leaderboard(mut contenders: Vec<Contender>) -> Vec<Standing> {
    contenders.sort_by(|a, b| b.points.cmp(&a.points));

    contenders
        .into_iter()
        .enumerate()
        .map(|(i, c)| Standing {
            rank: i + 1,
            user_id: c.user_id,
            level: level_for_points(c.points),
            user_name: c.user_name,
            points: c.points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransactionKind::*;

    #[test]
    fn balance_subtracts_redemptions() {
        let entries = [(EarnedReport, 100), (Redeemed, 40)];
        assert_eq!(balance(&entries), 60);
    }

    #[test]
    fn balance_never_negative() {
        let entries = [(Redeemed, 40)];
        assert_eq!(balance(&entries), 0);
    }

    #[test]
    fn clamp_applies_to_the_total_only() {
        // redemption before any earning still nets against later earnings
        let entries = [(Redeemed, 40), (EarnedCollect, 100)];
        assert_eq!(balance(&entries), 60);
    }

    #[test]
    fn balance_is_pure() {
        let entries = [(EarnedReport, 25), (EarnedCollect, 80), (Redeemed, 30)];
        assert_eq!(balance(&entries), balance(&entries));
        assert_eq!(balance(&entries), 75);
    }

    #[test]
    fn empty_ledger_is_zero() {
        let entries: [(TransactionKind, i64); 0] = [];
        assert_eq!(balance(&entries), 0);
    }

    #[test]
    fn kind_strings_round_trip() {
        for kind in [EarnedReport, EarnedCollect, Redeemed] {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
        assert!("Redeemed".parse::<TransactionKind>().is_err());
    }

    fn contender(user_id: i64, points: i64) -> Contender {
        Contender {
            user_id,
            user_name: format!("user{user_id}"),
            points,
        }
    }

    #[test]
    fn leaderboard_sorted_descending_with_stable_ties() {
        let ranked = rank_leaderboard(vec![
            contender(1, 50),
            contender(2, 300),
            contender(3, 50),
            contender(4, 120),
        ]);

        let order: Vec<i64> = ranked.iter().map(|s| s.user_id).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].level, 4);
        assert_eq!(ranked[3].rank, 4);
    }
}
