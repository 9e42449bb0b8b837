//! Tiered allocation of a recovery's bikes.
//!
//! Bikes are handed out in three passes, strongest interest first. Within a
//! pass a bike wanted by a single association goes to it for free; a bike wanted
//! by several is contested and goes to the association with the most points,
//! which pays for it. Losing a contest earns points for the next recovery.

use crate::domain::ledger::Ledger;
use crate::domain::model::{Assignment, Bike};
use crate::domain::preference::{Preference, Tier};
use crate::domain::recovery_date::RecoveryDate;
use rand::seq::SliceRandom;
use rand::Rng;

/// One association taking part in a run. `preference` is `None` when nothing was submitted.
#[derive(Debug, Clone)]
pub struct Claimant {
    pub id: String,
    pub preference: Option<Preference>,
}

impl Claimant {
    pub fn new(id: impl Into<String>, preference: Option<Preference>) -> Self {
        Self {
            id: id.into(),
            preference,
        }
    }

    fn tier_for(&self, bike_id: &str) -> Tier {
        self.preference
            .as_ref()
            .map(|p| p.tier_for(bike_id))
            .unwrap_or(Tier::NotInterested)
    }

    fn quota(&self, total_bikes: usize) -> usize {
        self.preference
            .as_ref()
            .map(|p| p.effective_quota(total_bikes))
            .unwrap_or(total_bikes)
    }
}

#[derive(Debug, Clone)]
pub struct AllocationInput {
    pub recovery_date: RecoveryDate,
    pub bikes: Vec<Bike>,
    /// Scan order for interested associations; it matters for tie-breaks.
    pub claimants: Vec<Claimant>,
}

/// How a bike was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Direct {
        bike_id: String,
        tier: Tier,
        association: String,
    },
    Contest {
        bike_id: String,
        tier: Tier,
        interested: Vec<String>,
        eligible: usize,
        winner: Option<String>,
        charged: bool,
    },
}

impl Decision {
    pub fn bike_id(&self) -> &str {
        match self {
            Decision::Direct { bike_id, .. } | Decision::Contest { bike_id, .. } => bike_id,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Decision::Direct { tier, .. } | Decision::Contest { tier, .. } => *tier,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub assignment: Assignment,
    pub ledger: Ledger,
    pub decisions: Vec<Decision>,
}

impl AllocationOutcome {
    pub fn direct_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d, Decision::Direct { .. }))
            .count()
    }

    pub fn contest_count(&self) -> usize {
        self.decisions.len() - self.direct_count()
    }

    /// Contested bikes for which every interested association was already full.
    pub fn unresolved_contests(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d, Decision::Contest { winner: None, .. }))
            .count()
    }
}

/// Stateless allocation algorithm; everything it needs comes in through [`AllocationInput`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationEngine;

impl AllocationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn allocate<R: Rng + ?Sized>(
        &self,
        input: AllocationInput,
        mut ledger: Ledger,
        rng: &mut R,
    ) -> AllocationOutcome {
        let AllocationInput {
            recovery_date,
            mut bikes,
            claimants,
        } = input;

        let total = bikes.len();
        let quotas: Vec<usize> = claimants.iter().map(|c| c.quota(total)).collect();
        let mut counts = vec![0usize; claimants.len()];
        // assigned, or contested at a higher tier
        let mut settled = vec![false; total];
        let mut decisions = Vec::new();

        for tier in Tier::PASSES {
            let mut contested: Vec<(usize, Vec<usize>)> = Vec::new();

            for (b, bike) in bikes.iter_mut().enumerate() {
                if settled[b] {
                    continue;
                }

                let interested: Vec<usize> = claimants
                    .iter()
                    .enumerate()
                    .filter(|(_, claimant)| claimant.tier_for(&bike.id) == tier)
                    .map(|(c, _)| c)
                    .collect();

                match interested.as_slice() {
                    [] => {}
                    [only] => {
                        let only = *only;
                        if counts[only] < quotas[only] {
                            bike.assigned_to = Some(claimants[only].id.clone());
                            counts[only] += 1;
                            settled[b] = true;
                            decisions.push(Decision::Direct {
                                bike_id: bike.id.clone(),
                                tier,
                                association: claimants[only].id.clone(),
                            });
                        }
                    }
                    _ => {
                        settled[b] = true;
                        contested.push((b, interested));
                    }
                }
            }

            contested.shuffle(rng);

            for (b, interested) in contested {
                let eligible: Vec<usize> = interested
                    .iter()
                    .copied()
                    .filter(|&c| counts[c] < quotas[c])
                    .collect();

                let winner = pick_leader(&eligible, &claimants, &ledger, rng);
                let charged = eligible.len() > 1;

                if charged {
                    let share = tier.weight() / interested.len() as f64;
                    for &c in &interested {
                        if Some(c) == winner {
                            ledger.adjust(&claimants[c].id, -tier.weight());
                        } else {
                            ledger.adjust(&claimants[c].id, share);
                        }
                    }
                }

                let bike = &mut bikes[b];
                if let Some(w) = winner {
                    bike.assigned_to = Some(claimants[w].id.clone());
                    counts[w] += 1;
                } else {
                    tracing::debug!(
                        "Bike {} stays unassigned: every interested association reached its quota",
                        bike.id
                    );
                }

                decisions.push(Decision::Contest {
                    bike_id: bike.id.clone(),
                    tier,
                    interested: interested.iter().map(|&c| claimants[c].id.clone()).collect(),
                    eligible: eligible.len(),
                    winner: winner.map(|w| claimants[w].id.clone()),
                    charged,
                });
            }
        }

        AllocationOutcome {
            assignment: Assignment::new(recovery_date, bikes),
            ledger,
            decisions,
        }
    }
}

/// Scans candidates keeping the one with the most points. A tie with the
/// current leader is settled by a fresh coin flip each time it occurs.
fn pick_leader<R: Rng + ?Sized>(
    eligible: &[usize],
    claimants: &[Claimant],
    ledger: &Ledger,
    rng: &mut R,
) -> Option<usize> {
    let mut leader: Option<usize> = None;

    for &candidate in eligible {
        let Some(current) = leader else {
            leader = Some(candidate);
            continue;
        };

        let score = ledger.score(&claimants[candidate].id);
        let best = ledger.score(&claimants[current].id);

        if score > best || (score == best && rng.random_bool(0.5)) {
            leader = Some(candidate);
        }
    }

    leader
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date() -> RecoveryDate {
        RecoveryDate::parse("2026-10-21").unwrap()
    }

    fn bikes(ids: &[&str]) -> Vec<Bike> {
        ids.iter()
            .map(|id| Bike::from_photo(format!("bikes/{}.jpg", id), format!("{}.jpg", id)))
            .collect()
    }

    fn preference(tiers: &[(&str, Tier)], quota: Option<usize>) -> Preference {
        Preference {
            tiers: tiers.iter().map(|(id, t)| (id.to_string(), *t)).collect(),
            requested_quota: quota,
        }
    }

    fn run(
        bike_ids: &[&str],
        claimants: Vec<Claimant>,
        ledger: Ledger,
        seed: u64,
    ) -> AllocationOutcome {
        let input = AllocationInput {
            recovery_date: date(),
            bikes: bikes(bike_ids),
            claimants,
        };
        AllocationEngine::new().allocate(input, ledger, &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_uncontested_interest_is_free() {
        let outcome = run(
            &["A", "B", "C"],
            vec![
                Claimant::new("x", Some(preference(&[("A", Tier::High)], None))),
                Claimant::new(
                    "y",
                    Some(preference(&[("B", Tier::High), ("C", Tier::Low)], None)),
                ),
            ],
            Ledger::new().with_associations(["x", "y"]),
            1,
        );

        let assignment = &outcome.assignment;
        assert_eq!(assignment.owner_of("A"), Some("x"));
        assert_eq!(assignment.owner_of("B"), Some("y"));
        assert_eq!(assignment.owner_of("C"), Some("y"));
        assert_eq!(outcome.ledger.score("x"), 0.0);
        assert_eq!(outcome.ledger.score("y"), 0.0);
        assert_eq!(outcome.direct_count(), 3);
        assert_eq!(outcome.contest_count(), 0);
    }

    #[test]
    fn test_contest_moves_points() {
        for seed in 0..20 {
            let outcome = run(
                &["D"],
                vec![
                    Claimant::new("x", Some(preference(&[("D", Tier::High)], Some(1)))),
                    Claimant::new("y", Some(preference(&[("D", Tier::High)], Some(1)))),
                ],
                Ledger::new().with_associations(["x", "y"]),
                seed,
            );

            let winner = outcome.assignment.owner_of("D").unwrap().to_string();
            let loser = if winner == "x" { "y" } else { "x" };

            assert_eq!(outcome.ledger.score(&winner), -3.0);
            assert_eq!(outcome.ledger.score(loser), 1.5);
            assert_eq!(outcome.assignment.count_for(&winner), 1);
            assert_eq!(outcome.assignment.count_for(loser), 0);
        }
    }

    #[test]
    fn test_higher_score_wins_contest() {
        let mut ledger = Ledger::new();
        ledger.set("x", -1.0);
        ledger.set("y", 2.0);

        for seed in 0..10 {
            let outcome = run(
                &["D"],
                vec![
                    Claimant::new("x", Some(preference(&[("D", Tier::Medium)], None))),
                    Claimant::new("y", Some(preference(&[("D", Tier::Medium)], None))),
                ],
                ledger.clone(),
                seed,
            );
            assert_eq!(outcome.assignment.owner_of("D"), Some("y"));
            assert_eq!(outcome.ledger.score("y"), 0.0);
            assert_eq!(outcome.ledger.score("x"), 0.0);
        }
    }

    #[test]
    fn test_tie_break_reaches_both_sides() {
        let mut winners = std::collections::BTreeSet::new();
        for seed in 0..64 {
            let outcome = run(
                &["D"],
                vec![
                    Claimant::new("x", Some(preference(&[("D", Tier::High)], None))),
                    Claimant::new("y", Some(preference(&[("D", Tier::High)], None))),
                ],
                Ledger::new(),
                seed,
            );
            winners.insert(outcome.assignment.owner_of("D").unwrap().to_string());
        }
        assert_eq!(winners.len(), 2);
    }

    #[test]
    fn test_three_way_tie_favours_the_last_scanned() {
        // each challenger flips a coin against the current leader, so the last
        // one wins half the time and the first two a quarter each
        let claimants: Vec<Claimant> = ["a", "b", "c"]
            .iter()
            .map(|id| Claimant::new(*id, Some(preference(&[("D", Tier::High)], None))))
            .collect();
        let ledger = Ledger::new().with_associations(["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(2026);

        let runs = 12_000;
        let mut wins = [0usize; 3];
        for _ in 0..runs {
            let leader = pick_leader(&[0, 1, 2], &claimants, &ledger, &mut rng).unwrap();
            wins[leader] += 1;
        }

        let share = |n: usize| n as f64 / runs as f64;
        assert!((share(wins[0]) - 0.25).abs() < 0.03, "a won {:?}", wins);
        assert!((share(wins[1]) - 0.25).abs() < 0.03, "b won {:?}", wins);
        assert!((share(wins[2]) - 0.5).abs() < 0.03, "c won {:?}", wins);
    }

    #[test]
    fn test_zero_quota_never_receives() {
        let outcome = run(
            &["A", "B"],
            vec![Claimant::new(
                "x",
                Some(preference(&[("A", Tier::High), ("B", Tier::High)], Some(0))),
            )],
            Ledger::new(),
            3,
        );

        assert_eq!(outcome.assignment.count_for("x"), 0);
        assert_eq!(outcome.assignment.unassigned().count(), 2);
        assert!(outcome.decisions.is_empty());
    }

    #[test]
    fn test_contest_with_one_eligible_is_free() {
        // x fills its single slot with A first, so B is only really wanted by y
        let outcome = run(
            &["A", "B"],
            vec![
                Claimant::new(
                    "x",
                    Some(preference(&[("A", Tier::High), ("B", Tier::Medium)], Some(1))),
                ),
                Claimant::new("y", Some(preference(&[("B", Tier::Medium)], None))),
            ],
            Ledger::new().with_associations(["x", "y"]),
            5,
        );

        assert_eq!(outcome.assignment.owner_of("A"), Some("x"));
        assert_eq!(outcome.assignment.owner_of("B"), Some("y"));
        assert_eq!(outcome.ledger.score("x"), 0.0);
        assert_eq!(outcome.ledger.score("y"), 0.0);

        let contest = outcome
            .decisions
            .iter()
            .find(|d| d.bike_id() == "B")
            .unwrap();
        assert!(matches!(
            contest,
            Decision::Contest { eligible: 1, charged: false, .. }
        ));
    }

    #[test]
    fn test_contest_without_room_stays_unassigned_and_is_not_retried() {
        // both are full after pass 3; B was contested at pass 2 and z's tier 1 interest must not pick it up
        let outcome = run(
            &["A1", "A2", "B"],
            vec![
                Claimant::new(
                    "x",
                    Some(preference(&[("A1", Tier::High), ("B", Tier::Medium)], Some(1))),
                ),
                Claimant::new(
                    "y",
                    Some(preference(&[("A2", Tier::High), ("B", Tier::Medium)], Some(1))),
                ),
                Claimant::new("z", Some(preference(&[("B", Tier::Low)], None))),
            ],
            Ledger::new().with_associations(["x", "y", "z"]),
            9,
        );

        assert_eq!(outcome.assignment.owner_of("B"), None);
        assert_eq!(outcome.unresolved_contests(), 1);
        assert_eq!(outcome.assignment.count_for("z"), 0);
        for id in ["x", "y", "z"] {
            assert_eq!(outcome.ledger.score(id), 0.0);
        }
    }

    #[test]
    fn test_full_single_claimant_leaves_bike_for_lower_tier() {
        let outcome = run(
            &["A", "B"],
            vec![
                Claimant::new(
                    "x",
                    Some(preference(&[("A", Tier::High), ("B", Tier::High)], Some(1))),
                ),
                Claimant::new("y", Some(preference(&[("B", Tier::Low)], None))),
            ],
            Ledger::new(),
            2,
        );

        assert_eq!(outcome.assignment.owner_of("A"), Some("x"));
        assert_eq!(outcome.assignment.owner_of("B"), Some("y"));
    }

    #[test]
    fn test_crowded_contest_shares_gain_among_all_interested() {
        let mut ledger = Ledger::new();
        ledger.set("x", 10.0);
        let high = |id: &str| Claimant::new(id, Some(preference(&[("D", Tier::High)], None)));

        let outcome = run(&["D"], vec![high("x"), high("y"), high("z")], ledger, 4);

        assert_eq!(outcome.assignment.owner_of("D"), Some("x"));
        assert_eq!(outcome.ledger.score("x"), 7.0);
        assert_eq!(outcome.ledger.score("y"), 1.0);
        assert_eq!(outcome.ledger.score("z"), 1.0);
    }

    #[test]
    fn test_full_member_of_contest_still_earns_share() {
        // x is full after A; B is contested by x, y, z with y and z still eligible
        let outcome = run(
            &["A", "B"],
            vec![
                Claimant::new(
                    "x",
                    Some(preference(&[("A", Tier::High), ("B", Tier::Low)], Some(1))),
                ),
                Claimant::new("y", Some(preference(&[("B", Tier::Low)], None))),
                Claimant::new("z", Some(preference(&[("B", Tier::Low)], None))),
            ],
            Ledger::new(),
            11,
        );

        let winner = outcome.assignment.owner_of("B").unwrap().to_string();
        assert_ne!(winner, "x");
        assert_eq!(outcome.ledger.score(&winner), -1.0);
        assert_eq!(outcome.ledger.score("x"), 1.0 / 3.0);
        let other = if winner == "y" { "z" } else { "y" };
        assert_eq!(outcome.ledger.score(other), 1.0 / 3.0);
    }

    #[test]
    fn test_absent_preference_means_no_interest() {
        let outcome = run(
            &["A"],
            vec![
                Claimant::new("x", None),
                Claimant::new("y", Some(preference(&[("A", Tier::Medium)], None))),
            ],
            Ledger::new(),
            0,
        );
        assert_eq!(outcome.assignment.owner_of("A"), Some("y"));
    }

    #[test]
    fn test_properties_hold_on_random_inputs() {
        use rand::Rng;

        let ids = ["a", "b", "c", "d"];
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bike_ids: Vec<String> = (0..rng.random_range(1..12)).map(|i| format!("B{}", i)).collect();
            let bike_refs: Vec<&str> = bike_ids.iter().map(String::as_str).collect();

            let claimants: Vec<Claimant> = ids
                .iter()
                .map(|id| {
                    let tiers: Vec<(&str, Tier)> = bike_refs
                        .iter()
                        .map(|b| (*b, Tier::try_from(rng.random_range(0..4u8)).unwrap()))
                        .collect();
                    let quota = if rng.random_bool(0.5) {
                        Some(rng.random_range(0..4))
                    } else {
                        None
                    };
                    Claimant::new(*id, Some(preference(&tiers, quota)))
                })
                .collect();

            let mut ledger = Ledger::new();
            for id in ids {
                ledger.set(id, f64::from(rng.random_range(-3..4i32)));
            }

            let outcome = run(&bike_refs, claimants.clone(), ledger.clone(), seed);
            let total = bike_refs.len();

            for claimant in &claimants {
                assert!(outcome.assignment.count_for(&claimant.id) <= claimant.quota(total));
            }

            let mut seen = std::collections::HashSet::new();
            for decision in &outcome.decisions {
                assert!(seen.insert(decision.bike_id().to_string()), "bike decided twice");
            }

            for bike in &outcome.assignment.bikes {
                let Some(owner) = bike.assigned_to.as_deref() else {
                    continue;
                };
                let claimant = claimants.iter().find(|c| c.id == owner).unwrap();
                let tier = claimant.tier_for(&bike.id);
                assert_ne!(tier, Tier::NotInterested);

                let decision = outcome
                    .decisions
                    .iter()
                    .find(|d| d.bike_id() == bike.id)
                    .unwrap();
                assert_eq!(decision.tier(), tier);
            }

            for decision in &outcome.decisions {
                if let Decision::Contest { interested, winner: Some(_), charged: false, .. } = decision {
                    assert!(interested.len() >= 2);
                }
            }

            let charged: usize = outcome
                .decisions
                .iter()
                .filter(|d| matches!(d, Decision::Contest { charged: true, .. }))
                .count();
            if charged == 0 {
                assert_eq!(outcome.ledger, ledger);
            }
        }
    }
}
