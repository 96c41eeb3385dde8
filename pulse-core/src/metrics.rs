//! Metric derivation — pure functions over the record collections.
//!
//! Every aggregate view the dashboard renders lives here, consolidated into
//! one module instead of being recomputed ad hoc per view. All functions are
//! total over empty input: averages over nothing are 0.0 by convention and
//! group-bys return empty collections.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{OutcomeRecord, Reaction, ResponseRecord};

/// Rating on the 1-4 scale at which a persona decides to take the vaccine.
pub const DECISION_THRESHOLD: f64 = 3.4;

/// `DECISION_THRESHOLD` rescaled to the 0-1 range: (3.4 - 1) / 3.
pub const NORMALIZED_DECISION_THRESHOLD: f64 = 0.8;

/// Final normalized rating at or above which a persona counts as converted.
pub const CONVERSION_THRESHOLD: f64 = 0.8;

/// Normalized rating that separates the No Vaccine and Yes Vaccine buckets.
pub const SENTIMENT_MIDPOINT: f64 = 0.5;

/// Rescale a rating from the native 1-4 scale to the 0-1 range.
pub fn normalize_rating(rating: f64) -> f64 {
    (rating - 1.0) / 3.0
}

// ============================================================================
// Derived views over the survey-outcome dataset
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PersonaAttitude {
    pub persona_id: i32,
    pub count: usize,
    pub avg_attitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownSlice {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaccinationProbability {
    pub persona_id: i32,
    pub sample_size: usize,
    /// Share of this persona's outcomes with `took_vaccine`, in percent.
    pub probability_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub avg_attitude: f64,
    pub avg_recommendation: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub total: usize,
    pub real_count: usize,
    pub fact_count: usize,
    pub vaccinated_count: usize,
    pub avg_attitude: f64,
}

/// Arithmetic mean of `attitude_score`; 0.0 for an empty collection.
pub fn average_attitude(records: &[OutcomeRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.attitude_score).sum::<f64>() / records.len() as f64
}

/// Per-persona outcome count and mean attitude score, ascending by persona id.
pub fn attitude_by_persona(records: &[OutcomeRecord]) -> Vec<PersonaAttitude> {
    let mut groups: BTreeMap<i32, (usize, f64)> = BTreeMap::new();
    for r in records {
        let entry = groups.entry(r.persona_id).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += r.attitude_score;
    }
    groups
        .into_iter()
        .map(|(persona_id, (count, total))| PersonaAttitude {
            persona_id,
            count,
            avg_attitude: total / count as f64,
        })
        .collect()
}

/// Counts keyed by the four Real/Fact combinations, e.g. "Real-Fact".
pub fn reality_fact_breakdown(records: &[OutcomeRecord]) -> Vec<BreakdownSlice> {
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    for r in records {
        let key = format!(
            "{}-{}",
            if r.is_real { "Real" } else { "Not Real" },
            if r.is_fact { "Fact" } else { "Not Fact" }
        );
        *groups.entry(key).or_insert(0) += 1;
    }
    groups
        .into_iter()
        .map(|(name, value)| BreakdownSlice { name, value })
        .collect()
}

/// Vaccinated vs not-vaccinated counts.
pub fn vaccination_split(records: &[OutcomeRecord]) -> Vec<BreakdownSlice> {
    let vaccinated = records.iter().filter(|r| r.took_vaccine).count();
    [
        ("Vaccinated", vaccinated),
        ("Not Vaccinated", records.len() - vaccinated),
    ]
    .into_iter()
    .filter(|(_, value)| *value > 0)
    .map(|(name, value)| BreakdownSlice {
        name: name.to_string(),
        value,
    })
    .collect()
}

/// Per-persona likelihood of vaccination, ascending by persona id.
pub fn vaccination_probability_by_persona(
    records: &[OutcomeRecord],
) -> Vec<VaccinationProbability> {
    let mut groups: BTreeMap<i32, (usize, usize)> = BTreeMap::new();
    for r in records {
        let entry = groups.entry(r.persona_id).or_insert((0, 0));
        entry.0 += 1;
        if r.took_vaccine {
            entry.1 += 1;
        }
    }
    groups
        .into_iter()
        .map(|(persona_id, (total, vaccinated))| VaccinationProbability {
            persona_id,
            sample_size: total,
            probability_pct: if total > 0 {
                vaccinated as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Mean attitude and recommendation per calendar day, ascending by date.
pub fn daily_trends(records: &[OutcomeRecord]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<NaiveDate, (f64, f64, usize)> = BTreeMap::new();
    for r in records {
        let entry = days.entry(r.answer_time.date_naive()).or_insert((0.0, 0.0, 0));
        entry.0 += r.attitude_score;
        entry.1 += r.recommendation_rating;
        entry.2 += 1;
    }
    days.into_iter()
        .map(|(date, (attitude, recommendation, count))| DailyTrend {
            date,
            avg_attitude: attitude / count as f64,
            avg_recommendation: recommendation / count as f64,
            count,
        })
        .collect()
}

/// The newest `n` outcomes by answer time.
pub fn recent_outcomes(records: &[OutcomeRecord], n: usize) -> Vec<OutcomeRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.answer_time.cmp(&a.answer_time));
    sorted.truncate(n);
    sorted
}

/// Headline counts for the dashboard summary cards.
pub fn outcome_summary(records: &[OutcomeRecord]) -> OutcomeSummary {
    OutcomeSummary {
        total: records.len(),
        real_count: records.iter().filter(|r| r.is_real).count(),
        fact_count: records.iter().filter(|r| r.is_fact).count(),
        vaccinated_count: records.iter().filter(|r| r.took_vaccine).count(),
        avg_attitude: average_attitude(records),
    }
}

// ============================================================================
// Derived views over the iteration-trajectory dataset
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionDelta {
    pub name: String,
    pub start_rating: f64,
    pub end_rating: f64,
    pub rating_change: f64,
    pub absolute_change: f64,
    pub final_iteration: i32,
    pub change_per_iteration: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrajectorySeries {
    pub name: String,
    /// Rating on the 1-4 scale per iteration slot; `None` before a persona's
    /// first record, carried forward flat after its last.
    pub ratings: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryMatrix {
    pub iterations: Vec<i32>,
    pub series: Vec<TrajectorySeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionShift {
    pub name: String,
    /// Iterations at which the reaction moved Negative to Positive.
    pub shift_iterations: Vec<i32>,
    pub initial_reaction: Reaction,
    pub final_reaction: Reaction,
    pub has_shift: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsIterationAverage {
    pub iteration: i32,
    pub avg_real: f64,
    pub avg_fake: f64,
    pub real_count: usize,
    pub fake_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsImpact {
    pub real_exposures: usize,
    pub fake_exposures: usize,
    /// Mean first-to-last normalized change over personas with more than one
    /// exposure to that news type.
    pub avg_change_real: f64,
    pub avg_change_fake: f64,
    pub by_iteration: Vec<NewsIterationAverage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionCounts {
    pub iteration: i32,
    pub positive: usize,
    pub negative: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonaImprovement {
    pub name: String,
    /// First-to-last normalized rating change, in percent points.
    pub improvement_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickInsights {
    pub most_persuadable: Option<PersonaImprovement>,
    pub least_persuadable: Option<PersonaImprovement>,
    /// Share of personas whose final normalized rating reached the
    /// conversion threshold, in percent.
    pub conversion_rate_pct: f64,
}

/// Unique persona names in first-seen order.
pub fn persona_names(records: &[ResponseRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for r in records {
        if !names.iter().any(|n| n == &r.persona_name) {
            names.push(r.persona_name.clone());
        }
    }
    names
}

/// One persona's records sorted by iteration.
fn persona_records<'a>(records: &'a [ResponseRecord], name: &str) -> Vec<&'a ResponseRecord> {
    let mut out: Vec<&ResponseRecord> = records
        .iter()
        .filter(|r| r.persona_name == name)
        .collect();
    out.sort_by_key(|r| r.iteration);
    out
}

/// The iteration-by-persona rating matrix for the trajectory line chart.
pub fn trajectory_matrix(records: &[ResponseRecord]) -> TrajectoryMatrix {
    let max_iteration = records.iter().map(|r| r.iteration).max().unwrap_or(0);
    let iterations: Vec<i32> = (1..=max_iteration).collect();

    let series = persona_names(records)
        .into_iter()
        .map(|name| {
            let rows = persona_records(records, &name);
            let mut ratings = Vec::with_capacity(iterations.len());
            let mut last_seen: Option<f64> = None;
            for &i in &iterations {
                match rows.iter().find(|r| r.iteration == i) {
                    Some(r) => {
                        last_seen = Some(r.current_rating);
                        ratings.push(Some(r.current_rating));
                    }
                    // Flat extension past the final record, gap before the first.
                    None => ratings.push(if rows.last().is_some_and(|r| r.iteration < i) {
                        last_seen
                    } else {
                        None
                    }),
                }
            }
            TrajectorySeries { name, ratings }
        })
        .collect();

    TrajectoryMatrix { iterations, series }
}

/// Per-persona first-to-last normalized rating change, sorted by absolute
/// change descending. The sort is stable: personas with equal absolute
/// change keep their first-seen order.
pub fn conversion_trajectory(records: &[ResponseRecord]) -> Vec<ConversionDelta> {
    let mut deltas: Vec<ConversionDelta> = persona_names(records)
        .into_iter()
        .filter_map(|name| {
            let rows = persona_records(records, &name);
            let first = rows.first()?;
            let last = rows.last()?;
            let rating_change =
                last.normalized_current_rating - first.normalized_current_rating;
            let final_iteration = last.iteration;
            Some(ConversionDelta {
                name,
                start_rating: first.normalized_current_rating,
                end_rating: last.normalized_current_rating,
                rating_change,
                absolute_change: rating_change.abs(),
                final_iteration,
                change_per_iteration: if final_iteration > 0 {
                    rating_change / final_iteration as f64
                } else {
                    0.0
                },
                direction: if rating_change >= 0.0 {
                    Direction::Positive
                } else {
                    Direction::Negative
                },
            })
        })
        .collect();

    deltas.sort_by(|a, b| b.absolute_change.total_cmp(&a.absolute_change));
    deltas
}

/// Per-persona Negative-to-Positive reaction transitions.
pub fn reaction_shifts(records: &[ResponseRecord]) -> Vec<ReactionShift> {
    persona_names(records)
        .into_iter()
        .filter_map(|name| {
            let rows = persona_records(records, &name);
            let first = rows.first()?;
            let last = rows.last()?;
            let shift_iterations: Vec<i32> = rows
                .windows(2)
                .filter(|w| {
                    w[0].reaction == Reaction::Negative && w[1].reaction == Reaction::Positive
                })
                .map(|w| w[1].iteration)
                .collect();
            Some(ReactionShift {
                name,
                has_shift: !shift_iterations.is_empty(),
                shift_iterations,
                initial_reaction: first.reaction,
                final_reaction: last.reaction,
            })
        })
        .collect()
}

/// Iteration-1 normalized ratings bucketed into the three sentiment slices.
/// Buckets with no members are omitted.
pub fn sentiment_distribution(records: &[ResponseRecord]) -> Vec<BreakdownSlice> {
    let initial: Vec<f64> = records
        .iter()
        .filter(|r| r.iteration == 1)
        .map(|r| r.normalized_current_rating)
        .collect();

    let no_vaccine = initial.iter().filter(|&&v| v < SENTIMENT_MIDPOINT).count();
    let neutral = initial.iter().filter(|&&v| v == SENTIMENT_MIDPOINT).count();
    let yes_vaccine = initial.iter().filter(|&&v| v > SENTIMENT_MIDPOINT).count();

    [
        ("No Vaccine (0-0.5)", no_vaccine),
        ("Neutral (0.5)", neutral),
        ("Yes Vaccine (0.5-1)", yes_vaccine),
    ]
    .into_iter()
    .filter(|(_, value)| *value > 0)
    .map(|(name, value)| BreakdownSlice {
        name: name.to_string(),
        value,
    })
    .collect()
}

/// Real vs fake news: exposure counts, mean first-to-last change per news
/// type, and per-iteration average normalized ratings.
pub fn news_impact(records: &[ResponseRecord]) -> NewsImpact {
    let real_exposures = records.iter().filter(|r| r.is_real).count();
    let fake_exposures = records.len() - real_exposures;

    let mut real_changes: Vec<f64> = Vec::new();
    let mut fake_changes: Vec<f64> = Vec::new();
    for name in persona_names(records) {
        let rows = persona_records(records, &name);
        for (want_real, changes) in [(true, &mut real_changes), (false, &mut fake_changes)] {
            let typed: Vec<&&ResponseRecord> =
                rows.iter().filter(|r| r.is_real == want_real).collect();
            if typed.len() > 1 {
                changes.push(
                    typed[typed.len() - 1].normalized_current_rating
                        - typed[0].normalized_current_rating,
                );
            }
        }
    }

    let mean = |changes: &[f64]| {
        if changes.is_empty() {
            0.0
        } else {
            changes.iter().sum::<f64>() / changes.len() as f64
        }
    };

    let max_iteration = records.iter().map(|r| r.iteration).max().unwrap_or(0);
    let by_iteration = (1..=max_iteration)
        .map(|i| {
            let avg_of = |want_real: bool| {
                let typed: Vec<f64> = records
                    .iter()
                    .filter(|r| r.is_real == want_real && r.iteration == i)
                    .map(|r| r.normalized_current_rating)
                    .collect();
                let count = typed.len();
                let avg = if count > 0 {
                    typed.iter().sum::<f64>() / count as f64
                } else {
                    0.0
                };
                (avg, count)
            };
            let (avg_real, real_count) = avg_of(true);
            let (avg_fake, fake_count) = avg_of(false);
            NewsIterationAverage {
                iteration: i,
                avg_real,
                avg_fake,
                real_count,
                fake_count,
            }
        })
        .collect();

    NewsImpact {
        real_exposures,
        fake_exposures,
        avg_change_real: mean(&real_changes),
        avg_change_fake: mean(&fake_changes),
        by_iteration,
    }
}

/// Positive/Negative reaction counts per iteration, ascending.
pub fn reaction_counts_by_iteration(records: &[ResponseRecord]) -> Vec<ReactionCounts> {
    let mut groups: BTreeMap<i32, (usize, usize)> = BTreeMap::new();
    for r in records {
        let entry = groups.entry(r.iteration).or_insert((0, 0));
        match r.reaction {
            Reaction::Positive => entry.0 += 1,
            Reaction::Negative => entry.1 += 1,
        }
    }
    groups
        .into_iter()
        .map(|(iteration, (positive, negative))| ReactionCounts {
            iteration,
            positive,
            negative,
            total: positive + negative,
        })
        .collect()
}

/// Most/least persuadable persona and the overall conversion rate.
pub fn quick_insights(records: &[ResponseRecord], conversion_threshold: f64) -> QuickInsights {
    let deltas = conversion_trajectory(records);

    let to_improvement = |d: &ConversionDelta| PersonaImprovement {
        name: d.name.clone(),
        improvement_pct: d.rating_change * 100.0,
    };

    let most_persuadable = deltas
        .iter()
        .max_by(|a, b| a.rating_change.total_cmp(&b.rating_change))
        .map(to_improvement);
    let least_persuadable = deltas
        .iter()
        .min_by(|a, b| a.rating_change.total_cmp(&b.rating_change))
        .map(to_improvement);

    let conversion_rate_pct = if deltas.is_empty() {
        0.0
    } else {
        let converted = deltas
            .iter()
            .filter(|d| d.end_rating >= conversion_threshold)
            .count();
        converted as f64 / deltas.len() as f64 * 100.0
    };

    QuickInsights {
        most_persuadable,
        least_persuadable,
        conversion_rate_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn outcome(
        persona_id: i32,
        day: u32,
        attitude: f64,
        recommendation: f64,
        took_vaccine: bool,
        is_real: bool,
        is_fact: bool,
    ) -> OutcomeRecord {
        OutcomeRecord {
            id: Uuid::new_v4(),
            persona_id,
            answer_time: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            response: "response text".to_string(),
            is_real,
            is_fact,
            took_vaccine,
            recommendation_rating: recommendation,
            attitude_score: attitude,
        }
    }

    fn response(
        persona_id: i32,
        name: &str,
        iteration: i32,
        rating: f64,
        normalized: f64,
        reaction: Reaction,
        is_real: bool,
    ) -> ResponseRecord {
        ResponseRecord {
            id: Uuid::new_v4(),
            persona_id,
            persona_name: name.to_string(),
            iteration,
            current_rating: rating,
            normalized_current_rating: normalized,
            recommended_rating: rating + 0.5,
            normalized_recommended_rating: normalized + 0.1,
            reaction,
            reason: String::new(),
            editor_changes: String::new(),
            article: String::new(),
            is_real,
        }
    }

    #[test]
    fn normalized_decision_threshold_matches_raw_scale() {
        assert!(
            (normalize_rating(DECISION_THRESHOLD) - NORMALIZED_DECISION_THRESHOLD).abs() < 1e-9
        );
        assert!((normalize_rating(1.0) - 0.0).abs() < 1e-9);
        assert!((normalize_rating(4.0) - 1.0).abs() < 1e-9);
    }

    // ------------------------------------------------------------------
    // Outcome metrics
    // ------------------------------------------------------------------

    #[test]
    fn average_attitude_is_the_arithmetic_mean() {
        let records = vec![
            outcome(1, 1, 2.0, 3.0, false, true, true),
            outcome(1, 1, 4.0, 3.0, true, true, false),
            outcome(2, 2, 3.0, 2.0, false, false, false),
        ];
        assert!((average_attitude(&records) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn average_attitude_of_empty_collection_is_zero() {
        assert_eq!(average_attitude(&[]), 0.0);
    }

    #[test]
    fn persona_grouping_partitions_without_loss() {
        let records = vec![
            outcome(1, 1, 2.0, 3.0, false, true, true),
            outcome(2, 1, 4.0, 3.0, true, true, false),
            outcome(2, 2, 3.0, 2.0, false, false, false),
            outcome(7, 2, 1.0, 1.0, false, false, true),
        ];
        let groups = attitude_by_persona(&records);
        let total: usize = groups.iter().map(|g| g.count).sum();
        assert_eq!(total, records.len());
        assert_eq!(groups.len(), 3);
        // Ascending persona id
        assert!(groups.windows(2).all(|w| w[0].persona_id < w[1].persona_id));
    }

    #[test]
    fn reality_fact_breakdown_covers_all_records() {
        let records = vec![
            outcome(1, 1, 2.0, 3.0, false, true, true),
            outcome(1, 1, 2.0, 3.0, false, true, false),
            outcome(1, 1, 2.0, 3.0, false, false, false),
        ];
        let slices = reality_fact_breakdown(&records);
        let total: usize = slices.iter().map(|s| s.value).sum();
        assert_eq!(total, 3);
        assert!(slices.iter().any(|s| s.name == "Real-Fact" && s.value == 1));
        assert!(slices.iter().any(|s| s.name == "Not Real-Not Fact"));
    }

    #[test]
    fn vaccination_split_omits_empty_slices() {
        let records = vec![
            outcome(1, 1, 2.0, 3.0, true, true, true),
            outcome(2, 1, 2.0, 3.0, true, true, true),
        ];
        let slices = vaccination_split(&records);
        assert_eq!(
            slices,
            vec![BreakdownSlice {
                name: "Vaccinated".to_string(),
                value: 2
            }]
        );
    }

    #[test]
    fn vaccination_probability_is_per_persona_share() {
        let records = vec![
            outcome(1, 1, 2.0, 3.0, true, true, true),
            outcome(1, 2, 2.0, 3.0, false, true, true),
            outcome(2, 1, 2.0, 3.0, true, true, true),
        ];
        let probs = vaccination_probability_by_persona(&records);
        assert_eq!(probs.len(), 2);
        assert!((probs[0].probability_pct - 50.0).abs() < 1e-9);
        assert_eq!(probs[0].sample_size, 2);
        assert!((probs[1].probability_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn daily_trends_average_per_day_ascending() {
        let records = vec![
            outcome(1, 2, 4.0, 2.0, false, true, true),
            outcome(1, 1, 2.0, 4.0, false, true, true),
            outcome(2, 2, 2.0, 4.0, false, true, true),
        ];
        let trends = daily_trends(&records);
        assert_eq!(trends.len(), 2);
        assert!(trends[0].date < trends[1].date);
        assert!((trends[1].avg_attitude - 3.0).abs() < 1e-9);
        assert!((trends[1].avg_recommendation - 3.0).abs() < 1e-9);
        assert_eq!(trends[1].count, 2);
    }

    #[test]
    fn recent_outcomes_returns_newest_first() {
        let records = vec![
            outcome(1, 1, 2.0, 2.0, false, true, true),
            outcome(2, 5, 2.0, 2.0, false, true, true),
            outcome(3, 3, 2.0, 2.0, false, true, true),
        ];
        let recent = recent_outcomes(&records, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].persona_id, 2);
        assert_eq!(recent[1].persona_id, 3);
    }

    #[test]
    fn outcome_summary_counts_tags() {
        let records = vec![
            outcome(1, 1, 2.0, 2.0, true, true, true),
            outcome(2, 1, 4.0, 2.0, false, false, true),
        ];
        let summary = outcome_summary(&records);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.real_count, 1);
        assert_eq!(summary.fact_count, 2);
        assert_eq!(summary.vaccinated_count, 1);
        assert!((summary.avg_attitude - 3.0).abs() < 1e-9);
    }

    // ------------------------------------------------------------------
    // Trajectory metrics
    // ------------------------------------------------------------------

    fn brian_and_sarah() -> Vec<ResponseRecord> {
        vec![
            response(1, "Brian", 1, 1.0, 0.0, Reaction::Negative, true),
            response(1, "Brian", 2, 1.6, 0.2, Reaction::Negative, true),
            response(1, "Brian", 3, 2.8, 0.6, Reaction::Positive, true),
            response(2, "Sarah", 1, 2.5, 0.5, Reaction::Positive, false),
            response(2, "Sarah", 2, 2.2, 0.4, Reaction::Negative, false),
        ]
    }

    #[test]
    fn conversion_delta_is_last_minus_first() {
        let deltas = conversion_trajectory(&brian_and_sarah());
        let brian = deltas.iter().find(|d| d.name == "Brian").unwrap();
        assert!((brian.rating_change - 0.6).abs() < 1e-9);
        assert!((brian.start_rating - 0.0).abs() < 1e-9);
        assert!((brian.end_rating - 0.6).abs() < 1e-9);
        assert_eq!(brian.final_iteration, 3);
        assert!((brian.change_per_iteration - 0.2).abs() < 1e-9);
        assert_eq!(brian.direction, Direction::Positive);

        let sarah = deltas.iter().find(|d| d.name == "Sarah").unwrap();
        assert!((sarah.rating_change + 0.1).abs() < 1e-9);
        assert_eq!(sarah.direction, Direction::Negative);
    }

    #[test]
    fn conversion_trajectory_sorts_descending_by_absolute_change() {
        let deltas = conversion_trajectory(&brian_and_sarah());
        assert_eq!(deltas[0].name, "Brian");
        assert_eq!(deltas[1].name, "Sarah");
        assert!(deltas
            .windows(2)
            .all(|w| w[0].absolute_change >= w[1].absolute_change));
    }

    #[test]
    fn conversion_trajectory_sort_is_stable_on_ties() {
        let records = vec![
            response(1, "Alpha", 1, 1.0, 0.2, Reaction::Negative, true),
            response(1, "Alpha", 2, 1.0, 0.5, Reaction::Negative, true),
            response(2, "Beta", 1, 1.0, 0.4, Reaction::Negative, true),
            response(2, "Beta", 2, 1.0, 0.7, Reaction::Negative, true),
        ];
        let deltas = conversion_trajectory(&records);
        // Equal absolute change (0.3) keeps first-seen order.
        assert_eq!(deltas[0].name, "Alpha");
        assert_eq!(deltas[1].name, "Beta");
    }

    #[test]
    fn conversion_trajectory_ignores_unsorted_input_order() {
        let mut records = brian_and_sarah();
        records.reverse();
        let deltas = conversion_trajectory(&records);
        let brian = deltas.iter().find(|d| d.name == "Brian").unwrap();
        assert!((brian.rating_change - 0.6).abs() < 1e-9);
    }

    #[test]
    fn sentiment_fixture_lands_one_record_per_bucket() {
        let records = vec![
            response(1, "A", 1, 1.0, 0.0, Reaction::Negative, true),
            response(2, "B", 1, 2.5, 0.5, Reaction::Negative, true),
            response(3, "C", 1, 4.0, 1.0, Reaction::Positive, true),
        ];
        let slices = sentiment_distribution(&records);
        assert_eq!(slices.len(), 3);
        assert!(slices.iter().all(|s| s.value == 1));
        assert_eq!(slices[0].name, "No Vaccine (0-0.5)");
        assert_eq!(slices[1].name, "Neutral (0.5)");
        assert_eq!(slices[2].name, "Yes Vaccine (0.5-1)");
    }

    #[test]
    fn sentiment_distribution_only_counts_iteration_one() {
        let records = vec![
            response(1, "A", 1, 1.0, 0.0, Reaction::Negative, true),
            response(1, "A", 2, 4.0, 1.0, Reaction::Positive, true),
        ];
        let slices = sentiment_distribution(&records);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].name, "No Vaccine (0-0.5)");
    }

    #[test]
    fn reaction_shift_detects_negative_to_positive() {
        let shifts = reaction_shifts(&brian_and_sarah());
        let brian = shifts.iter().find(|s| s.name == "Brian").unwrap();
        assert!(brian.has_shift);
        assert_eq!(brian.shift_iterations, vec![3]);
        assert_eq!(brian.initial_reaction, Reaction::Negative);
        assert_eq!(brian.final_reaction, Reaction::Positive);

        // Positive to Negative is not a shift.
        let sarah = shifts.iter().find(|s| s.name == "Sarah").unwrap();
        assert!(!sarah.has_shift);
        assert!(sarah.shift_iterations.is_empty());
    }

    #[test]
    fn trajectory_matrix_carries_final_rating_forward() {
        let matrix = trajectory_matrix(&brian_and_sarah());
        assert_eq!(matrix.iterations, vec![1, 2, 3]);
        let sarah = matrix.series.iter().find(|s| s.name == "Sarah").unwrap();
        // Sarah has no iteration-3 record; her final rating extends flat.
        assert_eq!(sarah.ratings, vec![Some(2.5), Some(2.2), Some(2.2)]);
    }

    #[test]
    fn news_impact_splits_changes_by_type() {
        let records = vec![
            response(1, "Brian", 1, 1.0, 0.0, Reaction::Negative, true),
            response(1, "Brian", 2, 1.6, 0.2, Reaction::Negative, true),
            response(2, "Sarah", 1, 2.5, 0.5, Reaction::Positive, false),
            response(2, "Sarah", 2, 2.2, 0.4, Reaction::Negative, false),
            // Single real exposure for Sarah: not enough for a change.
            response(2, "Sarah", 3, 2.2, 0.4, Reaction::Negative, true),
        ];
        let impact = news_impact(&records);
        assert_eq!(impact.real_exposures, 3);
        assert_eq!(impact.fake_exposures, 2);
        assert!((impact.avg_change_real - 0.2).abs() < 1e-9);
        assert!((impact.avg_change_fake + 0.1).abs() < 1e-9);
        assert_eq!(impact.by_iteration.len(), 3);
        let first = &impact.by_iteration[0];
        assert_eq!(first.real_count, 1);
        assert_eq!(first.fake_count, 1);
        assert!((first.avg_real - 0.0).abs() < 1e-9);
        assert!((first.avg_fake - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reaction_counts_partition_each_iteration() {
        let counts = reaction_counts_by_iteration(&brian_and_sarah());
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].positive + counts[0].negative, counts[0].total);
        assert_eq!(counts[0].total, 2);
        assert_eq!(counts[2].total, 1);
    }

    #[test]
    fn quick_insights_picks_extremes_and_conversion_rate() {
        let records = vec![
            response(1, "Brian", 1, 1.0, 0.0, Reaction::Negative, true),
            response(1, "Brian", 2, 3.7, 0.9, Reaction::Positive, true),
            response(2, "Sarah", 1, 2.5, 0.5, Reaction::Positive, false),
            response(2, "Sarah", 2, 2.2, 0.4, Reaction::Negative, false),
        ];
        let insights = quick_insights(&records, CONVERSION_THRESHOLD);
        let most = insights.most_persuadable.unwrap();
        assert_eq!(most.name, "Brian");
        assert!((most.improvement_pct - 90.0).abs() < 1e-9);
        let least = insights.least_persuadable.unwrap();
        assert_eq!(least.name, "Sarah");
        // Brian converted (0.9 >= 0.8), Sarah did not.
        assert!((insights.conversion_rate_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn quick_insights_over_empty_input() {
        let insights = quick_insights(&[], CONVERSION_THRESHOLD);
        assert!(insights.most_persuadable.is_none());
        assert!(insights.least_persuadable.is_none());
        assert_eq!(insights.conversion_rate_pct, 0.0);
    }
}
