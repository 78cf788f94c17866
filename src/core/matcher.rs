use crate::core::{
    candidates::CandidateStrategy,
    comparator::compare_records,
    normalize::Normalizer,
};
use crate::models::{ContactRecord, MatchResult};

/// Result of one detection run
#[derive(Debug, Default)]
pub struct DetectionOutcome {
    pub matches: Vec<MatchResult>,
    pub total_records: usize,
    pub usable_records: usize,
    pub compared_pairs: usize,
}

/// Duplicate detection orchestrator
///
/// # Pipeline Stages
/// 1. Drop records without an identifier
/// 2. Candidate pair generation (exhaustive or bucketed)
/// 3. Field comparison
/// 4. Keep pairs with at least one matching field
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    normalizer: Normalizer,
    strategy: CandidateStrategy,
}

impl Matcher {
    pub fn new(normalizer: Normalizer, strategy: CandidateStrategy) -> Self {
        Self { normalizer, strategy }
    }

    /// Same normalization, different candidate strategy
    pub fn with_strategy(&self, strategy: CandidateStrategy) -> Self {
        Self {
            normalizer: self.normalizer,
            strategy,
        }
    }

    pub fn strategy(&self) -> &CandidateStrategy {
        &self.strategy
    }

    /// Find candidate duplicate pairs in `records`
    pub fn detect_duplicates(&self, records: &[ContactRecord]) -> Vec<MatchResult> {
        self.detect(records).matches
    }

    /// Run detection and keep the counters alongside the matches
    ///
    /// Matches keep the order in which pairs were generated. Fewer than two
    /// usable records produce an empty outcome.
    pub fn detect(&self, records: &[ContactRecord]) -> DetectionOutcome {
        let usable: Vec<(i64, &ContactRecord)> = records
            .iter()
            .filter(|record| record.is_usable())
            .filter_map(|record| record.id.map(|id| (id, record)))
            .collect();

        let mut outcome = DetectionOutcome {
            total_records: records.len(),
            usable_records: usable.len(),
            ..Default::default()
        };

        if usable.len() < 2 {
            return outcome;
        }

        let index_space: Vec<&ContactRecord> = usable.iter().map(|(_, record)| *record).collect();

        for (i, j) in self.strategy.candidate_pairs(&index_space) {
            outcome.compared_pairs += 1;

            let (source_id, source) = usable[i];
            let (target_id, target) = usable[j];

            let field_matches = compare_records(source, target, &self.normalizer);
            if let Some(result) = field_matches.into_result(source_id, target_id) {
                outcome.matches.push(result);
            }
        }

        tracing::debug!(
            "Compared {} pairs over {} usable records, {} matches",
            outcome.compared_pairs,
            outcome.usable_records,
            outcome.matches.len()
        );

        outcome
    }
}
