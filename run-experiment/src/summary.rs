//! Counters for everything the pipeline skips, drops or fails, so data loss
//! is visible in the run report rather than silent.

use crate::extract::ExtractStats;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub sentences_loaded: usize,
    pub sentences_skipped: usize,
    pub morphology_lines_skipped: usize,
    pub instances_found: usize,
    pub instances_filtered_phenomenon: usize,
    pub instances_rejected_disagreement: usize,
    pub instances_rejected_unmarked: usize,
    pub dropped_missing_form: usize,
    pub dropped_missing_lemma: usize,
    pub dropped_insufficient_contrast: usize,
    pub items_built: usize,
    pub items_deduplicated: usize,
    pub items_resumed: usize,
    pub items_too_long: usize,
    pub items_scored: usize,
    pub items_failed: usize,
}

impl RunSummary {
    pub fn absorb_extract(&mut self, stats: ExtractStats) {
        self.instances_found += stats.emitted;
        self.instances_filtered_phenomenon += stats.filtered_phenomenon;
        self.instances_rejected_disagreement += stats.rejected_disagreement;
        self.instances_rejected_unmarked += stats.rejected_unmarked;
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.sentences_loaded += other.sentences_loaded;
        self.sentences_skipped += other.sentences_skipped;
        self.morphology_lines_skipped += other.morphology_lines_skipped;
        self.instances_found += other.instances_found;
        self.instances_filtered_phenomenon += other.instances_filtered_phenomenon;
        self.instances_rejected_disagreement += other.instances_rejected_disagreement;
        self.instances_rejected_unmarked += other.instances_rejected_unmarked;
        self.dropped_missing_form += other.dropped_missing_form;
        self.dropped_missing_lemma += other.dropped_missing_lemma;
        self.dropped_insufficient_contrast += other.dropped_insufficient_contrast;
        self.items_built += other.items_built;
        self.items_deduplicated += other.items_deduplicated;
        self.items_resumed += other.items_resumed;
        self.items_too_long += other.items_too_long;
        self.items_scored += other.items_scored;
        self.items_failed += other.items_failed;
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "sentences loaded:                 {}", self.sentences_loaded)?;
        writeln!(f, "sentences skipped (parse errors): {}", self.sentences_skipped)?;
        writeln!(f, "morphology lines skipped:         {}", self.morphology_lines_skipped)?;
        writeln!(f, "agreement instances found:        {}", self.instances_found)?;
        writeln!(f, "  filtered (phenomenon absent):   {}", self.instances_filtered_phenomenon)?;
        writeln!(f, "  rejected (disagreement):        {}", self.instances_rejected_disagreement)?;
        writeln!(f, "  rejected (no feature values):   {}", self.instances_rejected_unmarked)?;
        writeln!(f, "cloze items built:                {}", self.items_built)?;
        writeln!(f, "  dropped (no surface form):      {}", self.dropped_missing_form)?;
        writeln!(f, "  dropped (lemma not in tables):  {}", self.dropped_missing_lemma)?;
        writeln!(f, "  dropped (no contrasting form):  {}", self.dropped_insufficient_contrast)?;
        writeln!(f, "  deduplicated:                   {}", self.items_deduplicated)?;
        writeln!(f, "items already scored (resumed):   {}", self.items_resumed)?;
        writeln!(f, "items skipped (too long):         {}", self.items_too_long)?;
        writeln!(f, "items scored this run:            {}", self.items_scored)?;
        write!(f, "items failed after retries:       {}", self.items_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counters() {
        let mut a = RunSummary {
            sentences_loaded: 2,
            items_failed: 1,
            ..Default::default()
        };
        let b = RunSummary {
            sentences_loaded: 3,
            items_scored: 5,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.sentences_loaded, 5);
        assert_eq!(a.items_scored, 5);
        assert_eq!(a.items_failed, 1);
    }
}
