//! Score cloze probes against an external masked-language-model service.
//!
//! The core only depends on the scoring contract: masked tokens, the mask
//! position and the candidate fillers go in, a probability per candidate
//! comes out. The model itself lives behind an HTTP inference server.
//! Independent items are scored concurrently through a bounded pool, results
//! are journaled to a JSONL file as they arrive, and a re-run skips whatever
//! the journal already has.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cloze::ClozeItem;
use crate::summary::RunSummary;

/// Attempts per item before it is marked failed.
pub const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// BERT-style models reject inputs past this many tokens; two slots are
/// reserved for the start/end markers the model adds.
pub const MAX_MODEL_TOKENS: usize = 512;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("inference response is missing candidate {0:?}")]
    MissingCandidate(String),
}

pub trait MaskedLanguageModel {
    /// Probability of each candidate at the masked position, conditioned on
    /// the rest of the sentence in both directions.
    fn score(
        &self,
        masked_tokens: &[String],
        mask_index: usize,
        candidates: &[String],
    ) -> impl Future<Output = Result<IndexMap<String, f64>, InferenceError>> + Send;
}

/// Client for a masked-LM inference server.
pub struct HttpMaskedLm {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    tokens: &'a [String],
    mask_index: usize,
    candidates: &'a [String],
}

#[derive(Deserialize)]
struct ScoreResponse {
    probabilities: std::collections::HashMap<String, f64>,
}

impl HttpMaskedLm {
    pub fn from_server(url: impl Into<String>) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(HttpMaskedLm {
            client,
            url: url.into(),
        })
    }
}

impl MaskedLanguageModel for HttpMaskedLm {
    fn score(
        &self,
        masked_tokens: &[String],
        mask_index: usize,
        candidates: &[String],
    ) -> impl Future<Output = Result<IndexMap<String, f64>, InferenceError>> + Send {
        async move {
            let response = self
                .client
                .post(&self.url)
                .json(&ScoreRequest {
                    tokens: masked_tokens,
                    mask_index,
                    candidates,
                })
                .send()
                .await?
                .error_for_status()?
                .json::<ScoreResponse>()
                .await?;
            // keep the item's candidate order
            let mut probabilities = IndexMap::with_capacity(candidates.len());
            for candidate in candidates {
                let p = response
                    .probabilities
                    .get(candidate)
                    .copied()
                    .ok_or_else(|| InferenceError::MissingCandidate(candidate.clone()))?;
                probabilities.insert(candidate.clone(), p);
            }
            Ok(probabilities)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredClozeItem {
    pub item: ClozeItem,
    pub probabilities: IndexMap<String, f64>,
}

impl ScoredClozeItem {
    /// The correct filler must beat every other candidate strictly; a tie
    /// for the maximal probability counts as incorrect.
    pub fn is_correct(&self) -> bool {
        let Some(correct_p) = self.probabilities.get(&self.item.correct).copied() else {
            return false;
        };
        self.probabilities
            .iter()
            .all(|(candidate, p)| *candidate == self.item.correct || *p < correct_p)
    }
}

pub async fn score_with_retries<M: MaskedLanguageModel>(
    model: &M,
    item: &ClozeItem,
) -> Result<IndexMap<String, f64>, InferenceError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match model
            .score(&item.masked_tokens, item.mask_index, &item.candidates)
            .await
        {
            Ok(probabilities) => return Ok(probabilities),
            Err(error) if attempt < MAX_ATTEMPTS => {
                warn!(
                    "scoring {} failed (attempt {attempt}/{MAX_ATTEMPTS}): {error}",
                    item.uid
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(error) => return Err(error),
        }
    }
}

fn load_journal(path: &Path) -> std::io::Result<Vec<ScoredClozeItem>> {
    let mut scored = Vec::new();
    if path.exists() {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            if let Ok(item) = serde_json::from_str::<ScoredClozeItem>(&line) {
                scored.push(item);
            }
        }
    }
    Ok(scored)
}

/// Score `items` through a bounded pool of concurrent requests.
///
/// Already-journaled items are not re-scored; failed items are left out of
/// the journal so a re-run picks them up again.
pub async fn score_items<M>(
    model: &M,
    items: Vec<ClozeItem>,
    journal_path: &Path,
    concurrency: usize,
    summary: &mut RunSummary,
) -> anyhow::Result<Vec<ScoredClozeItem>>
where
    M: MaskedLanguageModel + Sync,
{
    let mut scored = load_journal(journal_path)?;
    let done: HashSet<String> = scored.iter().map(|s| s.item.uid.clone()).collect();

    let mut to_score = Vec::new();
    for item in items {
        if done.contains(&item.uid) {
            summary.items_resumed += 1;
        } else if item.masked_tokens.len() + 2 > MAX_MODEL_TOKENS {
            summary.items_too_long += 1;
        } else {
            to_score.push(item);
        }
    }
    if to_score.is_empty() {
        return Ok(scored);
    }

    let pb = ProgressBar::new(to_score.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items ({per_sec}, {eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let journal_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(journal_path)?;
    let mut writer = std::io::BufWriter::new(journal_file);

    let mut results = futures::stream::iter(to_score.into_iter())
        .map(|item| {
            let pb = pb.clone();
            async move {
                let outcome = score_with_retries(model, &item).await;
                pb.inc(1);
                (item, outcome)
            }
        })
        .buffered(concurrency.max(1));

    while let Some((item, outcome)) = results.next().await {
        match outcome {
            Ok(probabilities) => {
                let scored_item = ScoredClozeItem {
                    item,
                    probabilities,
                };
                writeln!(writer, "{}", serde_json::to_string(&scored_item)?)?;
                summary.items_scored += 1;
                scored.push(scored_item);
            }
            Err(error) => {
                warn!("giving up on {}: {error}", item.uid);
                summary.items_failed += 1;
            }
        }
    }
    pb.finish_and_clear();
    writer.flush()?;

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agreement_utils::rules::Phenomenon;
    use agreement_utils::Language;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn item(uid: &str) -> ClozeItem {
        ClozeItem {
            uid: uid.to_string(),
            language: Language::English,
            phenomenon: Phenomenon::Verb,
            masked_tokens: vec![
                "The".to_string(),
                "dogs".to_string(),
                "[MASK]".to_string(),
                ".".to_string(),
            ],
            mask_index: 2,
            correct: "run".to_string(),
            candidates: vec!["run".to_string(), "runs".to_string()],
        }
    }

    /// Scores every candidate with a fixed probability after failing a
    /// configurable number of times.
    struct FlakyModel {
        failures: AtomicU32,
        p_correct: f64,
        p_other: f64,
    }

    impl FlakyModel {
        fn reliable(p_correct: f64, p_other: f64) -> Self {
            FlakyModel {
                failures: AtomicU32::new(0),
                p_correct,
                p_other,
            }
        }
    }

    impl MaskedLanguageModel for FlakyModel {
        fn score(
            &self,
            _masked_tokens: &[String],
            _mask_index: usize,
            candidates: &[String],
        ) -> impl Future<Output = Result<IndexMap<String, f64>, InferenceError>> + Send {
            let remaining = self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            });
            let result = if remaining.is_ok() {
                Err(InferenceError::MissingCandidate("timeout".to_string()))
            } else {
                Ok(candidates
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        (
                            c.clone(),
                            if i == 0 { self.p_correct } else { self.p_other },
                        )
                    })
                    .collect())
            };
            async move { result }
        }
    }

    #[test]
    fn test_tie_counts_as_incorrect() {
        let scored = ScoredClozeItem {
            item: item("a"),
            probabilities: IndexMap::from([("run".to_string(), 0.5), ("runs".to_string(), 0.5)]),
        };
        assert!(!scored.is_correct());
    }

    #[test]
    fn test_strictly_greater_is_correct() {
        let scored = ScoredClozeItem {
            item: item("a"),
            probabilities: IndexMap::from([("run".to_string(), 0.9), ("runs".to_string(), 0.1)]),
        };
        assert!(scored.is_correct());
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let model = FlakyModel {
            failures: AtomicU32::new(2),
            p_correct: 0.9,
            p_other: 0.1,
        };
        let probe = item("a");
        let probabilities = score_with_retries(&model, &probe).await.unwrap();
        assert_eq!(probabilities.get("run"), Some(&0.9));
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail() {
        let model = FlakyModel {
            failures: AtomicU32::new(MAX_ATTEMPTS + 1),
            p_correct: 0.9,
            p_other: 0.1,
        };
        let probe = item("a");
        assert!(score_with_retries(&model, &probe).await.is_err());
    }

    #[tokio::test]
    async fn test_score_items_resumes_from_journal() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("eng.jsonl");
        let model = FlakyModel::reliable(0.9, 0.1);

        let mut summary = RunSummary::default();
        let scored = score_items(
            &model,
            vec![item("a"), item("b")],
            &journal,
            4,
            &mut summary,
        )
        .await
        .unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(summary.items_scored, 2);
        assert_eq!(summary.items_resumed, 0);

        // second run scores nothing new
        let mut summary = RunSummary::default();
        let scored = score_items(
            &model,
            vec![item("a"), item("b"), item("c")],
            &journal,
            4,
            &mut summary,
        )
        .await
        .unwrap();
        assert_eq!(scored.len(), 3);
        assert_eq!(summary.items_resumed, 2);
        assert_eq!(summary.items_scored, 1);
    }

    #[tokio::test]
    async fn test_overlong_items_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("eng.jsonl");
        let model = FlakyModel::reliable(0.9, 0.1);

        let mut long_item = item("long");
        long_item.masked_tokens = vec!["word".to_string(); MAX_MODEL_TOKENS];
        let mut summary = RunSummary::default();
        let scored = score_items(&model, vec![long_item], &journal, 1, &mut summary)
            .await
            .unwrap();
        assert!(scored.is_empty());
        assert_eq!(summary.items_too_long, 1);
    }
}
