//! Turn agreement instances into masked-word probes.
//!
//! The masked token's lemma is looked up in the morphology table and the
//! candidate fillers are the inflections that hold every feature outside the
//! rule's varied set fixed, so the probe isolates the agreement signal from
//! confounding variation. An instance without a contrasting alternative makes
//! no probe and is dropped (tallied, never an error).

use agreement_utils::rules::Phenomenon;
use agreement_utils::{Language, MASK, normalize_form};
use serde::{Deserialize, Serialize};

use crate::corpus::Sentence;
use crate::extract::AgreementInstance;
use crate::morphology::MorphologyTable;

/// Which of the instance's two tokens gets masked. We probe both directions:
/// masking the target tests whether the model inflects to match the
/// controller, masking the controller tests the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSide {
    Target,
    Controller,
}

/// Why an instance produced no probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The token to mask has no usable surface form or lemma.
    MissingForm,
    /// The morphology table has no entry for the lemma.
    LemmaNotInMorphology,
    /// Fewer than two qualifying inflections; nothing to contrast against.
    InsufficientContrast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClozeItem {
    pub uid: String,
    pub language: Language,
    pub phenomenon: Phenomenon,
    /// The sentence's surface forms with the masked position replaced by
    /// [`MASK`]. A copy; no reference back to the sentence.
    pub masked_tokens: Vec<String>,
    pub mask_index: usize,
    pub correct: String,
    /// Ordered; always contains `correct`.
    pub candidates: Vec<String>,
}

/// Build the masked token sequence for the token at 0-based `mask_position`.
///
/// Multiword tokens complicate this: the surface form of a span is emitted
/// once in place of its component words, and if the word to mask lies inside
/// a span the whole span is masked. Tokens without a surface form are left
/// out. Returns the sequence and the index of the mask within it.
fn mask_tokens(sentence: &Sentence, mask_position: usize) -> Option<(Vec<String>, usize)> {
    let mask_id = mask_position + 1; // spans use 1-based ids
    let mut result = Vec::new();
    let mut mask_index = None;
    let mut index = 0;
    while index < sentence.tokens.len() {
        let id = index + 1;
        if let Some(span) = sentence
            .multiword
            .iter()
            .find(|span| span.start <= id && id <= span.end)
        {
            if span.start <= mask_id && mask_id <= span.end {
                mask_index = Some(result.len());
                result.push(MASK.to_string());
            } else {
                result.push(span.form.clone());
            }
            index = span.end; // skip the component words
            continue;
        }
        let token = &sentence.tokens[index];
        if index == mask_position {
            mask_index = Some(result.len());
            result.push(MASK.to_string());
        } else if !token.form.is_empty() && token.form != "_" {
            result.push(token.form.clone());
        }
        index += 1;
    }
    mask_index.map(|mask_index| (result, mask_index))
}

pub fn build(
    sentence: &Sentence,
    instance: &AgreementInstance,
    morphology: &MorphologyTable,
    side: MaskSide,
) -> Result<ClozeItem, SkipReason> {
    let mask_position = match side {
        MaskSide::Target => instance.target,
        MaskSide::Controller => instance.controller,
    };
    let token = &sentence.tokens[mask_position];
    if token.form.is_empty() || token.form == "_" || token.lemma.is_empty() || token.lemma == "_" {
        return Err(SkipReason::MissingForm);
    }
    let correct = normalize_form(&token.form);
    let lemma = normalize_form(&token.lemma);

    let entry = morphology
        .get(&lemma)
        .ok_or(SkipReason::LemmaNotInMorphology)?;

    let mut candidates: Vec<String> = Vec::new();
    for inflection in &entry.inflections {
        if token.upos.is_some() && inflection.pos != token.upos {
            continue;
        }
        if !inflection.features.matches_outside(&token.feats, instance.varied) {
            continue;
        }
        if !candidates.contains(&inflection.form) {
            candidates.push(inflection.form.clone());
        }
    }
    // the correct filler is attested in the corpus even when the morphology
    // table lacks its exact feature bundle
    if !candidates.contains(&correct) {
        candidates.insert(0, correct.clone());
    }
    if candidates.len() < 2 {
        return Err(SkipReason::InsufficientContrast);
    }

    let (masked_tokens, mask_index) =
        mask_tokens(sentence, mask_position).ok_or(SkipReason::MissingForm)?;

    let side_tag = match side {
        MaskSide::Target => "t",
        MaskSide::Controller => "c",
    };
    Ok(ClozeItem {
        uid: format!("{}:{side_tag}", instance.uid),
        language: instance.language,
        phenomenon: instance.phenomenon,
        masked_tokens,
        mask_index,
        correct,
        candidates,
    })
}
