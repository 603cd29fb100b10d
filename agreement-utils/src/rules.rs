//! Declarative descriptions of the agreement configurations we probe.
//!
//! An agreement relation is an overt morphophonological co-variance of
//! feature values between two tokens: the target agrees with the controller.
//! We look for four cross-linguistically common relation types (target first,
//! controller second):
//!
//!   * determiner ~ noun
//!   * (modifying) adjective ~ noun
//!   * (predicated) adjective ~ (subject) noun
//!   * verb(-like) ~ (subject) noun
//!
//! Rules are data, not code: a new phenomenon or language is a new table row,
//! not a new branch in the extractor.

use crate::{Feature, Language, PartOfSpeech};

#[derive(
    Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Phenomenon {
    /// Determiner agreeing with its head noun.
    Determiner,
    /// Attributive adjective agreeing with the noun it modifies.
    Modifying,
    /// Predicated adjective agreeing with its subject.
    Predicated,
    /// Verb, copula or auxiliary agreeing with the subject.
    Verb,
}

impl Phenomenon {
    pub fn label(&self) -> &'static str {
        match self {
            Phenomenon::Determiner => "determiner",
            Phenomenon::Modifying => "modifying",
            Phenomenon::Predicated => "predicated",
            Phenomenon::Verb => "verb",
        }
    }
}

impl std::fmt::Display for Phenomenon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Which of the dependency pair is the agreement target (the word we probe).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetSide {
    Dependent,
    Head,
}

/// How to find the controller of the agreement, starting from the matched
/// dependency edge.
///
/// The UD schema annotates a predicated adjective or a verb as the head of
/// its subject nominal, so for those the controller is the dependent. Copulas
/// and auxiliaries are annotated as dependents of the predicate or main verb,
/// so once we match one we still have to go looking for the subject; the
/// subject is the controller while the copula/auxiliary is the target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControllerSource {
    Head,
    Dependent,
    SubjectOfHead,
}

#[derive(Clone, Debug)]
pub struct PhenomenonRule {
    pub phenomenon: Phenomenon,
    /// Dependency relations of the dependent token. Matches any listed.
    pub relations: &'static [&'static str],
    /// Allowed POS of the dependent token; empty means any.
    pub dependent_pos: &'static [PartOfSpeech],
    /// Allowed POS of the head token; empty means any.
    pub head_pos: &'static [PartOfSpeech],
    /// Head POS explicitly excluded (used to keep copula~adjective pairs out
    /// of the verb rule; the predicated rule captures those).
    pub excluded_head_pos: &'static [PartOfSpeech],
    pub target: TargetSide,
    pub controller: ControllerSource,
    /// The features the cloze probe varies; candidates must hold every other
    /// feature fixed.
    pub varied: &'static [Feature],
}

pub const RULES: &[PhenomenonRule] = &[
    // determiner ~ noun
    PhenomenonRule {
        phenomenon: Phenomenon::Determiner,
        relations: &["det", "det:predet"],
        dependent_pos: &[PartOfSpeech::Det],
        head_pos: &[PartOfSpeech::Noun],
        excluded_head_pos: &[],
        target: TargetSide::Dependent,
        controller: ControllerSource::Head,
        varied: &[Feature::Number, Feature::Gender],
    },
    // modifying adjective ~ noun
    PhenomenonRule {
        phenomenon: Phenomenon::Modifying,
        relations: &["amod"],
        dependent_pos: &[PartOfSpeech::Adj],
        head_pos: &[PartOfSpeech::Noun],
        excluded_head_pos: &[],
        target: TargetSide::Dependent,
        controller: ControllerSource::Head,
        varied: &[Feature::Number, Feature::Gender],
    },
    // predicated adjective ~ subject noun/pronoun
    PhenomenonRule {
        phenomenon: Phenomenon::Predicated,
        relations: &["nsubj"],
        dependent_pos: &[PartOfSpeech::Noun, PartOfSpeech::Pron],
        head_pos: &[PartOfSpeech::Adj],
        excluded_head_pos: &[],
        target: TargetSide::Head,
        controller: ControllerSource::Dependent,
        varied: &[Feature::Number, Feature::Gender],
    },
    // verb ~ subject noun/pronoun
    PhenomenonRule {
        phenomenon: Phenomenon::Verb,
        relations: &["nsubj"],
        dependent_pos: &[PartOfSpeech::Noun, PartOfSpeech::Pron],
        head_pos: &[PartOfSpeech::Verb],
        excluded_head_pos: &[],
        target: TargetSide::Head,
        controller: ControllerSource::Dependent,
        varied: &[Feature::Number, Feature::Person],
    },
    // copula ~ subject of its predicate
    PhenomenonRule {
        phenomenon: Phenomenon::Verb,
        relations: &["cop"],
        dependent_pos: &[],
        head_pos: &[],
        excluded_head_pos: &[PartOfSpeech::Adj],
        target: TargetSide::Dependent,
        controller: ControllerSource::SubjectOfHead,
        varied: &[Feature::Number, Feature::Person],
    },
    // auxiliary ~ subject of its main verb
    PhenomenonRule {
        phenomenon: Phenomenon::Verb,
        relations: &["aux", "aux:pass"],
        dependent_pos: &[PartOfSpeech::Aux],
        head_pos: &[PartOfSpeech::Verb],
        excluded_head_pos: &[],
        target: TargetSide::Dependent,
        controller: ControllerSource::SubjectOfHead,
        varied: &[Feature::Number, Feature::Person],
    },
];

/// The agreement phenomena each language actually has, sourced from reference
/// grammars and the linguistics literature. Harvesting is language-agnostic
/// and sometimes yields false positives (e.g. noun~adjective agreement in
/// English, from bad annotations), so instances of phenomena not listed here
/// are filtered out. We assume a language lacks a phenomenon unless it's
/// explicitly mentioned somewhere.
pub fn phenomena(language: Language) -> &'static [Phenomenon] {
    use Phenomenon::*;
    match language {
        Language::Afrikaans => &[Modifying],
        Language::Arabic => &[Modifying, Predicated, Verb],
        Language::Armenian => &[Verb],
        Language::Basque => &[Determiner, Modifying, Predicated, Verb],
        Language::Breton => &[Verb],
        Language::Catalan => &[Determiner, Modifying, Predicated, Verb],
        Language::Croatian => &[Modifying, Predicated, Verb],
        Language::Czech => &[Modifying, Predicated, Verb],
        Language::Danish => &[Determiner, Modifying, Predicated],
        Language::Dutch => &[Determiner, Modifying, Verb],
        Language::English => &[Determiner, Verb],
        Language::Finnish => &[Determiner, Modifying, Predicated, Verb],
        Language::French => &[Determiner, Modifying, Predicated, Verb],
        Language::German => &[Determiner, Modifying, Predicated, Verb],
        Language::Greek => &[Determiner, Modifying, Predicated, Verb],
        Language::Hebrew => &[Modifying, Predicated, Verb],
        Language::Hindi => &[Modifying, Predicated, Verb],
        Language::Hungarian => &[Predicated],
        Language::Irish => &[Determiner, Modifying, Verb],
        Language::Italian => &[Determiner, Modifying, Predicated, Verb],
        Language::Latin => &[Determiner, Modifying, Predicated, Verb],
        Language::NorwegianNynorsk => &[Determiner, Modifying, Predicated],
        Language::Persian => &[Modifying, Predicated, Verb],
        Language::Polish => &[Modifying, Predicated, Verb],
        Language::Portuguese => &[Determiner, Modifying, Predicated, Verb],
        Language::Romanian => &[Modifying, Predicated, Verb],
        Language::Russian => &[Modifying, Predicated, Verb],
        Language::Spanish => &[Determiner, Modifying, Predicated, Verb],
        Language::Swedish => &[Modifying, Predicated],
        Language::Tamil => &[Modifying, Verb],
        Language::Telugu => &[Modifying, Predicated, Verb],
        Language::Turkish => &[Modifying, Predicated],
        Language::Ukrainian => &[Modifying, Predicated, Verb],
        Language::Urdu => &[Modifying, Predicated, Verb],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rule_varies_something() {
        for rule in RULES {
            assert!(!rule.varied.is_empty(), "{:?}", rule.phenomenon);
        }
    }

    #[test]
    fn test_subject_lookup_rules_mask_the_dependent() {
        for rule in RULES {
            if rule.controller == ControllerSource::SubjectOfHead {
                assert_eq!(rule.target, TargetSide::Dependent);
            }
        }
    }

    #[test]
    fn test_english_has_no_adjective_agreement() {
        let types = phenomena(Language::English);
        assert!(types.contains(&Phenomenon::Determiner));
        assert!(types.contains(&Phenomenon::Verb));
        assert!(!types.contains(&Phenomenon::Modifying));
        assert!(!types.contains(&Phenomenon::Predicated));
    }
}
