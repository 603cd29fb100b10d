pub mod rules;
pub mod schema;

use unicode_normalization::UnicodeNormalization;

/// BERT-style mask placeholder used in every cloze probe.
pub const MASK: &str = "[MASK]";

#[derive(
    Clone,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Copy,
)]
pub enum PartOfSpeech {
    #[serde(rename = "ADJ")]
    Adj, // adjective
    #[serde(rename = "ADP")]
    Adp, // adposition
    #[serde(rename = "ADV")]
    Adv, // adverb
    #[serde(rename = "AUX")]
    Aux, // auxiliary
    #[serde(rename = "CCONJ")]
    Cconj, // coordinating conjunction
    #[serde(rename = "DET")]
    Det, // determiner
    #[serde(rename = "INTJ")]
    Intj, // interjection
    #[serde(rename = "NOUN")]
    Noun, // noun
    #[serde(rename = "NUM")]
    Num, // numeral
    #[serde(rename = "PART")]
    Part, // particle
    #[serde(rename = "PRON")]
    Pron, // pronoun
    #[serde(rename = "PROPN")]
    Propn, // proper noun
    #[serde(rename = "PUNCT")]
    Punct, // punctuation
    #[serde(rename = "SCONJ")]
    Sconj, // subordinating conjunction
    #[serde(rename = "SYM")]
    Sym, // symbol
    #[serde(rename = "VERB")]
    Verb, // verb
    #[serde(rename = "X")]
    X, // other
}

impl PartOfSpeech {
    pub fn from_ud(tag: &str) -> Option<Self> {
        match tag {
            "ADJ" => Some(PartOfSpeech::Adj),
            "ADP" => Some(PartOfSpeech::Adp),
            "ADV" => Some(PartOfSpeech::Adv),
            "AUX" => Some(PartOfSpeech::Aux),
            "CCONJ" => Some(PartOfSpeech::Cconj),
            "DET" => Some(PartOfSpeech::Det),
            "INTJ" => Some(PartOfSpeech::Intj),
            "NOUN" => Some(PartOfSpeech::Noun),
            "NUM" => Some(PartOfSpeech::Num),
            "PART" => Some(PartOfSpeech::Part),
            "PRON" => Some(PartOfSpeech::Pron),
            "PROPN" => Some(PartOfSpeech::Propn),
            "PUNCT" => Some(PartOfSpeech::Punct),
            "SCONJ" => Some(PartOfSpeech::Sconj),
            "SYM" => Some(PartOfSpeech::Sym),
            "VERB" => Some(PartOfSpeech::Verb),
            "X" => Some(PartOfSpeech::X),
            _ => None,
        }
    }

    pub fn as_ud(&self) -> &'static str {
        match self {
            PartOfSpeech::Adj => "ADJ",
            PartOfSpeech::Adp => "ADP",
            PartOfSpeech::Adv => "ADV",
            PartOfSpeech::Aux => "AUX",
            PartOfSpeech::Cconj => "CCONJ",
            PartOfSpeech::Det => "DET",
            PartOfSpeech::Intj => "INTJ",
            PartOfSpeech::Noun => "NOUN",
            PartOfSpeech::Num => "NUM",
            PartOfSpeech::Part => "PART",
            PartOfSpeech::Pron => "PRON",
            PartOfSpeech::Propn => "PROPN",
            PartOfSpeech::Punct => "PUNCT",
            PartOfSpeech::Sconj => "SCONJ",
            PartOfSpeech::Sym => "SYM",
            PartOfSpeech::Verb => "VERB",
            PartOfSpeech::X => "X",
        }
    }
}

/// The four features this project tracks agreement in.
#[derive(
    Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum Feature {
    Number,
    Gender,
    Case,
    Person,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Number,
        Feature::Gender,
        Feature::Case,
        Feature::Person,
    ];

    /// The UD feature key as it appears in the FEATS column.
    pub fn ud_key(&self) -> &'static str {
        match self {
            Feature::Number => "Number",
            Feature::Gender => "Gender",
            Feature::Case => "Case",
            Feature::Person => "Person",
        }
    }
}

#[derive(
    Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum NumberValue {
    Sing,
    Plur,
}

#[derive(
    Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum GenderValue {
    Masc,
    Fem,
    Neut,
}

/// We restrict our attention to the core case values.
#[derive(
    Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum CaseValue {
    Nom,
    Acc,
    Erg,
    Abs,
}

#[derive(
    Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum PersonValue {
    First,
    Second,
    Third,
}

/// The feature values a token is marked for. A token may lack a value for a
/// feature either because the language doesn't mark that feature on this kind
/// of token or because the annotation is missing.
#[derive(
    Clone,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
pub struct FeatureBundle {
    pub number: Option<NumberValue>,
    pub gender: Option<GenderValue>,
    pub case: Option<CaseValue>,
    pub person: Option<PersonValue>,
}

impl FeatureBundle {
    /// True if the bundle has no value in any of the four features.
    pub fn is_unmarked(&self) -> bool {
        self.number.is_none()
            && self.gender.is_none()
            && self.case.is_none()
            && self.person.is_none()
    }

    /// The value of `feature` as a UD value string, if marked.
    pub fn value(&self, feature: Feature) -> Option<&'static str> {
        match feature {
            Feature::Number => self.number.map(|v| match v {
                NumberValue::Sing => "Sing",
                NumberValue::Plur => "Plur",
            }),
            Feature::Gender => self.gender.map(|v| match v {
                GenderValue::Masc => "Masc",
                GenderValue::Fem => "Fem",
                GenderValue::Neut => "Neut",
            }),
            Feature::Case => self.case.map(|v| match v {
                CaseValue::Nom => "Nom",
                CaseValue::Acc => "Acc",
                CaseValue::Erg => "Erg",
                CaseValue::Abs => "Abs",
            }),
            Feature::Person => self.person.map(|v| match v {
                PersonValue::First => "1",
                PersonValue::Second => "2",
                PersonValue::Third => "3",
            }),
        }
    }

    /// Set `feature` from a UD value string. Values outside the inventory we
    /// track are ignored.
    pub fn set_from_ud(&mut self, feature: Feature, value: &str) {
        match feature {
            Feature::Number => {
                self.number = match value {
                    "Sing" => Some(NumberValue::Sing),
                    "Plur" => Some(NumberValue::Plur),
                    _ => self.number,
                }
            }
            Feature::Gender => {
                self.gender = match value {
                    "Masc" => Some(GenderValue::Masc),
                    "Fem" => Some(GenderValue::Fem),
                    "Neut" => Some(GenderValue::Neut),
                    _ => self.gender,
                }
            }
            Feature::Case => {
                self.case = match value {
                    "Nom" => Some(CaseValue::Nom),
                    "Acc" => Some(CaseValue::Acc),
                    "Erg" => Some(CaseValue::Erg),
                    "Abs" => Some(CaseValue::Abs),
                    _ => self.case,
                }
            }
            Feature::Person => {
                self.person = match value {
                    "1" => Some(PersonValue::First),
                    "2" => Some(PersonValue::Second),
                    "3" => Some(PersonValue::Third),
                    _ => self.person,
                }
            }
        }
    }

    /// True if the two bundles have identical values for every feature
    /// outside `varied`.
    pub fn matches_outside(&self, other: &Self, varied: &[Feature]) -> bool {
        Feature::ALL
            .iter()
            .filter(|f| !varied.contains(f))
            .all(|&f| self.value(f) == other.value(f))
    }
}

/// How two tokens relate in one feature.
///
/// `Matching` covers both tokens carrying the same value and both being
/// unmarked. `OneSided` means exactly one token is marked, which happens
/// whenever a language doesn't mark that feature on that kind of token (e.g.
/// English subjects don't mark person). `Conflicting` is most often a bad
/// annotation, though genuine grammatical disagreement exists (anti-agreement
/// under subject extraction, for example), so we drop those instances rather
/// than trusting either token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Agreement {
    Matching,
    OneSided,
    Conflicting,
}

pub fn compare_feature(a: &FeatureBundle, b: &FeatureBundle, feature: Feature) -> Agreement {
    match (a.value(feature), b.value(feature)) {
        (x, y) if x == y => Agreement::Matching,
        (Some(_), Some(_)) => Agreement::Conflicting,
        _ => Agreement::OneSided,
    }
}

/// True if the two bundles conflict in no feature.
pub fn agrees(a: &FeatureBundle, b: &FeatureBundle) -> bool {
    Feature::ALL
        .iter()
        .all(|&f| compare_feature(a, b, f) != Agreement::Conflicting)
}

/// Case-fold and NFC-normalize a surface form. We don't expect feature values
/// to differ by casing, and the larger vocabulary we get from folding
/// outweighs the rare cases where that expectation is wrong.
pub fn normalize_form(form: &str) -> String {
    form.nfc().collect::<String>().to_lowercase()
}

#[derive(Copy, Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Afrikaans,
    Arabic,
    Armenian,
    Basque,
    Breton,
    Catalan,
    Croatian,
    Czech,
    Danish,
    Dutch,
    English,
    Finnish,
    French,
    German,
    Greek,
    Hebrew,
    Hindi,
    Hungarian,
    Irish,
    Italian,
    Latin,
    NorwegianNynorsk,
    Persian,
    Polish,
    Portuguese,
    Romanian,
    Russian,
    Spanish,
    Swedish,
    Tamil,
    Telugu,
    Turkish,
    Ukrainian,
    Urdu,
}

impl Language {
    /// ISO 639-3 code, used for the UniMorph files and our output paths.
    pub fn iso_639_3(&self) -> &'static str {
        match self {
            Language::Afrikaans => "afr",
            Language::Arabic => "ara",
            Language::Armenian => "hye",
            Language::Basque => "eus",
            Language::Breton => "bre",
            Language::Catalan => "cat",
            Language::Croatian => "hrv",
            Language::Czech => "ces",
            Language::Danish => "dan",
            Language::Dutch => "nld",
            Language::English => "eng",
            Language::Finnish => "fin",
            Language::French => "fra",
            Language::German => "deu",
            Language::Greek => "ell",
            Language::Hebrew => "heb",
            Language::Hindi => "hin",
            Language::Hungarian => "hun",
            Language::Irish => "gle",
            Language::Italian => "ita",
            Language::Latin => "lat",
            Language::NorwegianNynorsk => "nno",
            Language::Persian => "fas",
            Language::Polish => "pol",
            Language::Portuguese => "por",
            Language::Romanian => "ron",
            Language::Russian => "rus",
            Language::Spanish => "spa",
            Language::Swedish => "swe",
            Language::Tamil => "tam",
            Language::Telugu => "tel",
            Language::Turkish => "tur",
            Language::Ukrainian => "ukr",
            Language::Urdu => "urd",
        }
    }

    /// The language name as it appears in Universal Dependencies treebank
    /// directory names (e.g. `UD_Norwegian-Nynorsk`).
    pub fn ud_name(&self) -> &'static str {
        match self {
            Language::NorwegianNynorsk => "Norwegian-Nynorsk",
            Language::Afrikaans => "Afrikaans",
            Language::Arabic => "Arabic",
            Language::Armenian => "Armenian",
            Language::Basque => "Basque",
            Language::Breton => "Breton",
            Language::Catalan => "Catalan",
            Language::Croatian => "Croatian",
            Language::Czech => "Czech",
            Language::Danish => "Danish",
            Language::Dutch => "Dutch",
            Language::English => "English",
            Language::Finnish => "Finnish",
            Language::French => "French",
            Language::German => "German",
            Language::Greek => "Greek",
            Language::Hebrew => "Hebrew",
            Language::Hindi => "Hindi",
            Language::Hungarian => "Hungarian",
            Language::Irish => "Irish",
            Language::Italian => "Italian",
            Language::Latin => "Latin",
            Language::Persian => "Persian",
            Language::Polish => "Polish",
            Language::Portuguese => "Portuguese",
            Language::Romanian => "Romanian",
            Language::Russian => "Russian",
            Language::Spanish => "Spanish",
            Language::Swedish => "Swedish",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Turkish => "Turkish",
            Language::Ukrainian => "Ukrainian",
            Language::Urdu => "Urdu",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ud_name())
    }
}

/// Every language in the study.
pub const LANGUAGES: &[Language] = &[
    Language::Afrikaans,
    Language::Arabic,
    Language::Armenian,
    Language::Basque,
    Language::Breton,
    Language::Catalan,
    Language::Croatian,
    Language::Czech,
    Language::Danish,
    Language::Dutch,
    Language::English,
    Language::Finnish,
    Language::French,
    Language::German,
    Language::Greek,
    Language::Hebrew,
    Language::Hindi,
    Language::Hungarian,
    Language::Irish,
    Language::Italian,
    Language::Latin,
    Language::NorwegianNynorsk,
    Language::Persian,
    Language::Polish,
    Language::Portuguese,
    Language::Romanian,
    Language::Russian,
    Language::Spanish,
    Language::Swedish,
    Language::Tamil,
    Language::Telugu,
    Language::Turkish,
    Language::Ukrainian,
    Language::Urdu,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_feature() {
        let mut a = FeatureBundle::default();
        let mut b = FeatureBundle::default();
        assert_eq!(compare_feature(&a, &b, Feature::Number), Agreement::Matching);

        a.number = Some(NumberValue::Plur);
        assert_eq!(compare_feature(&a, &b, Feature::Number), Agreement::OneSided);

        b.number = Some(NumberValue::Plur);
        assert_eq!(compare_feature(&a, &b, Feature::Number), Agreement::Matching);

        b.number = Some(NumberValue::Sing);
        assert_eq!(
            compare_feature(&a, &b, Feature::Number),
            Agreement::Conflicting
        );
        assert!(!agrees(&a, &b));
    }

    #[test]
    fn test_one_sided_marking_still_agrees() {
        // English "he" is marked for gender, "tall" is not
        let he = FeatureBundle {
            number: Some(NumberValue::Sing),
            gender: Some(GenderValue::Masc),
            person: Some(PersonValue::Third),
            ..Default::default()
        };
        let tall = FeatureBundle::default();
        assert!(agrees(&he, &tall));
    }

    #[test]
    fn test_matches_outside_varied() {
        let run = FeatureBundle {
            number: Some(NumberValue::Plur),
            ..Default::default()
        };
        let runs = FeatureBundle {
            number: Some(NumberValue::Sing),
            person: Some(PersonValue::Third),
            ..Default::default()
        };
        assert!(run.matches_outside(&runs, &[Feature::Number, Feature::Person]));
        assert!(!run.matches_outside(&runs, &[Feature::Gender]));
    }

    #[test]
    fn test_normalize_form() {
        assert_eq!(normalize_form("Hunde"), "hunde");
        // decomposed e + combining acute composes to é
        assert_eq!(normalize_form("parle\u{0301}"), "parlé");
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::English.iso_639_3(), "eng");
        assert_eq!(Language::NorwegianNynorsk.ud_name(), "Norwegian-Nynorsk");
        assert_eq!(LANGUAGES.len(), 34);
    }
}
