//! Read Universal Dependencies treebank files (CoNLL-U) into sentence records.
//!
//! Malformed sentences are skipped with a warning rather than aborting the
//! whole file; only an unreadable file is an error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use agreement_utils::{FeatureBundle, PartOfSpeech, schema};
use log::warn;

use crate::error::ParseError;

const CONLLU_FIELDS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub form: String,
    pub lemma: String,
    pub upos: Option<PartOfSpeech>,
    /// 0-based index of the syntactic head; None for the root.
    pub head: Option<usize>,
    pub deprel: String,
    pub feats: FeatureBundle,
}

/// A surface span covering several syntactic words (CoNLL-U `3-4` rows).
/// `start`/`end` are 1-based token ids, inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiwordSpan {
    pub start: usize,
    pub end: usize,
    pub form: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub id: String,
    pub tokens: Vec<Token>,
    pub multiword: Vec<MultiwordSpan>,
}

impl Sentence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Lazy iterator over the sentences of one CoNLL-U file.
pub struct SentenceReader<R> {
    lines: std::io::Lines<R>,
    path: String,
    line_no: usize,
    sentence_no: usize,
    done: bool,
}

impl<R: BufRead> SentenceReader<R> {
    pub fn new(reader: R, path: impl Into<String>) -> Self {
        SentenceReader {
            lines: reader.lines(),
            path: path.into(),
            line_no: 0,
            sentence_no: 0,
            done: false,
        }
    }
}

pub fn read_sentences(path: &Path) -> std::io::Result<SentenceReader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(SentenceReader::new(
        BufReader::new(file),
        path.display().to_string(),
    ))
}

/// Read a whole file, skipping (and counting) malformed sentences.
pub fn load_sentences(path: &Path) -> std::io::Result<(Vec<Sentence>, usize)> {
    let mut sentences = Vec::new();
    let mut skipped = 0;
    for parsed in read_sentences(path)? {
        match parsed {
            Ok(sentence) => sentences.push(sentence),
            Err(error) => {
                warn!("skipping malformed sentence: {error}");
                skipped += 1;
            }
        }
    }
    Ok((sentences, skipped))
}

impl<R: BufRead> Iterator for SentenceReader<R> {
    type Item = Result<Sentence, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut block: Vec<(usize, String)> = Vec::new();
            loop {
                match self.lines.next() {
                    Some(Ok(line)) => {
                        self.line_no += 1;
                        // BOM can only appear on the very first line
                        let line = if self.line_no == 1 {
                            line.strip_prefix('\u{feff}').unwrap_or(&line).to_string()
                        } else {
                            line
                        };
                        if line.trim().is_empty() {
                            if block.is_empty() {
                                continue;
                            }
                            break;
                        }
                        block.push((self.line_no, line));
                    }
                    Some(Err(error)) => {
                        // a sentence cut off mid-block must not be emitted as
                        // a shorter, well-formed one
                        if block.is_empty() {
                            warn!("{}: read error, stopping: {error}", self.path);
                        } else {
                            warn!(
                                "{}: read error, stopping and discarding a partial sentence: {error}",
                                self.path
                            );
                            block.clear();
                        }
                        self.done = true;
                        break;
                    }
                    None => {
                        self.done = true;
                        break;
                    }
                }
            }
            if block.is_empty() {
                if self.done {
                    return None;
                }
                continue;
            }
            self.sentence_no += 1;
            match parse_block(&block, &self.path, self.sentence_no) {
                Ok(Some(sentence)) => return Some(Ok(sentence)),
                Ok(None) => continue, // comments only
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

fn parse_block(
    block: &[(usize, String)],
    path: &str,
    sentence_no: usize,
) -> Result<Option<Sentence>, ParseError> {
    let mut id = None;
    let mut tokens: Vec<Token> = Vec::new();
    let mut heads: Vec<(usize, Option<usize>)> = Vec::new(); // (line, 1-based head)
    let mut multiword = Vec::new();

    for (line_no, line) in block {
        if let Some(comment) = line.strip_prefix('#') {
            if let Some((key, value)) = comment.split_once('=') {
                if key.trim() == "sent_id" {
                    id = Some(value.trim().to_string());
                }
            }
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < CONLLU_FIELDS {
            return Err(ParseError::TooFewFields {
                path: path.to_string(),
                line: *line_no,
                found: fields.len(),
                expected: CONLLU_FIELDS,
            });
        }
        let id_field = fields[0];
        if id_field.contains('-') {
            let Some((start, end)) = id_field.split_once('-') else {
                unreachable!()
            };
            let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) else {
                return Err(ParseError::InvalidMultiwordRange {
                    path: path.to_string(),
                    line: *line_no,
                    range: id_field.to_string(),
                });
            };
            multiword.push(MultiwordSpan {
                start,
                end,
                form: fields[1].to_string(),
            });
            continue;
        }
        if id_field.contains('.') {
            // empty node in the enhanced representation, not part of the
            // surface sentence
            continue;
        }
        let token_id: usize = id_field.parse().map_err(|_| ParseError::InvalidTokenId {
            path: path.to_string(),
            line: *line_no,
            id: id_field.to_string(),
        })?;
        if token_id != tokens.len() + 1 {
            return Err(ParseError::InvalidTokenId {
                path: path.to_string(),
                line: *line_no,
                id: id_field.to_string(),
            });
        }
        let head: usize = fields[6].parse().map_err(|_| ParseError::InvalidHead {
            path: path.to_string(),
            line: *line_no,
            head: fields[6].to_string(),
        })?;
        heads.push((*line_no, if head == 0 { None } else { Some(head) }));
        tokens.push(Token {
            form: fields[1].to_string(),
            lemma: fields[2].to_string(),
            upos: PartOfSpeech::from_ud(fields[3]),
            head: None, // filled in after the range check below
            deprel: fields[7].to_string(),
            feats: schema::bundle_from_ud_feats(fields[5]),
        });
    }

    if tokens.is_empty() {
        return Ok(None);
    }

    // heads can only be validated once the whole sentence is read
    let len = tokens.len();
    for (token, (line_no, head)) in tokens.iter_mut().zip(heads) {
        if let Some(head) = head {
            if head > len {
                return Err(ParseError::HeadOutOfRange {
                    path: path.to_string(),
                    line: line_no,
                    head,
                    len,
                });
            }
            token.head = Some(head - 1);
        }
    }

    let id = id.unwrap_or_else(|| format!("{path}#{sentence_no}"));
    Ok(Some(Sentence {
        id,
        tokens,
        multiword,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    fn parse_str(text: &str) -> Vec<Result<Sentence, ParseError>> {
        SentenceReader::new(Cursor::new(text.to_string()), "test.conllu").collect()
    }

    const DOGS_RUN: &str = "\
# sent_id = en-1
1\tThe\tthe\tDET\t_\tDefinite=Def\t2\tdet\t_\t_
2\tdogs\tdog\tNOUN\t_\tNumber=Plur\t3\tnsubj\t_\t_
3\trun\trun\tVERB\t_\tNumber=Plur|Person=3\t0\troot\t_\t_
4\t.\t.\tPUNCT\t_\t_\t3\tpunct\t_\t_
";

    #[test]
    fn test_parse_simple_sentence() {
        let sentences = parse_str(DOGS_RUN);
        assert_eq!(sentences.len(), 1);
        let sentence = sentences[0].as_ref().unwrap();
        assert_eq!(sentence.id, "en-1");
        assert_eq!(sentence.len(), 4);
        assert_eq!(sentence.tokens[1].form, "dogs");
        assert_eq!(sentence.tokens[1].upos, Some(PartOfSpeech::Noun));
        assert_eq!(sentence.tokens[1].head, Some(2));
        assert_eq!(sentence.tokens[1].deprel, "nsubj");
        assert_eq!(sentence.tokens[2].head, None); // root
    }

    #[test]
    fn test_multiword_and_empty_nodes() {
        let text = "\
1-2\tdu\t_\t_\t_\t_\t_\t_\t_\t_
1\tde\tde\tADP\t_\t_\t3\tcase\t_\t_
2\tle\tle\tDET\t_\tNumber=Sing\t3\tdet\t_\t_
2.1\telided\telide\tVERB\t_\t_\t_\t_\t_\t_
3\tchien\tchien\tNOUN\t_\tGender=Masc|Number=Sing\t0\troot\t_\t_
";
        let sentences = parse_str(text);
        assert_eq!(sentences.len(), 1);
        let sentence = sentences[0].as_ref().unwrap();
        assert_eq!(sentence.len(), 3);
        assert_eq!(
            sentence.multiword,
            vec![MultiwordSpan {
                start: 1,
                end: 2,
                form: "du".to_string()
            }]
        );
    }

    #[test]
    fn test_head_out_of_range_is_parse_error() {
        let text = "\
1\tdogs\tdog\tNOUN\t_\t_\t7\tnsubj\t_\t_
2\trun\trun\tVERB\t_\t_\t0\troot\t_\t_
";
        let sentences = parse_str(text);
        assert_eq!(sentences.len(), 1);
        assert!(matches!(
            sentences[0],
            Err(ParseError::HeadOutOfRange { head: 7, len: 2, .. })
        ));
    }

    #[test]
    fn test_one_malformed_sentence_among_ten() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..10 {
            if i == 4 {
                // row with too few fields
                writeln!(file, "1\tbroken\trow").unwrap();
            } else {
                writeln!(file, "# sent_id = s{i}").unwrap();
                writeln!(file, "1\tdogs\tdog\tNOUN\t_\tNumber=Plur\t2\tnsubj\t_\t_").unwrap();
                writeln!(file, "2\trun\trun\tVERB\t_\tNumber=Plur\t0\troot\t_\t_").unwrap();
            }
            writeln!(file).unwrap();
        }
        let (sentences, skipped) = load_sentences(file.path()).unwrap();
        assert_eq!(sentences.len(), 9);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_partial_sentence_before_read_error_is_discarded() {
        struct FailingReader;
        impl std::io::Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk error"))
            }
        }

        // one complete sentence, then a block cut off by the read error
        let text = "\
# sent_id = s1
1\tdogs\tdog\tNOUN\t_\tNumber=Plur\t2\tnsubj\t_\t_
2\trun\trun\tVERB\t_\tNumber=Plur\t0\troot\t_\t_

1\tdogs\tdog\tNOUN\t_\tNumber=Plur\t2\tnsubj\t_\t_
";
        let reader = BufReader::new(std::io::Read::chain(
            Cursor::new(text.to_string()),
            FailingReader,
        ));
        let sentences: Vec<_> = SentenceReader::new(reader, "test.conllu").collect();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].as_ref().unwrap().id, "s1");
    }

    #[test]
    fn test_comment_only_block_is_not_a_sentence() {
        let sentences = parse_str("# newdoc id = x\n\n");
        assert!(sentences.is_empty());
    }
}
