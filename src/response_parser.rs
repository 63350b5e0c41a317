//! Turns model output into validated study records.
//!
//! Text mode splits the reply into numbered blocks and scans each block line by
//! line. JSON mode decodes the whole document and validates each item on its
//! own. In both modes a malformed record is dropped and the rest survive.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::llm_providers::JsonResponseParser;
use crate::log_parse_result;
use crate::models::{
    ArtifactKind, FillBlankQuestion, Flashcard, GuideSection, MultipleChoiceQuestion, OptionLetter, QuizQuestion,
    QuizType, RecordError, StudyGuide, TrueFalseQuestion, BLANK_MARKER,
};

static QUESTION_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:\*\*)?[ \t]*(?:Q(?:uestion)?[ \t]*)?\d+[ \t]*[:.)](?:\*\*)?(?:[ \t]+|$)")
        .expect("valid question delimiter regex")
});

static CARD_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:\*\*)?[ \t]*(?:CARD|Flashcard)[ \t]*#?[ \t]*\d+[ \t]*[:.)\-]?(?:\*\*)?[ \t]*")
        .expect("valid card delimiter regex")
});

static LETTER_ANSWER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:\*\*)?[ \t]*(?:correct[ \t]+answer|answer|correct)[ \t]*(?:\*\*)?[ \t]*[:\-][ \t]*(?:\*\*)?[ \t]*\(?(?:((?-i:[A-D]))\b|((?-i:[a-d]))(?:[).:]|(?:\*\*)?[ \t]*$))",
    )
    .expect("valid letter answer regex")
});

static TEXT_ANSWER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?[ \t]*(?:correct[ \t]+)?answer[ \t]*(?:\*\*)?[ \t]*[:\-][ \t]*(.+)$")
        .expect("valid text answer regex")
});

static BARE_BOOLEAN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[(\[*_ \t]*(true|false)[)\]*_. \t]*$").expect("valid bare boolean regex")
});

static TRAILING_BOOLEAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[ \t]*[(\[](?:\*\*)?[ \t]*(true|false)[ \t]*(?:\*\*)?[)\]][ \t.]*$")
        .expect("valid trailing boolean regex")
});

static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?\(?([A-D])[ \t]*[).:\-](?:\*\*)?[ \t]*(\S.*)$").expect("valid option regex")
});

static OPTION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?[A-Da-d][).:][ \t]+").expect("valid option prefix regex"));

static LEADING_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?([A-Da-d])\b").expect("valid leading letter regex"));

static TRUE_FALSE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:true[ \t]+or[ \t]+false|t/f)[ \t]*[:\-?][ \t]*").expect("valid true/false prefix regex")
});

static INLINE_ANSWER_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]+)\]|\*\*([^*\n]+)\*\*|__([^_\n]+)__").expect("valid inline span regex")
});

static FRONT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?[ \t]*(?:front|term)[ \t]*(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(.*)$")
        .expect("valid front regex")
});

static BACK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\*\*)?[ \t]*(?:back|definition)[ \t]*(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(.*)$")
        .expect("valid back regex")
});

/// Document-level failure in JSON mode; the caller may re-issue the call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    Decode(String),

    #[error("JSON response holds no list of records")]
    MissingList,
}

/// Scanner position inside one question block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    CollectingQuestion,
    CollectingOptions,
}

/// Splits on a delimiter pattern. Text before the first delimiter is dropped;
/// text with no delimiter at all is treated as a single block.
fn split_blocks<'a>(text: &'a str, delimiter: &Regex) -> Vec<&'a str> {
    let matches: Vec<(usize, usize)> = delimiter.find_iter(text).map(|m| (m.start(), m.end())).collect();
    if matches.is_empty() {
        return vec![text];
    }

    matches
        .iter()
        .enumerate()
        .map(|(i, &(_, end))| {
            let next = matches.get(i + 1).map(|&(start, _)| start).unwrap_or(text.len());
            &text[end..next]
        })
        .collect()
}

fn content_lines(block: &str) -> impl Iterator<Item = &str> {
    block.lines().map(clean_line).filter(|line| !line.is_empty())
}

fn clean_line(line: &str) -> &str {
    let line = line.trim();
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .map(str::trim_start)
        .unwrap_or(line)
}

fn clean_text(text: &str) -> String {
    text.replace("**", "").trim().to_string()
}

fn keep_valid<T>(kind: ArtifactKind, results: impl IntoIterator<Item = Result<T, RecordError>>) -> Vec<T> {
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(record) => Some(record),
            Err(e) => {
                log_parse_result!(dropped, kind = kind, error = e);
                None
            }
        })
        .collect()
}

fn parse_multiple_choice_block(block: &str) -> Result<MultipleChoiceQuestion, RecordError> {
    let mut state = ScanState::CollectingQuestion;
    let mut question: Vec<String> = Vec::new();
    let mut options: BTreeMap<OptionLetter, String> = BTreeMap::new();
    let mut correct: Option<OptionLetter> = None;

    for (index, line) in content_lines(block).enumerate() {
        // The first line of a block always belongs to the question, so a
        // question opening with "A. Smith ..." is not taken for an option.
        if index == 0 {
            question.push(clean_text(line));
            continue;
        }

        if let Some(caps) = LETTER_ANSWER_LINE.captures(line) {
            if correct.is_none() {
                correct = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .and_then(|m| m.as_str().chars().next())
                    .and_then(OptionLetter::from_char);
            }
            continue;
        }

        if let Some(caps) = OPTION_LINE.captures(line) {
            if let Some(letter) = caps[1].chars().next().and_then(OptionLetter::from_char) {
                options.entry(letter).or_insert_with(|| clean_text(&caps[2]));
            }
            state = ScanState::CollectingOptions;
            continue;
        }

        if state == ScanState::CollectingQuestion && correct.is_none() {
            question.push(clean_text(line));
        }
    }

    let correct = correct.ok_or(RecordError::Empty("correct answer"))?;
    MultipleChoiceQuestion::new(question.join(" "), options, correct)
}

fn parse_true_false_block(block: &str) -> Result<TrueFalseQuestion, RecordError> {
    let mut statement: Vec<String> = Vec::new();
    let mut answer: Option<String> = None;

    for line in content_lines(block) {
        if answer.is_some() {
            break;
        }
        if let Some(caps) = TEXT_ANSWER_LINE.captures(line) {
            answer = Some(caps[1].to_string());
        } else if !statement.is_empty() && BARE_BOOLEAN_LINE.is_match(line) {
            answer = Some(line.to_string());
        } else {
            statement.push(clean_text(line));
        }
    }

    let mut statement = statement.join(" ");
    if answer.is_none() {
        // "The moon is a planet. (False)"
        if let Some(caps) = TRAILING_BOOLEAN.captures(&statement) {
            answer = Some(caps[1].to_string());
            let start = caps.get(0).map_or(statement.len(), |m| m.start());
            statement.truncate(start);
        }
    }

    let answer = answer.ok_or(RecordError::Empty("answer"))?;
    let statement = TRUE_FALSE_PREFIX.replace(statement.trim(), "").to_string();
    TrueFalseQuestion::from_answer_text(statement, &answer)
}

fn strip_answer_decorations(answer: &str) -> String {
    answer
        .trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '*' | '_' | '"' | '\'' | '`' | '.'))
        .trim()
        .to_string()
}

fn parse_fill_blank_block(block: &str) -> Result<FillBlankQuestion, RecordError> {
    let mut sentence: Vec<String> = Vec::new();
    let mut answer: Option<String> = None;

    for line in content_lines(block) {
        if let Some(caps) = TEXT_ANSWER_LINE.captures(line) {
            if answer.is_none() {
                answer = Some(strip_answer_decorations(&caps[1]));
            }
            continue;
        }
        if answer.is_none() {
            sentence.push(line.trim().to_string());
        }
    }

    let sentence = sentence.join(" ");
    match answer {
        Some(answer) => FillBlankQuestion::new(sentence.replace("**", ""), answer),
        None => inline_fill_blank(&sentence),
    }
}

/// "The capital of France is [Paris]." carries its own answer
fn inline_fill_blank(sentence: &str) -> Result<FillBlankQuestion, RecordError> {
    let spans: Vec<regex::Captures> = INLINE_ANSWER_SPAN.captures_iter(sentence).collect();
    if spans.len() != 1 {
        return Err(RecordError::Empty("answer"));
    }
    let span = &spans[0];
    let whole = span.get(0).map(|m| m.range()).ok_or(RecordError::Empty("answer"))?;
    let answer = (1..=3)
        .find_map(|group| span.get(group))
        .map(|m| m.as_str().to_string())
        .ok_or(RecordError::Empty("answer"))?;

    let mut blanked = String::with_capacity(sentence.len());
    blanked.push_str(&sentence[..whole.start]);
    blanked.push_str(BLANK_MARKER);
    blanked.push_str(&sentence[whole.end..]);
    FillBlankQuestion::new(blanked, answer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardField {
    None,
    Front,
    Back,
}

fn parse_flashcard_block(block: &str) -> Vec<Result<Flashcard, RecordError>> {
    let mut cards = Vec::new();
    let mut field = CardField::None;
    let mut front: Vec<String> = Vec::new();
    let mut back: Vec<String> = Vec::new();

    for line in content_lines(block) {
        if let Some(caps) = FRONT_LINE.captures(line) {
            if !front.is_empty() && !back.is_empty() {
                cards.push(Flashcard::new(front.join(" "), back.join(" ")));
                back.clear();
            }
            front.clear();
            front.push(clean_text(&caps[1]));
            field = CardField::Front;
            continue;
        }
        if let Some(caps) = BACK_LINE.captures(line) {
            back.clear();
            back.push(clean_text(&caps[1]));
            field = CardField::Back;
            continue;
        }
        match field {
            CardField::Front => front.push(clean_text(line)),
            CardField::Back => back.push(clean_text(line)),
            CardField::None => {}
        }
    }

    cards.push(Flashcard::new(front.join(" "), back.join(" ")));
    cards
}

pub fn parse_multiple_choice(text: &str) -> Vec<MultipleChoiceQuestion> {
    let blocks = split_blocks(text, &QUESTION_DELIMITER);
    keep_valid(
        ArtifactKind::MultipleChoice,
        blocks.into_iter().map(parse_multiple_choice_block),
    )
}

pub fn parse_true_false(text: &str) -> Vec<TrueFalseQuestion> {
    let blocks = split_blocks(text, &QUESTION_DELIMITER);
    keep_valid(ArtifactKind::TrueFalse, blocks.into_iter().map(parse_true_false_block))
}

pub fn parse_fill_blank(text: &str) -> Vec<FillBlankQuestion> {
    let blocks = split_blocks(text, &QUESTION_DELIMITER);
    keep_valid(ArtifactKind::FillBlank, blocks.into_iter().map(parse_fill_blank_block))
}

pub fn parse_flashcards(text: &str) -> Vec<Flashcard> {
    let blocks = split_blocks(text, &CARD_DELIMITER);
    keep_valid(
        ArtifactKind::Flashcard,
        blocks.into_iter().flat_map(parse_flashcard_block),
    )
}

pub fn parse_quiz_text(quiz_type: QuizType, text: &str) -> Vec<QuizQuestion> {
    match quiz_type {
        QuizType::MultipleChoice => parse_multiple_choice(text)
            .into_iter()
            .map(QuizQuestion::MultipleChoice)
            .collect(),
        QuizType::TrueFalse => parse_true_false(text).into_iter().map(QuizQuestion::TrueFalse).collect(),
        QuizType::FillBlank => parse_fill_blank(text).into_iter().map(QuizQuestion::FillBlank).collect(),
    }
}

/// Markdown study guide split on headings. Rejected when shorter than `min_chars`.
pub fn parse_study_guide(topic: &str, text: &str, min_chars: usize) -> Option<StudyGuide> {
    let content = JsonResponseParser::strip_code_fences(text).to_string();
    if content.chars().count() <= min_chars {
        return None;
    }

    let mut sections: Vec<GuideSection> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            if let Some((heading, body)) = current.take() {
                sections.push(GuideSection {
                    heading,
                    body: body.join("\n").trim().to_string(),
                });
            }
            let heading = trimmed.trim_start_matches('#').trim().replace("**", "");
            current = Some((heading, Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((heading, body)) = current {
        sections.push(GuideSection {
            heading,
            body: body.join("\n").trim().to_string(),
        });
    }

    Some(StudyGuide {
        topic: topic.trim().to_string(),
        content,
        sections,
    })
}

// ----------------------------------------------------------------------------
// JSON mode
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonOptions {
    Keyed(BTreeMap<String, String>),
    Listed(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct JsonMultipleChoice {
    #[serde(alias = "prompt")]
    question: String,
    options: JsonOptions,
    #[serde(alias = "correct", alias = "answer")]
    correct_answer: Value,
}

#[derive(Debug, Deserialize)]
struct JsonTrueFalse {
    #[serde(alias = "question")]
    statement: String,
    #[serde(alias = "correct_answer")]
    answer: Value,
}

#[derive(Debug, Deserialize)]
struct JsonFillBlank {
    #[serde(alias = "question")]
    sentence: String,
    #[serde(alias = "correct_answer")]
    answer: String,
}

#[derive(Debug, Deserialize)]
struct JsonFlashcard {
    #[serde(alias = "term", alias = "question")]
    front: String,
    #[serde(alias = "definition", alias = "answer")]
    back: String,
}

const LIST_KEYS: [&str; 4] = ["questions", "flashcards", "cards", "items"];

fn decode_items(text: &str) -> Result<Vec<Value>, ParseError> {
    let document: Value = JsonResponseParser
        .parse_json_response(text)
        .map_err(|e| ParseError::Decode(e.to_string()))?;

    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => LIST_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or(ParseError::MissingList),
        _ => Err(ParseError::MissingList),
    }
}

fn decode_item<T: serde::de::DeserializeOwned>(item: Value) -> Result<T, RecordError> {
    serde_json::from_value(item).map_err(|_| RecordError::Empty("required field"))
}

fn resolve_correct_letter(value: &Value, options: &BTreeMap<OptionLetter, String>) -> Option<OptionLetter> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            options
                .iter()
                .find(|(_, text)| text.eq_ignore_ascii_case(s))
                .map(|(letter, _)| *letter)
                .or_else(|| {
                    LEADING_LETTER
                        .captures(s)
                        .and_then(|caps| caps[1].chars().next())
                        .and_then(OptionLetter::from_char)
                })
        }
        Value::Number(n) => n.as_u64().and_then(|i| OptionLetter::from_index(i as usize)),
        _ => None,
    }
}

fn multiple_choice_from_json(item: Value) -> Result<MultipleChoiceQuestion, RecordError> {
    let raw: JsonMultipleChoice = decode_item(item)?;
    let options: BTreeMap<OptionLetter, String> = match raw.options {
        JsonOptions::Keyed(map) => map
            .into_iter()
            .filter_map(|(key, text)| {
                let letter = key.trim().chars().next().and_then(OptionLetter::from_char)?;
                Some((letter, text))
            })
            .collect(),
        JsonOptions::Listed(list) => list
            .into_iter()
            .enumerate()
            .filter_map(|(i, text)| {
                let letter = OptionLetter::from_index(i)?;
                Some((letter, OPTION_PREFIX.replace(text.trim(), "").to_string()))
            })
            .collect(),
    };
    let correct = resolve_correct_letter(&raw.correct_answer, &options).ok_or(RecordError::Empty("correct answer"))?;
    MultipleChoiceQuestion::new(raw.question, options, correct)
}

fn true_false_from_json(item: Value) -> Result<TrueFalseQuestion, RecordError> {
    let raw: JsonTrueFalse = decode_item(item)?;
    match raw.answer {
        Value::Bool(answer) => TrueFalseQuestion::new(raw.statement, answer),
        Value::String(text) => TrueFalseQuestion::from_answer_text(raw.statement, &text),
        other => Err(RecordError::AmbiguousBoolean(other.to_string())),
    }
}

fn fill_blank_from_json(item: Value) -> Result<FillBlankQuestion, RecordError> {
    let raw: JsonFillBlank = decode_item(item)?;
    FillBlankQuestion::new(raw.sentence, strip_answer_decorations(&raw.answer))
}

fn flashcard_from_json(item: Value) -> Result<Flashcard, RecordError> {
    let raw: JsonFlashcard = decode_item(item)?;
    Flashcard::new(raw.front, raw.back)
}

pub fn parse_quiz_json(quiz_type: QuizType, text: &str) -> Result<Vec<QuizQuestion>, ParseError> {
    let items = decode_items(text)?;
    let kind = quiz_type.artifact_kind();
    Ok(match quiz_type {
        QuizType::MultipleChoice => keep_valid(kind, items.into_iter().map(multiple_choice_from_json))
            .into_iter()
            .map(QuizQuestion::MultipleChoice)
            .collect(),
        QuizType::TrueFalse => keep_valid(kind, items.into_iter().map(true_false_from_json))
            .into_iter()
            .map(QuizQuestion::TrueFalse)
            .collect(),
        QuizType::FillBlank => keep_valid(kind, items.into_iter().map(fill_blank_from_json))
            .into_iter()
            .map(QuizQuestion::FillBlank)
            .collect(),
    })
}

pub fn parse_flashcards_json(text: &str) -> Result<Vec<Flashcard>, ParseError> {
    let items = decode_items(text)?;
    Ok(keep_valid(ArtifactKind::Flashcard, items.into_iter().map(flashcard_from_json)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_blocks_drops_preamble() {
        let text = "Here are your questions:\nQ1: First?\nQ2. Second?\n3) Third?";
        let blocks = split_blocks(text, &QUESTION_DELIMITER);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].starts_with("First?"));
        assert!(blocks[1].starts_with("Second?"));
        assert!(blocks[2].starts_with("Third?"));
    }

    #[test]
    fn test_split_blocks_without_delimiter_is_one_block() {
        let blocks = split_blocks("Front: a\nBack: b", &CARD_DELIMITER);
        assert_eq!(blocks, vec!["Front: a\nBack: b"]);
    }

    #[test]
    fn test_decimal_numbers_are_not_delimiters() {
        let text = "Q1: How much is 2.5 plus 1?\n2.5 is a decimal.\nA) 3.5\nB) 4\nCorrect Answer: A";
        let blocks = split_blocks(text, &QUESTION_DELIMITER);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_answer_line_wins_over_option_line() {
        let block = "Which is largest?\nA) Mouse\nB) Whale\nAnswer: B";
        let q = parse_multiple_choice_block(block).unwrap();
        assert_eq!(q.correct, OptionLetter::B);
        assert_eq!(q.options.len(), 2);
    }

    #[test]
    fn test_continuation_lines_join_question_until_first_option() {
        let block = "Consider a plant cell.\nWhich organelle captures light?\nA) Chloroplast\nB) Ribosome\nThis line is ignored\nCorrect Answer: A";
        let q = parse_multiple_choice_block(block).unwrap();
        assert_eq!(q.question, "Consider a plant cell. Which organelle captures light?");
        assert_eq!(q.options[&OptionLetter::A], "Chloroplast");
    }

    #[test]
    fn test_duplicate_option_letter_keeps_first() {
        let block = "Pick one\nA) First\nA) Second\nB) Third\nCorrect Answer: A";
        let q = parse_multiple_choice_block(block).unwrap();
        assert_eq!(q.options[&OptionLetter::A], "First");
    }

    #[test]
    fn test_bold_markup_is_tolerated() {
        let text = "**Q1:** What gas do plants absorb?\n**A)** Oxygen\n**B)** Carbon dioxide\n**Correct Answer:** B";
        let questions = parse_multiple_choice(text);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "What gas do plants absorb?");
        assert_eq!(questions[0].correct, OptionLetter::B);
    }

    #[test]
    fn test_true_false_prefix_is_stripped() {
        let q = parse_true_false_block("True or False: The sun is a star.\nAnswer: True").unwrap();
        assert_eq!(q.statement, "The sun is a star.");
        assert!(q.answer);
    }

    #[test]
    fn test_inline_fill_blank_span() {
        let q = parse_fill_blank_block("The capital of France is [Paris].").unwrap();
        assert_eq!(q.sentence, "The capital of France is _____.");
        assert_eq!(q.answer, "Paris");

        let q = parse_fill_blank_block("Water boils at **100 degrees** Celsius.").unwrap();
        assert_eq!(q.answer, "100 degrees");
    }

    #[test]
    fn test_fill_blank_answer_decorations_are_stripped() {
        let q = parse_fill_blank_block("Plants make food by _____.\nAnswer: **[photosynthesis]**").unwrap();
        assert_eq!(q.answer, "photosynthesis");
    }

    #[test]
    fn test_flashcard_multi_line_back() {
        let cards = parse_flashcard_block("Front: Osmosis\nBack: Movement of water\nacross a membrane");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].as_ref().unwrap().back, "Movement of water across a membrane");
    }

    #[test]
    fn test_study_guide_sections() {
        let text = "```markdown\n## Overview\nPhotosynthesis converts light into chemical energy.\n\n## Key Concepts\n- Chlorophyll absorbs light\n- Glucose is produced\n```";
        let guide = parse_study_guide("Photosynthesis", text, 50).unwrap();
        assert_eq!(guide.sections.len(), 2);
        assert_eq!(guide.sections[0].heading, "Overview");
        assert!(guide.sections[1].body.contains("Glucose"));
        assert!(!guide.content.contains("```"));

        assert!(parse_study_guide("x", "## Tiny", 50).is_none());
    }

    #[test]
    fn test_resolve_correct_letter_variants() {
        let options: BTreeMap<OptionLetter, String> = [
            (OptionLetter::A, "Nucleus".to_string()),
            (OptionLetter::B, "Mitochondria".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(resolve_correct_letter(&Value::from("B"), &options), Some(OptionLetter::B));
        assert_eq!(resolve_correct_letter(&Value::from("b) Mitochondria"), &options), Some(OptionLetter::B));
        assert_eq!(resolve_correct_letter(&Value::from("mitochondria"), &options), Some(OptionLetter::B));
        assert_eq!(resolve_correct_letter(&Value::from(0), &options), Some(OptionLetter::A));
        assert_eq!(resolve_correct_letter(&Value::from("Golgi"), &options), None);
    }
}
