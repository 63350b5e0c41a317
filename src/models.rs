use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Canonical blank marker used in fill-in-the-blank sentences
pub const BLANK_MARKER: &str = "_____";

static BLANK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{3,}").expect("valid blank regex"));

static TRUE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btrue\b").expect("valid true regex"));

static FALSE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfalse\b").expect("valid false regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Easy")]
    Easy,
    #[default]
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Hard")]
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The question style requested for a quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    #[default]
    MultipleChoice,
    TrueFalse,
    FillBlank,
}

impl QuizType {
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            QuizType::MultipleChoice => ArtifactKind::MultipleChoice,
            QuizType::TrueFalse => ArtifactKind::TrueFalse,
            QuizType::FillBlank => ArtifactKind::FillBlank,
        }
    }
}

/// Every kind of study artifact the generation pipeline can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    Flashcard,
    StudyGuide,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::MultipleChoice => "multiple_choice",
            ArtifactKind::TrueFalse => "true_false",
            ArtifactKind::FillBlank => "fill_blank",
            ArtifactKind::Flashcard => "flashcard",
            ArtifactKind::StudyGuide => "study_guide",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a parsed record was rejected at construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("multiple choice question needs at least 2 options, found {0}")]
    TooFewOptions(usize),

    #[error("correct answer {0} is not one of the options")]
    CorrectNotInOptions(OptionLetter),

    #[error("sentence must contain exactly one blank marker, found {0}")]
    BlankCount(usize),

    #[error("fill-in answer must be 1-3 words, found {0}")]
    AnswerWordCount(usize),

    #[error("true/false answer is ambiguous: '{0}'")]
    AmbiguousBoolean(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [OptionLetter::A, OptionLetter::B, OptionLetter::C, OptionLetter::D];

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(OptionLetter::A),
            'B' => Some(OptionLetter::B),
            'C' => Some(OptionLetter::C),
            'D' => Some(OptionLetter::D),
            _ => None,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_char(&self) -> char {
        match self {
            OptionLetter::A => 'A',
            OptionLetter::B => 'B',
            OptionLetter::C => 'C',
            OptionLetter::D => 'D',
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: BTreeMap<OptionLetter, String>,
    pub correct: OptionLetter,
}

impl MultipleChoiceQuestion {
    pub fn new(
        question: impl Into<String>,
        options: BTreeMap<OptionLetter, String>,
        correct: OptionLetter,
    ) -> Result<Self, RecordError> {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return Err(RecordError::Empty("question"));
        }

        let options: BTreeMap<OptionLetter, String> = options
            .into_iter()
            .map(|(letter, text)| (letter, text.trim().to_string()))
            .filter(|(_, text)| !text.is_empty())
            .collect();

        if options.len() < 2 {
            return Err(RecordError::TooFewOptions(options.len()));
        }
        if !options.contains_key(&correct) {
            return Err(RecordError::CorrectNotInOptions(correct));
        }

        Ok(Self { question, options, correct })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrueFalseQuestion {
    pub statement: String,
    pub answer: bool,
}

impl TrueFalseQuestion {
    pub fn new(statement: impl Into<String>, answer: bool) -> Result<Self, RecordError> {
        let statement = statement.into().trim().to_string();
        if statement.is_empty() {
            return Err(RecordError::Empty("statement"));
        }
        Ok(Self { statement, answer })
    }

    /// Build from an answer text that has to be resolved to a boolean
    pub fn from_answer_text(statement: impl Into<String>, answer_text: &str) -> Result<Self, RecordError> {
        let answer = resolve_boolean(answer_text)
            .ok_or_else(|| RecordError::AmbiguousBoolean(answer_text.trim().to_string()))?;
        Self::new(statement, answer)
    }
}

/// Resolve "true"/"false" from free text. Text holding both words or neither is ambiguous.
pub fn resolve_boolean(text: &str) -> Option<bool> {
    match (TRUE_WORD.is_match(text), FALSE_WORD.is_match(text)) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillBlankQuestion {
    pub sentence: String,
    pub answer: String,
}

impl FillBlankQuestion {
    pub fn new(sentence: impl Into<String>, answer: impl Into<String>) -> Result<Self, RecordError> {
        let sentence = sentence.into();
        let sentence = BLANK_PATTERN.replace_all(sentence.trim(), BLANK_MARKER).to_string();
        let blanks = sentence.matches(BLANK_MARKER).count();
        if blanks != 1 {
            return Err(RecordError::BlankCount(blanks));
        }

        let answer = answer.into().trim().to_string();
        if answer.is_empty() {
            return Err(RecordError::Empty("answer"));
        }
        let words = answer.split_whitespace().count();
        if !(1..=3).contains(&words) {
            return Err(RecordError::AnswerWordCount(words));
        }

        Ok(Self { sentence, answer })
    }

    /// Case-insensitive comparison on trimmed text
    pub fn accepts(&self, submitted: &str) -> bool {
        normalize_answer(&self.answer) == normalize_answer(submitted)
    }
}

pub fn normalize_answer(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

impl Flashcard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Result<Self, RecordError> {
        let front = front.into().trim().to_string();
        let back = back.into().trim().to_string();
        if front.is_empty() {
            return Err(RecordError::Empty("front"));
        }
        if back.is_empty() {
            return Err(RecordError::Empty("back"));
        }
        Ok(Self { front, back })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGuide {
    pub topic: String,
    pub content: String,
    pub sections: Vec<GuideSection>,
}

/// A user's answer to one quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Choice(OptionLetter),
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizQuestion {
    MultipleChoice(MultipleChoiceQuestion),
    TrueFalse(TrueFalseQuestion),
    FillBlank(FillBlankQuestion),
}

impl QuizQuestion {
    pub fn quiz_type(&self) -> QuizType {
        match self {
            QuizQuestion::MultipleChoice(_) => QuizType::MultipleChoice,
            QuizQuestion::TrueFalse(_) => QuizType::TrueFalse,
            QuizQuestion::FillBlank(_) => QuizType::FillBlank,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            QuizQuestion::MultipleChoice(q) => &q.question,
            QuizQuestion::TrueFalse(q) => &q.statement,
            QuizQuestion::FillBlank(q) => &q.sentence,
        }
    }

    /// Whether an answer has the shape this question expects
    pub fn accepts_kind(&self, answer: &Answer) -> bool {
        matches!(
            (self, answer),
            (QuizQuestion::MultipleChoice(_), Answer::Choice(_))
                | (QuizQuestion::TrueFalse(_), Answer::Bool(_))
                | (QuizQuestion::FillBlank(_), Answer::Text(_))
        )
    }

    pub fn is_correct(&self, answer: &Answer) -> bool {
        match (self, answer) {
            (QuizQuestion::MultipleChoice(q), Answer::Choice(letter)) => q.correct == *letter,
            (QuizQuestion::TrueFalse(q), Answer::Bool(value)) => q.answer == *value,
            (QuizQuestion::FillBlank(q), Answer::Text(text)) => q.accepts(text),
            _ => false,
        }
    }

    pub fn correct_answer(&self) -> Answer {
        match self {
            QuizQuestion::MultipleChoice(q) => Answer::Choice(q.correct),
            QuizQuestion::TrueFalse(q) => Answer::Bool(q.answer),
            QuizQuestion::FillBlank(q) => Answer::Text(q.answer.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub count: usize,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade_level: Option<String>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, difficulty: Difficulty, count: usize) -> Self {
        Self {
            topic: topic.into(),
            difficulty,
            count,
            subject: None,
            grade_level: None,
        }
    }

    /// Same topic and context with a different requested count
    pub fn with_count(&self, count: usize) -> Self {
        Self { count, ..self.clone() }
    }

    pub fn validate(&self, min_count: usize, max_count: usize) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("Topic must not be empty".to_string());
        }
        if self.count < min_count || self.count > max_count {
            return Err(format!(
                "Requested count {} is outside the allowed range {}-{}",
                self.count, min_count, max_count
            ));
        }
        Ok(())
    }
}

/// Everything one Generate action asks the pipeline for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySetRequest {
    pub request: GenerationRequest,
    #[serde(default)]
    pub quiz_type: QuizType,
    #[serde(default)]
    pub flashcard_count: Option<usize>,
    #[serde(default)]
    pub include_study_guide: bool,
}
