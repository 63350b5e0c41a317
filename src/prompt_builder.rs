//! Instruction strings for each artifact kind.
//!
//! Every template pins the exact line layout the response parser expects, so a
//! change here has to be mirrored in `response_parser`.

use crate::models::{ArtifactKind, GenerationRequest};

/// How the model is asked to shape its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Text,
    Json,
}

pub const SYSTEM_INSTRUCTION: &str = "You are an expert teacher who writes accurate, well-structured study material. \
Follow the requested output format exactly and do not add commentary before or after it.";

pub const JSON_SYSTEM_INSTRUCTION: &str = "You are an expert teacher who writes accurate, well-structured study material. \
Always respond with valid JSON in the requested format and nothing else.";

pub fn system_instruction(mode: ResponseMode) -> &'static str {
    match mode {
        ResponseMode::Text => SYSTEM_INSTRUCTION,
        ResponseMode::Json => JSON_SYSTEM_INSTRUCTION,
    }
}

pub fn build_prompt(request: &GenerationRequest, kind: ArtifactKind, mode: ResponseMode) -> String {
    let header = request_header(request, kind);
    let body = match (kind, mode) {
        (ArtifactKind::StudyGuide, _) => study_guide_template(request),
        (kind, ResponseMode::Text) => text_template(kind, request.count),
        (kind, ResponseMode::Json) => json_template(kind, request.count),
    };
    format!("{}\n\n{}", header, body)
}

fn request_header(request: &GenerationRequest, kind: ArtifactKind) -> String {
    let topic = request.topic.trim();
    let mut header = match kind {
        ArtifactKind::MultipleChoice => format!(
            "Create {} multiple-choice questions about \"{}\" at {} difficulty.",
            request.count, topic, request.difficulty
        ),
        ArtifactKind::TrueFalse => format!(
            "Create {} true/false statements about \"{}\" at {} difficulty. Mix true and false statements.",
            request.count, topic, request.difficulty
        ),
        ArtifactKind::FillBlank => format!(
            "Create {} fill-in-the-blank sentences about \"{}\" at {} difficulty. \
Each sentence has exactly one blank written as _____ and the missing answer is 1-3 words.",
            request.count, topic, request.difficulty
        ),
        ArtifactKind::Flashcard => format!(
            "Create {} flashcards about \"{}\" at {} difficulty. \
The front holds a key term or question, the back a concise definition or answer.",
            request.count, topic, request.difficulty
        ),
        ArtifactKind::StudyGuide => format!(
            "Write a study guide about \"{}\" for a learner at {} difficulty.",
            topic, request.difficulty
        ),
    };

    if let Some(subject) = non_blank(&request.subject) {
        header.push_str(&format!("\nSubject: {}", subject));
    }
    if let Some(grade_level) = non_blank(&request.grade_level) {
        header.push_str(&format!("\nGrade level: {}", grade_level));
    }
    header
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn text_template(kind: ArtifactKind, count: usize) -> String {
    match kind {
        ArtifactKind::MultipleChoice => format!(
            r#"Use EXACTLY this format for every question, numbered Q1 to Q{count}:

Q1: [Question text]
A) [Option A]
B) [Option B]
C) [Option C]
D) [Option D]
Correct Answer: [A, B, C, or D]

Rules:
- Exactly four options per question, each on its own line
- The "Correct Answer:" line contains only the letter
- Leave one blank line between questions"#
        ),
        ArtifactKind::TrueFalse => format!(
            r#"Use EXACTLY this format for every statement, numbered Q1 to Q{count}:

Q1: [Statement]
Answer: [True or False]

Rules:
- The "Answer:" line contains only the word True or False
- Leave one blank line between statements"#
        ),
        ArtifactKind::FillBlank => format!(
            r#"Use EXACTLY this format for every sentence, numbered Q1 to Q{count}:

Q1: [Sentence containing _____ where the answer belongs]
Answer: [missing word or phrase]

Rules:
- Exactly one _____ per sentence
- The answer is 1-3 words
- Leave one blank line between sentences"#
        ),
        ArtifactKind::Flashcard => format!(
            r#"Use EXACTLY this format for every card, numbered CARD 1 to CARD {count}:

CARD 1
Front: [Term or question]
Back: [Definition or answer]

Rules:
- Keep each side under 40 words
- Leave one blank line between cards"#
        ),
        ArtifactKind::StudyGuide => String::new(),
    }
}

fn json_template(kind: ArtifactKind, count: usize) -> String {
    let schema = match kind {
        ArtifactKind::MultipleChoice => {
            r#"{
  "questions": [
    {
      "question": "Question text",
      "options": {"A": "Option A", "B": "Option B", "C": "Option C", "D": "Option D"},
      "correct_answer": "B"
    }
  ]
}"#
        }
        ArtifactKind::TrueFalse => {
            r#"{
  "questions": [
    {"statement": "Statement text", "answer": true}
  ]
}"#
        }
        ArtifactKind::FillBlank => {
            r#"{
  "questions": [
    {"sentence": "Sentence with _____ in it", "answer": "missing word"}
  ]
}"#
        }
        ArtifactKind::Flashcard => {
            r#"{
  "flashcards": [
    {"front": "Term", "back": "Definition"}
  ]
}"#
        }
        ArtifactKind::StudyGuide => "",
    };

    format!(
        "Respond with a JSON object in this exact format containing {} entries:\n{}\n\nDo not wrap the JSON in markdown code fences.",
        count, schema
    )
}

fn study_guide_template(request: &GenerationRequest) -> String {
    format!(
        r#"Use markdown with EXACTLY these sections:

## Overview
[2-3 sentences introducing {topic}]

## Key Concepts
[Bullet list of the most important ideas, one line each]

## Important Terms
[Bullet list in the form "- **Term**: definition"]

## Summary
[A short paragraph tying the concepts together]"#,
        topic = request.topic.trim()
    )
}
