//! Exam question data model and the JSON schemas sent to the model.

use crate::agent::StructuredOutput;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A sub-part of a question, e.g. (a) or (b).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPart {
    #[serde(default)]
    pub part_label: Option<String>,
    pub content: String,
    #[serde(default)]
    pub marks: Option<i64>,
}

/// A full question (Q1, Q2, ...) with its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub question_number: String,
    pub parts: Vec<QuestionPart>,
}

/// Every question found in an exam paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questions {
    pub questions: Vec<ExamQuestion>,
}

impl Questions {
    pub fn part_count(&self) -> usize {
        self.questions.iter().map(|q| q.parts.len()).sum()
    }
}

/// Unable to find a suitable question in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Failed {}

/// Outcome of an extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extraction {
    Questions(Questions),
    Failed(Failed),
}

/// A question part as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedQuestion {
    pub id: i64,
    pub question_number: String,
    #[serde(default)]
    pub question_part: Option<String>,
    pub question: String,
    #[serde(default)]
    pub marks: Option<i64>,
}

/// A stored question with its similarity to a search query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredQuestion {
    pub question: RetrievedQuestion,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedQuestions {
    pub questions: Vec<RetrievedQuestion>,
}

fn question_part_schema() -> Value {
    json!({
        "type": "object",
        "description": "A sub-part of a question (e.g., (a), (b))",
        "properties": {
            "part_label": {
                "type": ["string", "null"],
                "description": "E.g., '(a)', '(b)'"
            },
            "content": {
                "type": "string",
                "description": "The question text, including any math equations"
            },
            "marks": {
                "type": ["integer", "null"],
                "description": "Marks allocated (if specified)"
            }
        },
        "required": ["content"]
    })
}

fn questions_schema() -> Value {
    json!({
        "type": "object",
        "description": "All questions found in the exam paper",
        "properties": {
            "questions": {
                "type": "array",
                "description": "All questions",
                "items": {
                    "type": "object",
                    "description": "A full question (e.g., Q1, Q2) with its parts",
                    "properties": {
                        "question_number": {
                            "type": "string",
                            "description": "E.g., '1', '17'"
                        },
                        "parts": {
                            "type": "array",
                            "description": "List of sub-questions",
                            "items": question_part_schema()
                        }
                    },
                    "required": ["question_number", "parts"]
                }
            }
        },
        "required": ["questions"]
    })
}

impl StructuredOutput for Questions {
    fn description() -> Option<&'static str> {
        Some("All questions in the exam paper")
    }

    fn json_schema() -> Value {
        questions_schema()
    }
}

impl StructuredOutput for Extraction {
    fn description() -> Option<&'static str> {
        Some("The extracted questions, or an empty object if none were found")
    }

    fn json_schema() -> Value {
        json!({
            "anyOf": [
                questions_schema(),
                {
                    "type": "object",
                    "description": "Unable to find a suitable question in the document",
                    "properties": {},
                    "additionalProperties": false
                }
            ]
        })
    }
}

impl StructuredOutput for RetrievedQuestions {
    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "description": "List of retrieved questions",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "integer", "description": "The id of the question"},
                            "question_number": {"type": "string", "description": "E.g., '1', '17'"},
                            "question_part": {"type": ["string", "null"], "description": "E.g., '(a)', '(b)'"},
                            "question": {
                                "type": "string",
                                "description": "The question text, including any math equations"
                            },
                            "marks": {"type": ["integer", "null"], "description": "Marks allocated (if specified)"}
                        },
                        "required": ["id", "question_number", "question"]
                    }
                }
            },
            "required": ["questions"]
        })
    }
}
