//! Exam question extraction and retrieval.

mod model;
mod pdf;
mod pipeline;
mod store;

pub use model::{
    ExamQuestion, Extraction, Failed, QuestionPart, Questions, RetrievedQuestion,
    RetrievedQuestions, ScoredQuestion,
};
pub use pdf::{extract_pdf_text, read_pdf_bytes};
pub use pipeline::{ExtractionReport, QuestionIndex, QuestionPipeline};
pub use store::{NewQuestionRow, QuestionStore};
