//! Exam questions command implementation.

use crate::cli::{preflight, Output, QuestionsAction};
use crate::config::Settings;
use crate::exam::{Extraction, QuestionPipeline};
use anyhow::Result;

/// Run the questions command.
pub async fn run_questions(action: &QuestionsAction, settings: Settings) -> Result<()> {
    match action {
        QuestionsAction::InitDb => {
            let pipeline = QuestionPipeline::new(settings)?;
            pipeline.init_database()?;
            Output::success(&format!(
                "Database ready at {}",
                pipeline.settings().database_path().display()
            ));
        }

        QuestionsAction::Extract { pdf } => {
            if !pdf.exists() {
                anyhow::bail!("PDF not found: {}", pdf.display());
            }
            preflight::check_models(&[&settings.models.extraction])?;
            preflight::check_embeddings()?;

            let pipeline = QuestionPipeline::new(settings)?.with_progress(true);
            let spinner = Output::spinner(&format!("Reading {}", pdf.display()));
            let report = pipeline.extract_questions(pdf).await;
            spinner.finish_and_clear();

            let report = report?;
            match &report.extraction {
                Extraction::Questions(questions) => {
                    Output::success(&format!(
                        "Extracted {} questions ({} parts)",
                        questions.questions.len(),
                        questions.part_count()
                    ));
                    Output::kv("Stored rows", &report.stored_ids.len().to_string());
                    Output::kv(
                        "Total questions",
                        &pipeline.question_store().count()?.to_string(),
                    );
                }
                Extraction::Failed(_) => {
                    Output::warning("No suitable questions found in the document.");
                }
            }
        }

        QuestionsAction::Retrieve { query } => {
            preflight::check_models(&[&settings.models.retrieval])?;
            preflight::check_embeddings()?;

            let pipeline = QuestionPipeline::new(settings)?;
            let spinner = Output::spinner("Retrieving questions...");
            let result = pipeline.retrieve_questions(query).await;
            spinner.finish_and_clear();

            let result = result?;
            Output::header(&format!("Questions for: {}", query));
            if result.questions.is_empty() {
                Output::warning("No matching questions.");
            }
            for question in &result.questions {
                Output::question(question, None);
            }
        }

        QuestionsAction::Search { query } => {
            preflight::check_embeddings()?;

            let pipeline = QuestionPipeline::new(settings)?;
            let hits = pipeline.search(query).await?;
            if hits.is_empty() {
                Output::warning("No results. Run `cookbook questions extract` first.");
                return Ok(());
            }
            Output::header(&format!("{} results", hits.len()));
            for hit in &hits {
                Output::question(&hit.question, Some(hit.score));
            }
        }
    }

    Ok(())
}
