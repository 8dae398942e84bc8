//! Question pipeline: extract questions from a paper, index them, retrieve them.
//!
//! Extracted question parts are stored twice: as rows in the relational
//! question store, and as vectors keyed by the row id in the vector store.
//! Searches go through the vector store and are resolved against the rows.

use super::model::{
    ExamQuestion, Extraction, RetrievedQuestion, RetrievedQuestions, ScoredQuestion,
};
use super::pdf::extract_pdf_text;
use super::store::{NewQuestionRow, QuestionStore};
use crate::agent::{
    parse_args, Agent, AgentOutput, RunContext, RunResult, Tool, ToolError,
    ToolResult,
};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{CookbookError, Result};
use crate::model::{infer_model, ChatModel};
use crate::vector_store::{MemoryVectorStore, Metric, SqliteVectorStore, VectorRecord, VectorStore};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Embeds queries and resolves vector hits to stored questions.
#[derive(Clone)]
pub struct QuestionIndex {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    questions: Arc<QuestionStore>,
    collection: String,
    limit: usize,
}

impl QuestionIndex {
    /// Questions most similar to the query, best first.
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedQuestion>> {
        let scored = self.search_scored(query).await?;
        Ok(scored.into_iter().map(|hit| hit.question).collect())
    }

    /// Like [`QuestionIndex::search`], keeping each hit's similarity score.
    #[instrument(skip(self))]
    pub async fn search_scored(&self, query: &str) -> Result<Vec<ScoredQuestion>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self
            .vector_store
            .search(&self.collection, &vector, self.limit)
            .await?;

        let ids: Vec<i64> = hits.iter().map(|hit| hit.record.id).collect();
        let scores: HashMap<i64, f32> = hits.iter().map(|hit| (hit.record.id, hit.score)).collect();
        let questions: Vec<ScoredQuestion> = self
            .questions
            .get_by_ids(&ids)?
            .into_iter()
            .map(|question| ScoredQuestion {
                score: scores.get(&question.id).copied().unwrap_or_default(),
                question,
            })
            .collect();

        info!("Search for '{}' returned {} questions", query, questions.len());
        Ok(questions)
    }
}

#[derive(Deserialize)]
struct RetrieveArgs {
    search_query: String,
}

/// Retrieval tool: look up stored questions similar to a search query.
async fn retrieve(ctx: RunContext<QuestionIndex>, args: Value) -> ToolResult {
    let args: RetrieveArgs = parse_args(args)?;
    let questions = ctx.deps.search(&args.search_query).await?;
    serde_json::to_string(&questions).map_err(|e| ToolError::Failed(e.to_string()))
}

fn retrieve_tool() -> Tool<QuestionIndex> {
    Tool::new(
        "retrieve",
        "Retrieve exam questions similar to the search query.",
        retrieve,
    )
    .with_parameters(serde_json::json!({
        "type": "object",
        "properties": {
            "search_query": {
                "type": "string",
                "description": "The search query"
            }
        },
        "required": ["search_query"]
    }))
}

/// What an extraction run produced.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub extraction: Extraction,
    /// Relational ids of the stored question parts.
    pub stored_ids: Vec<i64>,
}

/// The exam question pipeline.
pub struct QuestionPipeline {
    settings: Settings,
    prompts: Prompts,
    index: QuestionIndex,
    extraction_model: Arc<dyn ChatModel>,
    retrieval_model: Arc<dyn ChatModel>,
    show_progress: bool,
}

impl QuestionPipeline {
    /// Create a pipeline from configuration.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "sqlite" => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            "memory" => Arc::new(MemoryVectorStore::new()),
            other => {
                return Err(CookbookError::Config(format!(
                    "Unknown vector store provider: {}",
                    other
                )))
            }
        };

        let questions = Arc::new(QuestionStore::open(&settings.database_path())?);

        let pipeline = Self::with_components(settings, prompts, embedder, vector_store, questions)?;
        Ok(pipeline)
    }

    /// Create a pipeline with custom components. Models come from the settings
    /// until replaced with [`QuestionPipeline::with_models`].
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        questions: Arc<QuestionStore>,
    ) -> Result<Self> {
        let extraction_model = infer_model(&settings.models.extraction)?;
        let retrieval_model = infer_model(&settings.models.retrieval)?;

        let index = QuestionIndex {
            embedder,
            vector_store,
            questions,
            collection: settings.vector_store.collection.clone(),
            limit: settings.vector_store.search_limit,
        };

        Ok(Self {
            settings,
            prompts,
            index,
            extraction_model,
            retrieval_model,
            show_progress: true,
        })
    }

    /// Replace the extraction and retrieval models.
    pub fn with_models(mut self, extraction: Arc<dyn ChatModel>, retrieval: Arc<dyn ChatModel>) -> Self {
        self.extraction_model = extraction;
        self.retrieval_model = retrieval;
        self
    }

    /// Show or hide the embedding progress bar.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn question_store(&self) -> &QuestionStore {
        &self.index.questions
    }

    /// Create the relational tables.
    pub fn init_database(&self) -> Result<()> {
        self.index.questions.create_tables()
    }

    /// Extract questions from a PDF and index them.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn extract_questions(&self, path: &Path) -> Result<ExtractionReport> {
        info!("Extracting questions from {}", path.display());

        let document = extract_pdf_text(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.extract_from_text(&file_name, &document).await
    }

    /// Extract questions from document text and index them.
    pub async fn extract_from_text(&self, file_name: &str, document: &str) -> Result<ExtractionReport> {
        let agent: Agent<(), Extraction> = Agent::new(Arc::clone(&self.extraction_model))
            .with_system_prompt(&self.prompts.extraction.system)
            .with_max_iterations(self.settings.agent.max_iterations);

        let vars = HashMap::from([
            ("file_name".to_string(), file_name.to_string()),
            ("document".to_string(), document.to_string()),
        ]);
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.extraction.user, &vars);

        let result = self.with_timeout(agent.run(&prompt, ())).await?;

        let stored_ids = match &result.output {
            Extraction::Questions(questions) => self.load_data(&questions.questions).await?,
            Extraction::Failed(_) => {
                warn!("No questions found in {}", file_name);
                Vec::new()
            }
        };

        Ok(ExtractionReport {
            extraction: result.output,
            stored_ids,
        })
    }

    /// Replace the collection with embeddings of the given questions and store
    /// their parts. Returns the relational ids of the stored parts.
    #[instrument(skip(self, questions), fields(count = questions.len()))]
    pub async fn load_data(&self, questions: &[ExamQuestion]) -> Result<Vec<i64>> {
        let index = &self.index;
        let collection = index.collection.as_str();
        let metric: Metric = self.settings.vector_store.metric.parse()?;

        if index.vector_store.has_collection(collection).await? {
            index.vector_store.drop_collection(collection).await?;
        }
        index
            .vector_store
            .create_collection(collection, index.embedder.dimensions(), metric)
            .await?;

        let parts: Vec<_> = questions
            .iter()
            .flat_map(|q| q.parts.iter().map(move |part| (q, part)))
            .collect();

        let pb = self.progress_bar(parts.len() as u64);
        let mut vectors = Vec::with_capacity(parts.len());
        for (_, part) in &parts {
            vectors.push(index.embedder.embed(&part.content).await?);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let exam = &self.settings.exam;
        let rows: Vec<NewQuestionRow> = parts
            .iter()
            .map(|(question, part)| NewQuestionRow {
                exam_name: exam.exam_name.clone(),
                subject: exam.subject.clone(),
                year: exam.year.clone(),
                question_number: question.question_number.clone(),
                part_label: part.part_label.clone(),
                content: part.content.clone(),
                marks: part.marks,
            })
            .collect();

        index.questions.create_tables()?;
        let ids = index.questions.insert_parts(&rows)?;

        let records: Vec<VectorRecord> = ids
            .iter()
            .zip(parts.iter().zip(vectors))
            .map(|(id, ((question, part), vector))| VectorRecord {
                id: *id,
                vector,
                question_number: question.question_number.clone(),
                question_part: part.part_label.clone(),
                question: part.content.clone(),
                marks: part.marks,
            })
            .collect();

        index.vector_store.insert(collection, &records).await?;

        info!("Loaded {} question parts into {}", ids.len(), collection);
        Ok(ids)
    }

    /// Vector search for questions similar to the query.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredQuestion>> {
        self.index.search_scored(query).await
    }

    /// Let the retrieval agent look up and relay questions for the query.
    #[instrument(skip(self))]
    pub async fn retrieve_questions(&self, query: &str) -> Result<RetrievedQuestions> {
        let agent: Agent<QuestionIndex, RetrievedQuestions> =
            Agent::new(Arc::clone(&self.retrieval_model))
                .with_system_prompt(&self.prompts.retrieval.system)
                .with_tool(retrieve_tool())
                .with_max_iterations(self.settings.agent.max_iterations);

        let result = self
            .with_timeout(agent.run(query, self.index.clone()))
            .await?;
        Ok(result.output)
    }

    async fn with_timeout<O: AgentOutput>(
        &self,
        run: impl Future<Output = Result<RunResult<O>>>,
    ) -> Result<RunResult<O>> {
        let seconds = self.settings.agent.timeout_seconds;
        tokio::time::timeout(Duration::from_secs(seconds), run)
            .await
            .map_err(|_| CookbookError::Agent(format!("Agent run timed out after {}s", seconds)))?
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Creating embeddings [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    }
}
