//! End-to-end pipeline tests with scripted generator and recording executor.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use heron::error::GENERIC_FAILURE_MESSAGE;
use heron::executor::{DatabaseError, QueryExecutor, QueryResult, Value};
use heron::inference::{GenerateOptions, InferenceError, TextGenerator};
use heron::pipeline::NO_ROWS_MESSAGE;
use heron::retrieval::WeightedRetriever;
use heron::sql::Dialect;
use heron::{Answer, Pipeline, PipelineError, PipelineOptions, SchemaIndex};

const SCHEMA: &str = r#"{
    "Site": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "Name", "type": "NVARCHAR(200)", "sample_values": ["Surat", "Vapi"]},
            {"name": "ZoneId", "type": "INTEGER"}
        ]
    },
    "Zone": {
        "columns": [
            {"name": "Id", "type": "INTEGER"},
            {"name": "Name", "type": "NVARCHAR(100)"}
        ]
    },
    "Archive": {
        "columns": []
    }
}"#;

// ============================================================================
// Test doubles
// ============================================================================

enum Reply {
    Text(&'static str),
    Fail,
    Panic,
}

/// Replies from a script and records every prompt it was given.
struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<(String, GenerateOptions)>>,
}

impl ScriptedGenerator {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<(String, GenerateOptions)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, InferenceError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(text.to_string()),
            Some(Reply::Fail) | None => Err(InferenceError::Unavailable("endpoint down".into())),
            Some(Reply::Panic) => panic!("generator exploded"),
        }
    }
}

/// Returns a canned result and records every statement it was asked to run.
struct RecordingExecutor {
    result: Result<QueryResult, fn() -> DatabaseError>,
    calls: Mutex<Vec<(String, u64)>>,
}

impl RecordingExecutor {
    fn returning(result: QueryResult) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(result),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: fn() -> DatabaseError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::TSql
    }

    async fn execute(&self, sql: &str, limit: u64) -> Result<QueryResult, DatabaseError> {
        self.calls.lock().unwrap().push((sql.to_string(), limit));
        match &self.result {
            Ok(result) => Ok(result.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}

fn surat_rows() -> QueryResult {
    QueryResult::new(
        vec!["Name".into(), "ZoneId".into()],
        vec![vec![Value::from("Surat"), Value::Int(3)]],
    )
}

fn pipeline(
    generator: Arc<ScriptedGenerator>,
    executor: Arc<RecordingExecutor>,
    options: PipelineOptions,
) -> Pipeline {
    let schema = Arc::new(SchemaIndex::from_json_str(SCHEMA, 5).unwrap());
    Pipeline::new(
        schema,
        Box::new(WeightedRetriever::default()),
        generator,
        executor,
        options,
    )
}

fn options() -> PipelineOptions {
    PipelineOptions {
        row_limit: 50,
        ..PipelineOptions::default()
    }
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_question_to_table() {
    let generator = ScriptedGenerator::new(vec![Reply::Text(" Name, ZoneId FROM Site WHERE Name = 'Surat';")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator.clone(), executor.clone(), options());

    let answer = pipeline.answer("show the site named Surat").await;
    assert_eq!(answer, "Result:\n\nName  | ZoneId\n------+-------\nSurat |      3");

    assert_eq!(
        executor.calls(),
        vec![(
            "SELECT TOP 50 Name, ZoneId FROM Site WHERE Name = 'Surat'".to_string(),
            50
        )]
    );

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    let (prompt, sql_options) = &prompts[0];
    assert!(prompt.starts_with("### You are an expert SQL generator for Microsoft SQL-Server."));
    assert!(prompt.contains("-- Site(Id, Name, ZoneId)"));
    assert!(prompt.contains("-- Question: show the site named Surat"));
    assert!(prompt.ends_with("### Answer\nSELECT"));
    assert!(sql_options.is_greedy());
}

/// "sites" and "named" miss the table and column names, so only the sample
/// value selects the table.
#[tokio::test]
async fn test_sample_value_alone_selects_table() {
    let generator = ScriptedGenerator::new(vec![Reply::Text(" * FROM Site WHERE Name = 'Surat'")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator.clone(), executor.clone(), options());

    let answer = pipeline.answer("give me all sites named Surat").await;
    assert_eq!(answer, "Result:\n\nName  | ZoneId\n------+-------\nSurat |      3");

    assert_eq!(
        executor.calls(),
        vec![("SELECT TOP 50 * FROM Site WHERE Name = 'Surat'".to_string(), 50)]
    );

    let prompts = generator.prompts();
    let (prompt, _) = &prompts[0];
    assert!(prompt.contains("-- Site(Id, Name, ZoneId)"));
    assert!(!prompt.contains("-- Zone"));
    assert!(prompt.contains("-- Question: give me all sites named Surat"));
}

#[tokio::test]
async fn test_run_returns_prepared_sql() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("```sql\nSELECT DISTINCT Name FROM Zone\n```")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator, executor, options());

    match pipeline.run("list every zone name").await.unwrap() {
        Answer::Rows { sql, result } => {
            assert_eq!(sql, "SELECT DISTINCT TOP 50 Name FROM Zone");
            assert_eq!(result.len(), 1);
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_rows() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("Name FROM Site WHERE Id < 0")]);
    let executor = RecordingExecutor::returning(QueryResult::new(vec!["Name".into()], vec![]));
    let pipeline = pipeline(generator, executor, options());

    assert_eq!(pipeline.answer("show site names").await, NO_ROWS_MESSAGE);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unmappable_question() {
    let generator = ScriptedGenerator::new(vec![]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator.clone(), executor.clone(), options());

    assert!(matches!(
        pipeline.run("count the weather").await,
        Err(PipelineError::NoRelevantTables)
    ));
    assert_eq!(
        pipeline.answer("count the weather").await,
        "Sorry, I couldn't map that to any database tables."
    );
    assert!(generator.prompts().is_empty());
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_empty_question() {
    let pipeline = pipeline(
        ScriptedGenerator::new(vec![]),
        RecordingExecutor::returning(surat_rows()),
        options(),
    );
    assert!(matches!(pipeline.run("  ").await, Err(PipelineError::NoRelevantTables)));
}

#[tokio::test]
async fn test_write_never_reaches_executor() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("DELETE FROM Site WHERE Id = 1")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator, executor.clone(), options());

    let err = pipeline.run("show site 1 then delete it").await.unwrap_err();
    assert!(matches!(err, PipelineError::SqlGeneration(_)));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_select_into_never_reaches_executor() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("SELECT * INTO SiteCopy FROM Site")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator, executor.clone(), options());

    let answer = pipeline.answer("show all site rows").await;
    assert_eq!(
        answer,
        "Sorry, the generated query was not a read-only SELECT and was not run."
    );
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_injected_statement_is_cut() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("Name FROM Site; DROP TABLE Site")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator, executor.clone(), options());

    pipeline.run("list site names").await.unwrap();
    assert_eq!(executor.calls()[0].0, "SELECT TOP 50 Name FROM Site");
}

#[tokio::test]
async fn test_garbage_completion() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("I am not sure what you mean by that, sorry.")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator, executor.clone(), options());

    let answer = pipeline.answer("show site names").await;
    assert_eq!(answer, "Sorry, I couldn't generate a SQL query for that question.");
    assert!(!answer.contains("not sure"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_inference_failure() {
    let generator = ScriptedGenerator::new(vec![Reply::Fail]);
    let pipeline = pipeline(generator, RecordingExecutor::returning(surat_rows()), options());

    assert!(matches!(
        pipeline.run("show site names").await,
        Err(PipelineError::Inference(_))
    ));
}

#[tokio::test]
async fn test_database_failure_hides_details() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("Nme FROM Site")]);
    let executor = RecordingExecutor::failing(|| DatabaseError::Query("Invalid column name 'Nme'".into()));
    let pipeline = pipeline(generator, executor, options());

    let answer = pipeline.answer("show site names").await;
    assert_eq!(answer, "Sorry, the database returned an error while running the query.");
}

#[tokio::test]
async fn test_column_less_table_is_unusable() {
    let generator = ScriptedGenerator::new(vec![]);
    let pipeline = pipeline(generator.clone(), RecordingExecutor::returning(surat_rows()), options());

    assert!(matches!(
        pipeline.run("show the archive").await,
        Err(PipelineError::NoUsableSchema(_))
    ));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn test_panic_becomes_generic_message() {
    let generator = ScriptedGenerator::new(vec![Reply::Panic]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator, executor.clone(), options());

    assert_eq!(pipeline.answer("show site names").await, GENERIC_FAILURE_MESSAGE);
    assert!(executor.calls().is_empty());
}

// ============================================================================
// Chat fallback
// ============================================================================

#[tokio::test]
async fn test_small_talk_goes_to_chat() {
    let generator = ScriptedGenerator::new(vec![Reply::Text("  Hello! Ask me about your sites.\n")]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = pipeline(generator.clone(), executor.clone(), options());

    assert_eq!(pipeline.answer("hello there").await, "Hello! Ask me about your sites.");

    let prompts = generator.prompts();
    assert_eq!(prompts[0].0, "hello there");
    assert!(!prompts[0].1.is_greedy());
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_chat_fallback_disabled() {
    let generator = ScriptedGenerator::new(vec![]);
    let options = PipelineOptions {
        chat_fallback: false,
        ..options()
    };
    let pipeline = pipeline(generator.clone(), RecordingExecutor::returning(surat_rows()), options);

    assert!(matches!(
        pipeline.run("hello there").await,
        Err(PipelineError::NoRelevantTables)
    ));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn test_concurrent_questions() {
    let generator = ScriptedGenerator::new(vec![
        Reply::Text("Name FROM Site"),
        Reply::Text("Name FROM Site"),
        Reply::Text("Name FROM Site"),
    ]);
    let executor = RecordingExecutor::returning(surat_rows());
    let pipeline = Arc::new(pipeline(generator, executor.clone(), options()));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.answer("show site names").await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().starts_with("Result:"));
    }
    assert_eq!(executor.calls().len(), 3);
}
