//! End-to-end workflow tests with scripted model and conversion backends
//!
//! These tests drive `WorkflowController::run` over a real temp directory
//! without any network access.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use thesis2code::document::{
    ConvertedContent, DocumentSource, IngestTier, MockConversionService, MockLocalExtractor,
    TaskStatus,
};
use thesis2code::llm::{
    BackendError, LLMClient, LLMRequest, LLMResponse, MockLLMClient, MockResponse, ModelClient,
    RetryPolicy,
};
use thesis2code::pipeline::{
    Phase, PipelineConfig, PipelineContext, RunOutcome, RunRequest, WorkflowController,
};
use tokio_util::sync::CancellationToken;

const THESIS: &str = r#"# Forecasting Urban Water Demand

## Abstract
We forecast daily water demand with gradient boosting.

## Method
Features are built from weather and calendar data.
"#;

fn fast_model(client: Arc<dyn LLMClient>) -> ModelClient {
    ModelClient::new(client).with_retry_policy(RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(1),
    })
}

/// Analyzer answers in call order: structure, classify, decompose, stack
fn scripted_analyzer() -> Arc<MockLLMClient> {
    let mock = Arc::new(MockLLMClient::with_name("analyzer"));
    mock.add_responses(vec![
        MockResponse::text(
            r#"```json
{"title": "Forecasting Urban Water Demand", "abstract": "We forecast daily water demand.",
 "keywords": ["forecasting", "water"], "chapters": {"Method": "features"}, "tables": []}
```"#,
        ),
        MockResponse::text(
            r#"{"type": "data_analysis", "method": "gradient boosting", "summary": "Demand forecasting", "key_techniques": []}"#,
        ),
        MockResponse::text(
            r#"{"tasks": [
                {"task_type": "visualization", "title": "Plot Forecast", "description": "plot", "priority": 2},
                {"task_type": "data_preprocessing", "title": "Load Data", "description": "load", "priority": 1},
                {"task_type": "model_training", "title": "Train Model", "description": "fit", "priority": 2}
            ]}"#,
        ),
        MockResponse::text(
            r#"{"tech_stack": ["Python 3.10"], "libraries": ["pandas", "scikit-learn", " pandas "]}"#,
        ),
    ]);
    mock
}

fn field<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    text[start..].lines().next().map(str::trim)
}

fn generated(code: &str, file_name: &str, dependencies: Value) -> MockResponse {
    MockResponse::with_tool_calls(
        "",
        vec![MockLLMClient::generate_code_call(
            "call",
            json!({
                "code": code,
                "file_name": file_name,
                "description": format!("{} module", file_name),
                "dependencies": dependencies,
            }),
        )],
    )
}

/// Generates one module per task; "Train Model" comes back broken and is
/// repaired on the first fix request
fn coder_handler(request: &LLMRequest) -> MockResponse {
    let text = request.user_text();
    if text.starts_with("Fix the errors") {
        return MockResponse::text(
            "```python\ndef main():\n    \"\"\"Train.\"\"\"\n    print('trained')\n```",
        );
    }
    match field(&text, "- title: ") {
        Some("Load Data") => generated(
            "import pandas as pd\n\ndef main():\n    \"\"\"Load.\"\"\"\n    return pd.DataFrame()\n",
            "load_data.py",
            json!(["pandas"]),
        ),
        Some("Plot Forecast") => generated(
            "def main():\n    \"\"\"Plot.\"\"\"\n    pass\n",
            "plot_forecast.py",
            json!(["matplotlib"]),
        ),
        Some("Train Model") => generated(
            "def main():\n    print('trained'\n",
            "train_model.py",
            json!("[\"scikit-learn\", \"numpy\"]"),
        ),
        _ => generated(
            "import load_data\n\ndef main():\n    \"\"\"Run all.\"\"\"\n    load_data.main()\n\nif __name__ == '__main__':\n    main()\n",
            "runner.py",
            json!([]),
        ),
    }
}

fn write_thesis(dir: &Path) -> PathBuf {
    let path = dir.join("thesis.md");
    fs::write(&path, THESIS).unwrap();
    path
}

fn context(
    analyzer: Arc<dyn LLMClient>,
    coder: Arc<dyn LLMClient>,
    config: PipelineConfig,
) -> PipelineContext {
    PipelineContext::new(
        fast_model(analyzer),
        fast_model(coder),
        Arc::new(MockConversionService::new()),
        Arc::new(MockLocalExtractor::failing()),
        config,
    )
}

fn completed(outcome: RunOutcome) -> thesis2code::CompletedRun {
    match outcome {
        RunOutcome::Completed(run) => run,
        RunOutcome::Aborted { phase, reason, .. } => {
            panic!("run aborted during {}: {}", phase, reason)
        }
    }
}

#[tokio::test]
async fn test_full_run_writes_project() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let thesis = write_thesis(input.path());
    let data_dir = input.path().join("data");
    fs::create_dir(&data_dir).unwrap();
    fs::write(data_dir.join("demand.csv"), "day,liters\n1,100\n2,120\n").unwrap();

    let coder = Arc::new(MockLLMClient::with_handler(coder_handler));
    let controller = WorkflowController::new(context(
        scripted_analyzer(),
        coder.clone(),
        PipelineConfig::new().with_concurrency(2),
    ));

    let request = RunRequest::new(DocumentSource::classify(thesis.to_str().unwrap()), output.path())
        .with_data_dir(Some(data_dir))
        .with_archive(true);
    let run = completed(controller.run(request, CancellationToken::new()).await.unwrap());

    assert_eq!(run.ingest_tier, IngestTier::Direct);
    assert!(run.failed_tasks.is_empty());

    let files = run.bundle.file_names();
    assert_eq!(
        files,
        vec!["load_data.py", "plot_forecast.py", "train_model.py", "main.py"]
    );

    assert_eq!(
        run.bundle.requirements,
        vec!["matplotlib", "numpy", "pandas", "scikit-learn"]
    );

    let train = run.bundle.file("train_model.py").unwrap();
    assert!(train.code.contains("print('trained')"));
    let outcome = run
        .bundle
        .validation
        .iter()
        .find(|v| v.file_name == "train_model.py")
        .unwrap();
    assert!(outcome.is_valid);
    assert_eq!(outcome.repair_attempts, 1);
    assert!(run.bundle.validation.iter().all(|v| v.is_valid));

    let work_dir = &run.work_dir;
    assert!(work_dir.starts_with(output.path()));
    for name in [
        "load_data.py",
        "plot_forecast.py",
        "train_model.py",
        "main.py",
        "requirements.txt",
        "README.md",
        "RUN_INSTRUCTIONS.md",
        "analysis_result.json",
        "thesis.md",
        "demand.csv",
    ] {
        assert!(work_dir.join(name).is_file(), "missing {}", name);
    }

    let requirements = fs::read_to_string(work_dir.join("requirements.txt")).unwrap();
    assert_eq!(requirements.trim_end(), "matplotlib\nnumpy\npandas\nscikit-learn");

    let readme = fs::read_to_string(work_dir.join("README.md")).unwrap();
    assert!(readme.starts_with("# Forecasting Urban Water Demand\n"));
    let about = readme.find("## About").unwrap();
    let install = readme.find("## Install").unwrap();
    let modules = readme.find("## Modules").unwrap();
    assert!(about < install && install < modules);

    let analysis: Value =
        serde_json::from_str(&fs::read_to_string(work_dir.join("analysis_result.json")).unwrap())
            .unwrap();
    assert_eq!(analysis["thesis_type"], "data_analysis");
    assert_eq!(analysis["data_source"], "csv_file");
    assert_eq!(analysis["code_tasks"].as_array().unwrap().len(), 3);

    let archive = run.archive.unwrap();
    assert!(archive.is_file());
    assert!(archive.to_string_lossy().ends_with(".tar.gz"));

    // three tasks, the integration file and one repair
    assert_eq!(coder.request_count(), 5);
}

#[tokio::test]
async fn test_dropped_task_is_reported() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let thesis = write_thesis(input.path());

    let coder = Arc::new(MockLLMClient::with_handler(|request: &LLMRequest| {
        let text = request.user_text();
        if field(&text, "- title: ") == Some("Plot Forecast") {
            return MockResponse::text("I would rather not.");
        }
        coder_handler(request)
    }));
    let controller = WorkflowController::new(context(
        scripted_analyzer(),
        coder,
        PipelineConfig::new(),
    ));

    let request = RunRequest::new(DocumentSource::classify(thesis.to_str().unwrap()), output.path());
    let run = completed(controller.run(request, CancellationToken::new()).await.unwrap());

    assert_eq!(run.failed_tasks.len(), 1);
    assert!(!run.bundle.file_names().contains(&"plot_forecast.py"));
    assert!(run.archive.is_none());
}

#[tokio::test]
async fn test_unusable_file_names_fall_back_to_task_defaults() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let thesis = write_thesis(input.path());

    let coder = Arc::new(MockLLMClient::with_handler(|request: &LLMRequest| {
        let text = request.user_text();
        match field(&text, "- title: ") {
            Some("Load Data") => generated(
                "def main():\n    \"\"\"Load.\"\"\"\n    pass\n",
                "/app/load_data.py",
                json!([]),
            ),
            Some("Plot Forecast") => generated(
                "def main():\n    \"\"\"Plot.\"\"\"\n    pass\n",
                "../plot_forecast.py",
                json!([]),
            ),
            Some("Train Model") => generated(
                "def main():\n    \"\"\"Train.\"\"\"\n    pass\n",
                "README.md",
                json!([]),
            ),
            _ => generated(
                "def main():\n    \"\"\"Run all.\"\"\"\n    pass\n\nif __name__ == '__main__':\n    main()\n",
                "runner.py",
                json!([]),
            ),
        }
    }));
    let controller = WorkflowController::new(context(
        scripted_analyzer(),
        coder,
        PipelineConfig::new(),
    ));

    let request = RunRequest::new(DocumentSource::classify(thesis.to_str().unwrap()), output.path());
    let run = completed(controller.run(request, CancellationToken::new()).await.unwrap());

    assert!(run.failed_tasks.is_empty());
    assert_eq!(
        run.bundle.file_names(),
        vec![
            "data_preprocessing.py",
            "visualization.py",
            "model_training.py",
            "main.py"
        ]
    );
    for name in ["data_preprocessing.py", "visualization.py", "model_training.py"] {
        assert!(run.work_dir.join(name).is_file(), "missing {}", name);
    }
    let readme = fs::read_to_string(run.work_dir.join("README.md")).unwrap();
    assert!(readme.starts_with("# Forecasting Urban Water Demand\n"));
    assert!(!output.path().join("plot_forecast.py").exists());
}

/// Model client that never answers in time
struct StalledClient;

#[async_trait]
impl LLMClient for StalledClient {
    async fn chat(&self, _request: LLMRequest) -> Result<LLMResponse, BackendError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(LLMResponse::text("{}", Duration::from_secs(30)))
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

#[tokio::test]
async fn test_deadline_aborts_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let thesis = write_thesis(input.path());

    let controller = WorkflowController::new(context(
        Arc::new(StalledClient),
        Arc::new(StalledClient),
        PipelineConfig::new().with_deadline(Some(Duration::from_millis(200))),
    ));

    let request = RunRequest::new(DocumentSource::classify(thesis.to_str().unwrap()), output.path());
    let started = std::time::Instant::now();
    let outcome = controller.run(request, CancellationToken::new()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    match outcome {
        RunOutcome::Aborted { phase, reason, .. } => {
            assert_eq!(phase, Phase::Ingest);
            assert!(reason.contains("ingest"));
        }
        RunOutcome::Completed(_) => panic!("expected the deadline to abort the run"),
    }
}

#[tokio::test]
async fn test_cancel_during_synthesis_keeps_analysis() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let thesis = write_thesis(input.path());

    let controller = WorkflowController::new(context(
        scripted_analyzer(),
        Arc::new(StalledClient),
        PipelineConfig::new(),
    ));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let request = RunRequest::new(DocumentSource::classify(thesis.to_str().unwrap()), output.path());
    let outcome = controller.run(request, cancel).await.unwrap();

    let run_id = match outcome {
        RunOutcome::Aborted { run_id, phase, .. } => {
            assert_eq!(phase, Phase::Synthesize);
            run_id
        }
        RunOutcome::Completed(_) => panic!("expected cancellation"),
    };

    let work_dir = output.path().join(run_id);
    assert!(work_dir.join("analysis_result.json").is_file());
    assert!(!work_dir.join("main.py").exists());
}

#[tokio::test]
async fn test_remote_document_uses_conversion_service() {
    let output = TempDir::new().unwrap();
    let conversion = Arc::new(MockConversionService::new());
    conversion.add_submit(Ok("task-1".to_string()));
    conversion.add_status(Ok(TaskStatus::Processing));
    conversion.add_status(Ok(TaskStatus::Completed(ConvertedContent::Locator(
        "https://files.example.org/task-1.md".to_string(),
    ))));
    conversion.add_document("https://files.example.org/task-1.md", THESIS);

    let coder = Arc::new(MockLLMClient::with_handler(coder_handler));
    let controller = WorkflowController::new(PipelineContext::new(
        fast_model(scripted_analyzer()),
        fast_model(coder),
        conversion.clone(),
        Arc::new(MockLocalExtractor::failing()),
        PipelineConfig::new().with_polling(Duration::from_millis(5), Duration::from_secs(5)),
    ));

    let request = RunRequest::new(
        DocumentSource::classify("https://example.org/thesis.pdf"),
        output.path(),
    );
    let run = completed(controller.run(request, CancellationToken::new()).await.unwrap());

    assert_eq!(run.ingest_tier, IngestTier::Remote);
    assert_eq!(conversion.calls().len(), 4);
    let stored = fs::read_to_string(run.work_dir.join("thesis.md")).unwrap();
    assert!(stored.contains("Urban Water Demand"));
}
