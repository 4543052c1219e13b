//! End-to-end pipeline runs over in-memory and file-backed page sources,
//! with deterministic embedding and LLM doubles.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use gapfinder_core::{Error, GapFinderConfig, Result, Verdict};
use gapfinder_infer::{EmbedderBackend, SemanticScorer, VaderSentiment};
use gapfinder_ingest::{JsonlPages, LayoutPages, PageLayout, TextBlock, TextPages};
use gapfinder_llm::{generate_report, GenerationRequest, LlmClient, LlmError};
use gapfinder_runtime::{GapPipeline, RunResults, RunSummary, ScoringMode, Verb};
use ndarray::{array, Array1};

/// Texts mentioning "remains" or "unexplored" point one way, everything
/// else the other; "partly" sits in between.
struct TopicEmbedder;

impl EmbedderBackend for TopicEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("remains") || t.contains("unexplored") {
                    array![1.0f32, 0.0]
                } else if t.contains("partly") {
                    array![0.6f32, 0.8]
                } else {
                    array![0.0f32, 1.0]
                }
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        2
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct ScriptedLlm {
    responses: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<std::result::Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl LlmClient for ScriptedLlm {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("no scripted response".into())))
    }
}

const OPEN_QUESTION: &str = "Despite decades of work, the long-term effect of canopy loss on soil \
     carbon remains poorly understood in boreal forests.";
const UNEXPLORED: &str = "The interaction between grazing pressure and seed dispersal is largely \
     unexplored in semi-arid grasslands of South America.";
const PARTIAL: &str = "Earlier field campaigns partly addressed nutrient cycling, but only for a \
     single season and at two sites in the northern range.";
const METHODS: &str = "Samples were collected monthly from twelve plots and analysed with a \
     standard elemental analyser following the usual protocol.";

fn semantic_pipeline(threshold: f32, top_k: usize) -> GapPipeline {
    let config = GapFinderConfig {
        similarity_threshold: threshold,
        top_k,
        anchor_phrases: vec!["The question remains open.".into()],
        ..Default::default()
    };
    let scorer = SemanticScorer::new(Arc::new(TopicEmbedder), &config.anchor_phrases).unwrap();
    GapPipeline::new(config).unwrap().with_semantic(scorer)
}

fn document() -> String {
    format!("{METHODS}\n\n{PARTIAL}\u{000C}{OPEN_QUESTION}\n\nTable 1 ....... 12\n\n{UNEXPLORED}")
}

#[test]
fn test_cross_page_limitation_is_merged_once() {
    let text = "Background on the study area is given here.\n\nOne important limita-\u{000C}tion \
                concerns the methodology used in earlier surveys.\n\nResults follow.";
    let pipeline = GapPipeline::new(GapFinderConfig::default())
        .unwrap()
        .with_sentiment(Box::new(VaderSentiment::new()));

    let results = pipeline.scan(TextPages::new(text), None).unwrap();

    assert_eq!(results.len(), 1);
    let merged = &results[0];
    assert!(merged.paragraph.contains("limitation"));
    assert!(merged.paragraph.contains("methodology"));
    // "limita-" alone does not match, so the continuation page owns it.
    assert_eq!(merged.page, 2);
    assert!((-1.0..=1.0).contains(&merged.score));
}

#[test]
fn test_semantic_selection_respects_threshold_and_top_k() {
    let pipeline = semantic_pipeline(0.5, 2);
    let results = pipeline.rank(TextPages::new(document()), None).unwrap();

    assert!(results.len() <= 2);
    assert!(results.iter().all(|r| r.score >= 0.5));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    // Ties keep document order; the table of contents line is never scored.
    assert_eq!(results[0].paragraph, OPEN_QUESTION);
    assert_eq!(results[1].paragraph, UNEXPLORED);
    assert!(results.iter().all(|r| !r.paragraph.contains("Table 1")));
}

#[test]
fn test_semantic_with_nothing_scorable_is_empty() {
    let pipeline = semantic_pipeline(0.5, 5);
    let results = pipeline.rank(TextPages::new("Too short.\u{000C}Also short."), None).unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_verify_then_report() {
    let pipeline = semantic_pipeline(0.5, 10);
    let verdicts = serde_json::json!([
        {"index": 0, "verdict": "confirmed_gap", "reason": "Open question",
         "evidence_quote": "remains poorly understood"},
        {"index": 1, "verdict": "confirmed_gap", "reason": "Unstudied interaction",
         "evidence_quote": "a quote the model invented"},
        {"index": 2, "verdict": "false_positive", "reason": "Background",
         "evidence_quote": "partly addressed nutrient cycling"},
    ]);
    let llm = ScriptedLlm::new(vec![
        Ok(format!("```json\n{}\n```", verdicts)),
        Ok("# Research Gap Report\n\nSoil carbon.".into()),
    ]);

    let ranked = pipeline.rank(TextPages::new(document()), None).unwrap();
    let verified = pipeline.verify(&llm, ranked, None).await;
    assert_eq!(verified.len(), 3);
    assert_eq!(verified[0].verdict, Verdict::ConfirmedGap);
    assert_eq!(verified[1].verdict, Verdict::Uncertain);
    assert_eq!(verified[2].verdict, Verdict::FalsePositive);
    for v in &verified {
        if v.verdict != Verdict::Uncertain {
            assert!(!v.evidence_quote.is_empty());
            assert!(v.candidate.paragraph.contains(&v.evidence_quote));
        }
    }

    let report = generate_report(&llm, &verified, &[], &pipeline.batch_settings(), None)
        .await
        .unwrap();
    assert!(report.starts_with("# Research Gap Report"));
    assert_eq!(llm.calls(), 2);
    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[1].contains("remains poorly understood"));
    assert!(!prompts[1].contains("a quote the model invented"));
}

#[tokio::test]
async fn test_annotate_with_every_batch_failing_is_an_error() {
    let pipeline = semantic_pipeline(0.5, 10);
    let llm = ScriptedLlm::new(vec![Err(LlmError::Api {
        status: 401,
        body: "invalid key".into(),
    })]);
    let ranked = pipeline.rank(TextPages::new(document()), None).unwrap();
    let result = pipeline.annotate(&llm, ranked, None).await;
    match result {
        Err(Error::Llm(msg)) => assert!(msg.contains("401")),
        other => panic!("expected LLM error, got {:?}", other),
    }
}

#[test]
fn test_jsonl_document_run_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paper.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    let pages = [
        (1, format!("DOI 10.5555/gap2024 {OPEN_QUESTION}")),
        (2, UNEXPLORED.to_string()),
    ];
    for (n, body) in pages {
        let record = serde_json::json!({
            "page_number": n,
            "body_text": body,
            "leading_block": body,
            "trailing_block": body,
        });
        writeln!(file, "{}", record).unwrap();
    }

    let pipeline = semantic_pipeline(0.5, 10);
    let (results, digest) = pipeline
        .run_document(ScoringMode::Semantic, JsonlPages::open(&path).unwrap(), None)
        .unwrap();

    let summary = RunSummary::new("paper.jsonl", &digest, Verb::Rank, RunResults::Scored(results));
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.doi.as_deref(), Some("10.5555/gap2024"));
    assert_eq!(summary.results.len(), 2);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["mode"], "rank");
    assert!(json["results"][0]["score"].is_number());
}

#[test]
fn test_jsonl_failure_fails_the_document() {
    let input = format!(
        "{}\nnot a page record\n",
        serde_json::json!({"page_number": 1, "body_text": UNEXPLORED})
    );
    let pipeline = semantic_pipeline(0.5, 10);
    let result = pipeline.run_document(
        ScoringMode::Semantic,
        JsonlPages::new(input.as_bytes()),
        None,
    );
    match result {
        Err(Error::Extraction(msg)) => assert!(msg.starts_with("line 2")),
        other => panic!("expected extraction error, got {:?}", other.map(|(r, _)| r)),
    }
}

fn block(x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> TextBlock {
    TextBlock {
        x0,
        y0,
        x1,
        y1,
        text: text.into(),
    }
}

#[test]
fn test_two_column_layout_document() {
    // The right column of page 1 ends mid-sentence and resumes at the top of page 2.
    let page1 = PageLayout {
        width: 600.0,
        height: 800.0,
        blocks: vec![
            block(50.0, 20.0, 550.0, 40.0, "Journal of Field Ecology 12 (2024)"),
            block(40.0, 100.0, 280.0, 400.0, METHODS),
            block(320.0, 420.0, 560.0, 720.0, "Despite decades of work, the long-term effect of canopy"),
        ],
    };
    let page2 = PageLayout {
        width: 600.0,
        height: 800.0,
        blocks: vec![
            block(40.0, 90.0, 280.0, 200.0, "loss on soil carbon remains poorly understood in boreal forests."),
            block(40.0, 300.0, 280.0, 600.0, PARTIAL),
            block(290.0, 770.0, 310.0, 790.0, "2"),
        ],
    };
    let input = format!(
        "{}\n{}\n",
        serde_json::to_string(&page1).unwrap(),
        serde_json::to_string(&page2).unwrap()
    );

    let pipeline = semantic_pipeline(0.9, 10);
    let (results, digest) = pipeline
        .run_document(ScoringMode::Semantic, LayoutPages::new(input.as_bytes()), None)
        .unwrap();

    assert_eq!(digest.page_count(), 2);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].paragraph, OPEN_QUESTION);
    assert_eq!(results[0].page, 2);
}
