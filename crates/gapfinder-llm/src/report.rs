//! Markdown research-gap reports.

use std::fmt::Write as _;

use gapfinder_core::{
    notify, CommentedCandidate, PaperMetadata, Progress, VerifiedCandidate, Verdict,
};
use tracing::info;

use crate::error::LlmError;
use crate::providers::LlmClient;
use crate::retry::generate_with_retry;
use crate::types::{truncate_chars, BatchSettings, GenerationRequest};

/// Returned without calling the model when nothing was confirmed.
pub const NO_CONFIRMED_GAPS_REPORT: &str = "\
# Research Gap Report

No confirmed research gaps were found in the analyzed papers. The flagged \
paragraphs were classified as false positives or could not be verified \
against the source text.";

pub const VERIFICATION_REPORT_SYSTEM_PROMPT: &str = "\
You are an expert academic research advisor. You receive research gaps that \
were verified against the source text, each with the exact quote supporting it.

Write a research gap report that:
1. Groups the confirmed gaps by theme
2. Explains why each theme matters, citing the evidence quotes
3. Suggests specific, actionable research directions for each theme
4. Mentions the page where each gap was found

Write in clear academic English. Use Markdown formatting with headers and bullet \
points. Keep the report between 300 and 800 words.";

pub const COMMENT_REPORT_SYSTEM_PROMPT: &str = "\
You are an expert academic research advisor. Based on the paragraphs flagged as \
potential research gaps in the analyzed papers, write a concise research analysis.

The report should:
1. Identify the most promising research gaps and opportunities
2. Group related gaps by theme if applicable
3. Suggest specific research directions
4. Note which paragraphs are likely false positives (literature reviews, general statements)

Write in clear academic English. Use Markdown formatting with headers and bullet \
points. Keep the report between 150 and 300 words. Be specific and actionable.";

fn papers_section(papers: &[PaperMetadata]) -> String {
    if papers.is_empty() {
        return String::new();
    }
    let mut out = String::from("Papers analyzed:\n");
    for paper in papers {
        let title = paper.title.as_deref().unwrap_or("Unknown");
        let author = paper.author.as_deref().unwrap_or("Unknown");
        let _ = write!(out, "- {} by {}", title, author);
        if let Some(doi) = &paper.doi {
            let _ = write!(out, " (doi:{})", doi);
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Report over confirmed gaps only. Zero confirmed gaps short-circuits to
/// [`NO_CONFIRMED_GAPS_REPORT`].
pub async fn generate_report<C: LlmClient>(
    client: &C,
    verified: &[VerifiedCandidate],
    papers: &[PaperMetadata],
    settings: &BatchSettings,
    progress: Progress<'_>,
) -> Result<String, LlmError> {
    let confirmed: Vec<&VerifiedCandidate> = verified
        .iter()
        .filter(|v| v.verdict == Verdict::ConfirmedGap)
        .collect();
    if confirmed.is_empty() {
        info!("No confirmed gaps; skipping report generation");
        return Ok(NO_CONFIRMED_GAPS_REPORT.to_string());
    }

    let mut gaps = String::new();
    for (i, gap) in confirmed.iter().enumerate() {
        let _ = write!(
            gaps,
            "Gap {} (page {}, score: {:.2}):\n{}\nReason: {}\nEvidence: \"{}\"\n\n",
            i + 1,
            gap.candidate.page,
            gap.candidate.score,
            truncate_chars(&gap.candidate.paragraph, settings.paragraph_truncate),
            gap.reason,
            gap.evidence_quote
        );
    }

    let request = GenerationRequest {
        system: VERIFICATION_REPORT_SYSTEM_PROMPT.to_string(),
        prompt: format!(
            "{}Confirmed research gaps ({} total):\n\n{}Write the research gap report.",
            papers_section(papers),
            confirmed.len(),
            gaps
        ),
        temperature: 0.7,
        json: false,
    };

    notify(progress, "Generating research gap report...");
    let report = generate_with_retry(client, &request, settings.retry_delay, progress).await?;
    info!("Generated report from {} confirmed gaps", confirmed.len());
    Ok(report)
}

/// Report over every commented candidate (comment-only mode).
pub async fn generate_comment_report<C: LlmClient>(
    client: &C,
    commented: &[CommentedCandidate],
    papers: &[PaperMetadata],
    settings: &BatchSettings,
    progress: Progress<'_>,
) -> Result<String, LlmError> {
    if commented.is_empty() {
        return Ok(String::new());
    }

    let mut paragraphs = String::new();
    for (i, item) in commented.iter().enumerate() {
        let _ = write!(
            paragraphs,
            "Paragraph {} (page {}, score: {:.2}):\n{}\nAI comment: {}\n\n",
            i + 1,
            item.candidate.page,
            item.candidate.score,
            truncate_chars(&item.candidate.paragraph, settings.paragraph_truncate),
            item.comment
        );
    }

    let request = GenerationRequest {
        system: COMMENT_REPORT_SYSTEM_PROMPT.to_string(),
        prompt: format!(
            "{}Scored paragraphs ({} total):\n\n{}Write a research analysis report identifying \
             the most promising gaps and suggested research directions.",
            papers_section(papers),
            commented.len(),
            paragraphs
        ),
        temperature: 0.7,
        json: false,
    };

    notify(progress, "Generating research analysis report...");
    generate_with_retry(client, &request, settings.retry_delay, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use gapfinder_core::ScoredParagraph;

    fn verified(verdict: Verdict, quote: &str) -> VerifiedCandidate {
        VerifiedCandidate {
            candidate: ScoredParagraph {
                page: 4,
                paragraph: "How fungi respond to warming remains poorly understood.".into(),
                score: 0.71,
            },
            verdict,
            reason: "Open question stated by the authors".into(),
            evidence_quote: quote.into(),
        }
    }

    #[tokio::test]
    async fn test_no_confirmed_gaps_skips_api_call() {
        let client = ScriptedClient::new(vec![]);
        let gaps = vec![verified(Verdict::FalsePositive, "studies have shown")];
        let report = generate_report(&client, &gaps, &[], &BatchSettings::default(), None)
            .await
            .unwrap();
        assert!(report.contains("No confirmed research gaps"));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_report_includes_evidence_and_papers() {
        let client = ScriptedClient::new(vec![Ok("# Report\n\nAnalysis.".into())]);
        let gaps = vec![
            verified(Verdict::ConfirmedGap, "remains poorly understood"),
            verified(Verdict::Uncertain, ""),
        ];
        let papers = vec![PaperMetadata {
            title: Some("Fungal Ecology".into()),
            author: Some("Smith".into()),
            doi: Some("10.1000/xyz123".into()),
        }];
        let report = generate_report(&client, &gaps, &papers, &BatchSettings::default(), None)
            .await
            .unwrap();
        assert!(report.contains("Report"));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("remains poorly understood"));
        assert!(prompt.contains("Fungal Ecology by Smith (doi:10.1000/xyz123)"));
        assert!(prompt.contains("(1 total)"));
        assert!(requests[0].system.contains("300 and 800 words"));
    }

    #[tokio::test]
    async fn test_report_failure_propagates() {
        let client = ScriptedClient::new(vec![Err(LlmError::Request("offline".into()))]);
        let gaps = vec![verified(Verdict::ConfirmedGap, "remains poorly understood")];
        let result = generate_report(&client, &gaps, &[], &BatchSettings::default(), None).await;
        assert!(matches!(result, Err(LlmError::Request(_))));
    }

    #[tokio::test]
    async fn test_comment_report_lists_comments() {
        let client = ScriptedClient::new(vec![Ok("## Analysis".into())]);
        let items = vec![CommentedCandidate {
            candidate: verified(Verdict::Uncertain, "").candidate,
            comment: "Identifies an understudied response".into(),
        }];
        let report =
            generate_comment_report(&client, &items, &[], &BatchSettings::default(), None)
                .await
                .unwrap();
        assert_eq!(report, "## Analysis");
        let prompt = &client.requests()[0].prompt;
        assert!(prompt.contains("AI comment: Identifies an understudied response"));
        assert!(prompt.starts_with("Scored paragraphs (1 total)"));
    }
}
