//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use gapfinder_runtime::Verb;

pub const USAGE: &str = "\
GapFinder — research gap extraction from academic papers

Usage: gapfinder <command> <pages> [options]

Commands:
  scan <pages>        Lexical scan scored by sentiment
  rank <pages>        Semantic ranking against the anchor phrases
  verify <pages>      Semantic ranking plus LLM verification
  annotate <pages>    Semantic ranking plus one LLM comment per candidate
  help                Show this help message

<pages> is a .layout.jsonl file of positioned text blocks per page, a
.jsonl file of page records, or plain text with form-feed page breaks.

Options:
  --threshold <f>     Minimum similarity score (semantic modes)
  --top-k <n>         Maximum number of candidates (semantic modes)
  --report            Also generate a Markdown report (verify, annotate)
  --config <path>     Pipeline config JSON
  --title <text>      Paper title for the report
  --author <text>     Paper author for the report

Environment:
  GAPFINDER_DATA_DIR  Directory holding models/ and llm-config.json
  RUST_LOG            Log filter (default: info)";

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Run(RunArgs),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    pub verb: Verb,
    pub input: PathBuf,
    pub threshold: Option<f32>,
    pub top_k: Option<usize>,
    pub report: bool,
    pub config: Option<PathBuf>,
    pub title: Option<String>,
    pub author: Option<String>,
}

pub fn parse(args: &[String]) -> anyhow::Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        return Ok(Command::Help);
    }

    let verb: Verb = command
        .parse()
        .map_err(|_| anyhow!("Unknown command: {}. Use 'gapfinder help' for usage.", command))?;

    let mut run = RunArgs {
        verb,
        input: PathBuf::new(),
        threshold: None,
        top_k: None,
        report: false,
        config: None,
        title: None,
        author: None,
    };
    let mut input = None;

    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        let mut value = |flag: &str| {
            rest.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--threshold" => {
                let raw = value("--threshold")?;
                run.threshold = Some(raw.parse().with_context(|| format!("bad threshold {raw:?}"))?);
            }
            "--top-k" => {
                let raw = value("--top-k")?;
                run.top_k = Some(raw.parse().with_context(|| format!("bad top-k {raw:?}"))?);
            }
            "--report" => run.report = true,
            "--config" => run.config = Some(PathBuf::from(value("--config")?)),
            "--title" => run.title = Some(value("--title")?),
            "--author" => run.author = Some(value("--author")?),
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            path => {
                if input.is_some() {
                    bail!("Only one input file is accepted");
                }
                input = Some(PathBuf::from(path));
            }
        }
    }

    run.input = input.ok_or_else(|| anyhow!("Missing input file. Use 'gapfinder help' for usage."))?;
    if run.report && matches!(run.verb, Verb::Scan | Verb::Rank) {
        bail!("--report is only available for verify and annotate");
    }
    Ok(Command::Run(run))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_help_variants() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
        assert_eq!(parse(&args(&["-h"])).unwrap(), Command::Help);
    }

    #[test]
    fn test_verify_with_options() {
        let parsed = parse(&args(&[
            "verify",
            "paper.jsonl",
            "--threshold",
            "0.6",
            "--top-k",
            "5",
            "--report",
        ]))
        .unwrap();
        let Command::Run(run) = parsed else {
            panic!("expected run");
        };
        assert_eq!(run.verb, Verb::Verify);
        assert_eq!(run.input, PathBuf::from("paper.jsonl"));
        assert_eq!(run.threshold, Some(0.6));
        assert_eq!(run.top_k, Some(5));
        assert!(run.report);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse(&args(&["explode", "x.txt"])).is_err());
        assert!(parse(&args(&["scan"])).is_err());
        assert!(parse(&args(&["rank", "x.txt", "--top-k"])).is_err());
        assert!(parse(&args(&["rank", "x.txt", "--top-k", "many"])).is_err());
        assert!(parse(&args(&["scan", "x.txt", "--report"])).is_err());
        assert!(parse(&args(&["scan", "a.txt", "b.txt"])).is_err());
    }
}
