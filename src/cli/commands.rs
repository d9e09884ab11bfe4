//! Command implementations for the halberd CLI.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::analysis::DslAnalyzer;
use crate::cancel::CancellationToken;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::{HalberdError, Result};
use crate::loader::DirectoryLoader;
use crate::search::{SearchEngine, SearchRequest, SearchResultPayload};
use crate::template::TemplateCache;

/// Execute a CLI command.
pub fn execute_command(args: HalberdArgs) -> Result<()> {
    match &args.command {
        Command::Search(search_args) => search(search_args, &args),
        Command::Validate(validate_args) => validate(validate_args, &args),
        Command::Analyze(analyze_args) => analyze(analyze_args, &args),
    }
}

/// Read a request body from a file, or stdin for `-`.
pub fn read_request(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        io::stdin().read_to_end(&mut body)?;
        Ok(body)
    } else {
        Ok(fs::read(path)?)
    }
}

/// Run a request against a directory-backed repository.
fn search(args: &SearchArgs, cli_args: &HalberdArgs) -> Result<()> {
    let config = cli_args.engine_config()?;
    let body = read_request(&args.query_file)?;
    let index = args.index_config();

    info!(root = %args.root.display(), repo = %index.repo, "running search");
    let engine = SearchEngine::new(Arc::new(DirectoryLoader::new(&args.root)), config)?;

    let start = Instant::now();
    let payload = match args.timeout_ms {
        Some(millis) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_time()
                .build()?;
            let outcome = SearchRequest::from_json(&body).and_then(|request| {
                runtime.block_on(engine.execute_with_timeout(
                    request,
                    index,
                    Duration::from_millis(millis),
                ))
            });
            match outcome {
                Ok(response) => SearchResultPayload::ok(response),
                Err(e) => SearchResultPayload::from(e),
            }
        }
        None => engine.handle(&body, &index, &CancellationToken::new()),
    };

    let output = SearchOutput {
        payload,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    output_result(&output, cli_args)?;

    if output.payload.is_success() {
        Ok(())
    } else {
        Err(HalberdError::other(format!(
            "search failed with status {}",
            output.payload.status_code
        )))
    }
}

/// Parse a request and compile every template it carries.
fn validate(args: &ValidateArgs, cli_args: &HalberdArgs) -> Result<()> {
    let body = read_request(&args.query_file)?;
    let request = SearchRequest::from_json(&body)?;

    let cache = TemplateCache::default();
    let compiled = request.compile_templates(&cache)?;
    debug!(compiled, "templates compiled");

    output_result(
        &ValidationResult {
            queries: request.queries().len(),
            union: request.is_union(),
            templates_compiled: compiled,
        },
        cli_args,
    )
}

/// Print the analyzer's tokens.
fn analyze(args: &AnalyzeArgs, cli_args: &HalberdArgs) -> Result<()> {
    let analyzer = DslAnalyzer::new()?;
    let (mode, tokens) = if args.phrase {
        ("phrase", analyzer.analyze_for_phrase(&args.text)?)
    } else {
        ("index", analyzer.analyze(&args.text)?)
    };

    output_result(
        &AnalysisResult {
            mode: mode.to_string(),
            tokens,
        },
        cli_args,
    )
}
