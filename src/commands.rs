//! Bodies of the `vekta-rag` CLI commands, over any line reader and writer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{BufRead, Write};
use tracing::{debug, error, info, warn};

use crate::config::{Number, Settings};
use crate::error::RagError;
use crate::pipeline::{Match, RetrievalPipeline};

#[derive(Deserialize)]
struct IngestLine {
    text: String,
    vector: Vec<Number>,
}

#[derive(Deserialize)]
struct QueryLine {
    vector: Vec<Number>,
}

/// Ingests one `{"text", "vector"}` JSON object per line.
///
/// Bad lines are reported and skipped. When any save failed along the way the
/// snapshot is saved once more after the last line, before any line error is
/// returned, so documents already indexed are not lost with the process.
pub fn ingest(pipeline: &RetrievalPipeline, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    let mut persistence_failures = 0usize;
    let mut rejected = Vec::new();
    let mut read_error = None;

    for (line_no, line_result) in input.lines().enumerate() {
        let line_no = line_no + 1;
        let line = match line_result {
            Ok(line) => line,
            Err(err) => {
                read_error = Some(err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let entry: IngestLine = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(err) => {
                reject(out, &mut rejected, line_no, format!("invalid JSON input: {}", err))?;
                continue;
            }
        };

        match pipeline.ingest(entry.text, &entry.vector) {
            Ok(slot) => writeln!(out, "{}", serde_json::json!({ "slot": slot }))?,
            Err(RagError::PersistenceFailed { slot, source }) => {
                persistence_failures += 1;
                error!(line = line_no, error = %source, "document indexed but not saved");
                writeln!(
                    out,
                    "{}",
                    serde_json::json!({ "slot": slot, "persisted": false, "error": source.to_string() })
                )?;
            }
            Err(err) => reject(out, &mut rejected, line_no, err.to_string())?,
        }
    }

    if persistence_failures > 0 {
        pipeline
            .persist()
            .context("Snapshot is behind the ingested documents")?;
        info!(persistence_failures, "snapshot saved on retry");
    }
    if let Some(err) = read_error {
        return Err(err).context("Failed to read ingest input");
    }
    if !rejected.is_empty() {
        anyhow::bail!("{} input line(s) rejected: {:?}", rejected.len(), rejected);
    }
    Ok(())
}

fn reject(
    out: &mut impl Write,
    rejected: &mut Vec<usize>,
    line_no: usize,
    reason: String,
) -> Result<()> {
    warn!(line = line_no, %reason, "line rejected");
    writeln!(
        out,
        "{}",
        serde_json::json!({ "line": line_no, "error": reason })
    )?;
    rejected.push(line_no);
    Ok(())
}

fn read_query(pipeline: &RetrievalPipeline, mut input: impl BufRead) -> Result<Vec<Number>> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let query: QueryLine = serde_json::from_str(&line).context("Failed to parse JSON input")?;
    debug!(
        dimensions = query.vector.len(),
        documents = pipeline.len(),
        "query received"
    );
    Ok(query.vector)
}

fn no_answer(out: &mut impl Write, reason: &str) -> Result<()> {
    writeln!(
        out,
        "{}",
        serde_json::json!({ "answer": null, "reason": reason })
    )?;
    Ok(())
}

/// Prints the nearest document, or a no-answer object when there is none or
/// it lies beyond `max_distance`.
pub fn query(
    pipeline: &RetrievalPipeline,
    settings: &Settings,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let vector = read_query(pipeline, input)?;

    match pipeline.query(&vector) {
        Ok(found) => match settings.max_distance {
            Some(limit) if found.distance > limit => {
                debug!(distance = found.distance, limit, "nearest document rejected");
                no_answer(out, "nearest document is beyond max_distance")?;
            }
            _ => writeln!(out, "{}", serde_json::to_string(&found)?)?,
        },
        Err(err) if err.is_no_answer() => no_answer(out, &err.to_string())?,
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

pub fn search(
    pipeline: &RetrievalPipeline,
    settings: &Settings,
    top_k: Option<usize>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let vector = read_query(pipeline, input)?;
    let top_k = top_k.unwrap_or(settings.top_k);

    let results: Vec<Match> = match pipeline.search(&vector, top_k) {
        Ok(results) => results,
        Err(err) if err.is_no_answer() => Vec::new(),
        Err(err) => return Err(err.into()),
    };

    let output = serde_json::json!({
        "database_record_count": pipeline.len(),
        "results": results,
        "actual_results_count": results.len(),
        "requested_results_count": top_k,
    });
    writeln!(out, "{}", serde_json::to_string(&output)?)?;
    Ok(())
}

pub fn list(pipeline: &RetrievalPipeline, out: &mut impl Write) -> Result<()> {
    for (slot, text) in pipeline.documents() {
        let first_line = text.lines().next().unwrap_or("");
        writeln!(out, "{}\t{}", slot, first_line)?;
    }
    Ok(())
}
