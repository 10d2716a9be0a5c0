//! Runs every source concurrently and writes one feed file per source.
//!
//! Sources are isolated from each other: each runs in its own task, and a
//! failure (or panic) in one never stops or alters the output of another.
//! A failed source leaves its previous feed file, if any, untouched.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::feed::{encode, write_atomic, Channel, EncodeError};
use crate::sources::{FetchError, Source};
use crate::util::file_stem;

/// Why a source produced no feed file.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source task panicked: {0}")]
    Panicked(String),
}

/// Outcome of one source's run.
#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    /// Path of the written feed on success
    pub outcome: Result<PathBuf, PublishError>,
}

/// Outcomes of a whole run, in the order the sources were given.
#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<SourceReport>,
}

impl RunSummary {
    /// True when every source published its feed.
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(|r| r.outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports.iter().filter(|r| r.outcome.is_err())
    }
}

/// Fetch, encode and write a single source's feed.
pub async fn publish_one(source: &dyn Source, output_dir: &Path) -> Result<PathBuf, PublishError> {
    let items = source.fetch().await?;
    let count = items.len();
    let channel = Channel::for_source(source.name(), source.home_url(), items);
    let bytes = encode(&channel)?;

    let path = output_dir.join(format!("{}.xml", file_stem(source.name())));
    write_atomic(&path, &bytes).map_err(|source| PublishError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::info!(source = %source.name(), items = count, path = %path.display(), "Published feed");
    Ok(path)
}

/// Run all sources concurrently and wait for every one of them.
///
/// Each source gets its own task; results come back over a channel with
/// room for every source, so no task ever blocks on reporting. Reports are
/// reordered to match `sources`.
pub async fn run(sources: Vec<Arc<dyn Source>>, output_dir: &Path) -> RunSummary {
    let total = sources.len();
    let (tx, mut rx) = mpsc::channel::<(usize, Result<PathBuf, PublishError>)>(total.max(1));

    for (position, source) in sources.iter().enumerate() {
        let source = Arc::clone(source);
        let output_dir = output_dir.to_path_buf();
        let tx = tx.clone();

        tokio::spawn(async move {
            let outcome = match catch_task_panic(publish_one(source.as_ref(), &output_dir)).await {
                Ok(outcome) => outcome,
                Err(panic) => Err(PublishError::Panicked(panic)),
            };
            if let Err(e) = tx.send((position, outcome)).await {
                tracing::warn!(source = %source.name(), error = %e, "Report channel closed before send");
            }
        });
    }
    // Only task handles remain, so recv() ends once every task has finished
    drop(tx);

    let mut outcomes: Vec<Option<Result<PathBuf, PublishError>>> =
        std::iter::repeat_with(|| None).take(total).collect();
    while let Some((position, outcome)) = rx.recv().await {
        if let Err(e) = &outcome {
            tracing::error!(source = %sources[position].name(), error = %e, "Failed to publish feed");
        }
        outcomes[position] = Some(outcome);
    }

    let reports = sources
        .iter()
        .zip(outcomes)
        .map(|(source, outcome)| SourceReport {
            name: source.name().to_string(),
            outcome: outcome
                .unwrap_or_else(|| Err(PublishError::Panicked("task ended without a report".into()))),
        })
        .collect();

    RunSummary { reports }
}

async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            }
        })
}
