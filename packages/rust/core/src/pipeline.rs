//! End-to-end processing pipeline: classify → dispatch → materialize → record.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use contextfunnel_artifacts::{ArtifactMeta, ArtifactStore};
use contextfunnel_shared::{AppConfig, FunnelError, Result, RunId, RunRecord, SourceKind, data_dir};
use contextfunnel_sources::{Dispatcher, classify};
use contextfunnel_storage::Storage;
use contextfunnel_transform::EstimatingCounter;

use crate::materialize::{materialize, write_url_list};

/// Run-history database file inside the data directory. Run directories live
/// alongside it, named by run id.
pub const DB_FILE_NAME: &str = "contextfunnel.db";

/// Result of one completed processing run.
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Run identifier, also the artifact directory name.
    pub run_id: RunId,
    /// Classification assigned to the reference.
    pub kind: SourceKind,
    /// Name of the classification rule that fired.
    pub rule: &'static str,
    /// The full raw extracted text.
    pub text: String,
    /// Token count of the raw text.
    pub uncompressed_tokens: usize,
    /// Token count of the normalized text.
    pub compressed_tokens: usize,
    /// Number of crawled URLs; present only for webpage runs.
    pub url_count: Option<usize>,
    /// Artifacts written for this run.
    pub artifacts: Vec<ArtifactMeta>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &ProcessOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: &ProcessOutcome) {}
}

/// Orchestrates one reference through classification, extraction, and
/// artifact materialization, recording the run in storage.
pub struct Pipeline {
    dispatcher: Dispatcher,
    store: ArtifactStore,
    storage: Storage,
}

impl Pipeline {
    /// Build the pipeline from config: extractor registry, artifact store
    /// rooted at the data directory, run history database beside it.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let root = data_dir(config)?;
        let dispatcher = Dispatcher::from_config(config)?;
        let store = ArtifactStore::open(&root)?;
        let storage = Storage::open(&root.join(DB_FILE_NAME)).await?;
        Ok(Self {
            dispatcher,
            store,
            storage,
        })
    }

    /// Assemble a pipeline from pre-built parts.
    pub fn new(dispatcher: Dispatcher, store: ArtifactStore, storage: Storage) -> Self {
        Self {
            dispatcher,
            store,
            storage,
        }
    }

    /// The artifact store backing this pipeline.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The run-history storage backing this pipeline.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Process one reference end to end.
    ///
    /// A failure anywhere after the run record is inserted marks the run
    /// failed and removes its artifact directory, so a failed run never
    /// exposes partial output.
    #[instrument(skip_all, fields(reference))]
    pub async fn process(
        &self,
        reference: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessOutcome> {
        let start = Instant::now();
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(FunnelError::validation("empty input reference"));
        }

        progress.phase("Classifying input");
        let classification = classify(reference);
        let run_id = RunId::new();
        info!(
            %run_id,
            kind = %classification.kind,
            rule = classification.rule,
            "run started"
        );

        let record = RunRecord::started(run_id, reference, classification.kind, classification.rule);
        self.storage.insert_run(&record).await?;

        match self
            .execute(run_id, reference, classification.kind, classification.rule, start, progress)
            .await
        {
            Ok(outcome) => {
                info!(
                    %run_id,
                    uncompressed_tokens = outcome.uncompressed_tokens,
                    compressed_tokens = outcome.compressed_tokens,
                    elapsed_ms = outcome.elapsed.as_millis(),
                    "run complete"
                );
                progress.done(&outcome);
                Ok(outcome)
            }
            Err(e) => Err(self.fail(run_id, e).await),
        }
    }

    async fn execute(
        &self,
        run_id: RunId,
        reference: &str,
        kind: SourceKind,
        rule: &'static str,
        start: Instant,
        progress: &dyn ProgressReporter,
    ) -> Result<ProcessOutcome> {
        progress.phase("Extracting content");
        let dispatched = self.dispatcher.dispatch(reference, kind).await?;

        progress.phase("Writing artifacts");
        let materialized = materialize(run_id, &dispatched.text, &self.store, &EstimatingCounter)?;
        let mut artifacts = materialized.artifacts;

        let url_count = dispatched.processed_urls.as_ref().map(Vec::len);
        if let Some(urls) = &dispatched.processed_urls {
            artifacts.push(write_url_list(run_id, urls, &self.store)?);
        }

        let id = run_id.to_string();
        for artifact in &artifacts {
            self.storage
                .record_artifact(&id, &artifact.name, &artifact.sha256, artifact.size_bytes)
                .await?;
        }
        self.storage
            .complete_run(
                &id,
                materialized.uncompressed_tokens,
                materialized.compressed_tokens,
                url_count,
            )
            .await?;

        Ok(ProcessOutcome {
            run_id,
            kind,
            rule,
            text: dispatched.text,
            uncompressed_tokens: materialized.uncompressed_tokens,
            compressed_tokens: materialized.compressed_tokens,
            url_count,
            artifacts,
            elapsed: start.elapsed(),
        })
    }

    /// Best-effort failure bookkeeping: mark the run failed, sweep its
    /// artifact directory, hand the original error back.
    async fn fail(&self, run: RunId, error: FunnelError) -> FunnelError {
        warn!(%run, %error, "run failed");
        if let Err(db_err) = self.storage.fail_run(&run.to_string(), &error.to_string()).await {
            warn!(%run, error = %db_err, "could not record run failure");
        }
        if let Err(fs_err) = self.store.remove_run(run) {
            warn!(%run, error = %fs_err, "could not remove artifacts of failed run");
        }
        error
    }
}
