// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background conversion jobs.
//
// A job owns everything it needs (paths, scheme, font) and runs the blocking
// conversion on tokio's blocking pool. Progress and the outcome arrive as
// events on a channel; cancellation is a shared flag checked between pages.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use farbwerk_core::config::TextFont;
use farbwerk_core::error::{FarbwerkError, Result};
use farbwerk_core::{ConversionReport, JobId};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::convert::{ConversionObserver, DocumentConverter};
use crate::pdf::reader::SourceDocument;

/// Progress and outcome of a [`ConversionJob`].
#[derive(Debug, Clone)]
pub enum ConversionEvent {
    Started { job: JobId, total_pages: usize },
    /// `page` is 1-indexed.
    PageDone {
        job: JobId,
        page: usize,
        total_pages: usize,
    },
    Finished { job: JobId, report: ConversionReport },
    Failed { job: JobId, message: String },
    Cancelled { job: JobId },
}

impl ConversionEvent {
    /// Whether no further events follow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A conversion to run in the background.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: JobId,
    pub source_path: PathBuf,
    pub scheme_id: String,
    pub output: PathBuf,
    pub text_font: TextFont,
    cancel: CancelToken,
}

impl ConversionJob {
    pub fn new(
        source_path: impl Into<PathBuf>,
        scheme_id: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: JobId::new(),
            source_path: source_path.into(),
            scheme_id: scheme_id.into(),
            output: output.into(),
            text_font: TextFont::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_text_font(mut self, font: TextFont) -> Self {
        self.text_font = font;
        self
    }

    /// Share an existing cancellation flag instead of a fresh one.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Start the job on the blocking pool. Must be called inside a tokio
    /// runtime.
    pub fn spawn(self) -> JobHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.id;
        let cancel = self.cancel.clone();
        let task = tokio::task::spawn_blocking(move || self.run(tx));
        JobHandle {
            id,
            cancel,
            events: rx,
            task,
        }
    }

    /// Run the conversion on the current thread, reporting through `events`.
    #[instrument(skip_all, fields(job = %self.id, scheme = %self.scheme_id))]
    pub fn run(self, events: UnboundedSender<ConversionEvent>) -> Result<ConversionReport> {
        let observer = ChannelObserver {
            job: self.id,
            events: events.clone(),
            cancel: self.cancel.clone(),
        };

        let result = SourceDocument::open(&self.source_path).and_then(|source| {
            DocumentConverter::new(self.text_font).convert(
                &source,
                &self.scheme_id,
                &self.output,
                &observer,
            )
        });

        let event = match &result {
            Ok(report) => {
                info!(pages = report.pages, "Job finished");
                ConversionEvent::Finished {
                    job: self.id,
                    report: report.clone(),
                }
            }
            Err(FarbwerkError::Cancelled) => ConversionEvent::Cancelled { job: self.id },
            Err(err) => {
                warn!(error = %err, "Job failed");
                ConversionEvent::Failed {
                    job: self.id,
                    message: err.to_string(),
                }
            }
        };
        let _ = events.send(event);
        result
    }
}

/// Forwards converter callbacks onto the event channel.
struct ChannelObserver {
    job: JobId,
    events: UnboundedSender<ConversionEvent>,
    cancel: CancelToken,
}

impl ConversionObserver for ChannelObserver {
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = self.events.send(ConversionEvent::Started {
            job: self.job,
            total_pages,
        });
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        let _ = self.events.send(ConversionEvent::PageDone {
            job: self.job,
            page: page_num,
            total_pages,
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Handle to a running [`ConversionJob`].
pub struct JobHandle {
    id: JobId,
    cancel: CancelToken,
    events: UnboundedReceiver<ConversionEvent>,
    task: JoinHandle<Result<ConversionReport>>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Ask the job to stop at the next page boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event, or `None` once the job has finished and all events have
    /// been read.
    pub async fn next_event(&mut self) -> Option<ConversionEvent> {
        self.events.recv().await
    }

    /// Wait for the job to end and return its result.
    pub async fn wait(self) -> Result<ConversionReport> {
        self.task
            .await
            .map_err(|err| FarbwerkError::Conversion(format!("conversion task failed: {err}")))?
    }
}
