use crate::config::EngineConfig;
use crate::error::{Result, TableError};
use crate::loader::protocol::{ParseCommand, ParseResponse, RequestId};
use crate::parser::{self, ParseOutcome, ParseProgress};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

/// Run the parse worker, processing commands from the coordinator.
///
/// Parsing itself happens on the blocking pool. Inputs of at least
/// `config.large_input_lines` lines stream progress and honour their cancel flag
/// between chunks; smaller inputs are parsed in one go.
pub async fn parse_worker_loop(
    mut rx: Receiver<ParseCommand>,
    tx: Sender<ParseResponse>,
    config: EngineConfig,
) {
    let state = WorkerState { config, tx };

    while let Some(cmd) = rx.recv().await {
        let outcome = state.handle_command(cmd).await;
        if let Some(response) = outcome.response {
            if state.tx.send(response).await.is_err() {
                break;
            }
        }

        if outcome.done {
            break;
        }
    }
    log::debug!("parse worker stopped");
}

struct WorkerState {
    config: EngineConfig,
    tx: Sender<ParseResponse>,
}

impl WorkerState {
    async fn handle_command(&self, cmd: ParseCommand) -> HandlerOutcome {
        match cmd {
            ParseCommand::Parse {
                request_id,
                text,
                delimiter,
                cancel,
            } => HandlerOutcome::respond(self.parse(request_id, text, delimiter, cancel).await),
            ParseCommand::Shutdown => HandlerOutcome::exit(),
        }
    }

    async fn parse(
        &self,
        request_id: RequestId,
        text: Arc<str>,
        delimiter: String,
        cancel: Arc<AtomicBool>,
    ) -> ParseResponse {
        let large_input_lines = self.config.large_input_lines;
        let chunk_lines = self.config.progress_chunk_lines;
        let progress_tx = self.tx.clone();

        let job = tokio::task::spawn_blocking(move || {
            if parser::line_count(&text) < large_input_lines {
                if cancel.load(Ordering::Relaxed) {
                    return ParseOutcome::Cancelled;
                }
                return ParseOutcome::Completed(parser::parse(&text, &delimiter));
            }
            log::info!("parsing large input with progress reporting");
            parser::parse_with_progress(&text, &delimiter, chunk_lines, &cancel, |progress| {
                // A closed channel means nobody is listening; the final send reports it.
                let _ = progress_tx.blocking_send(ParseResponse::Progress {
                    request_id,
                    progress,
                });
            })
        });

        match job.await {
            Ok(ParseOutcome::Completed(rows)) => ParseResponse::Completed { request_id, rows },
            Ok(ParseOutcome::Cancelled) => ParseResponse::Cancelled { request_id },
            Err(err) => ParseResponse::Failed {
                request_id,
                error: TableError::other(format!("parse task failed: {err}")),
            },
        }
    }
}

struct HandlerOutcome {
    response: Option<ParseResponse>,
    done: bool,
}

impl HandlerOutcome {
    fn respond(response: ParseResponse) -> Self {
        Self {
            response: Some(response),
            done: false,
        }
    }

    fn exit() -> Self {
        Self {
            response: None,
            done: true,
        }
    }
}

/// What the coordinator observed for the in-flight parse
#[derive(Debug)]
pub enum ParseEvent {
    Progress(ParseProgress),
    Finished(ParseOutcome),
    Failed(TableError),
}

struct InFlight {
    request_id: RequestId,
    cancel: Arc<AtomicBool>,
}

/// Foreground handle to a spawned parse worker.
///
/// At most one parse is in flight; a second submission is rejected with
/// [`TableError::Busy`] and does not disturb the running one.
pub struct ParseCoordinator {
    commands: Sender<ParseCommand>,
    responses: Receiver<ParseResponse>,
    worker: Option<JoinHandle<()>>,
    next_request_id: RequestId,
    in_flight: Option<InFlight>,
}

impl ParseCoordinator {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (resp_tx, resp_rx) = mpsc::channel(64);
        let worker = tokio::spawn(parse_worker_loop(cmd_rx, resp_tx, config));
        Self {
            commands: cmd_tx,
            responses: resp_rx,
            worker: Some(worker),
            next_request_id: 1,
            in_flight: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Hand `text` to the worker. Fails with `Busy` while another parse runs.
    pub async fn submit(&mut self, text: Arc<str>, delimiter: &str) -> Result<RequestId> {
        if self.in_flight.is_some() {
            return Err(TableError::Busy);
        }
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let cancel = Arc::new(AtomicBool::new(false));

        self.commands
            .send(ParseCommand::Parse {
                request_id,
                text,
                delimiter: delimiter.to_string(),
                cancel: Arc::clone(&cancel),
            })
            .await
            .map_err(|_| TableError::WorkerUnavailable)?;

        self.in_flight = Some(InFlight { request_id, cancel });
        log::debug!("parse request {request_id} submitted");
        Ok(request_id)
    }

    /// Ask the running parse to stop. Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        match &self.in_flight {
            Some(in_flight) => {
                in_flight.cancel.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Wait for the next message about the in-flight parse.
    ///
    /// Returns `None` when nothing is in flight. After a `Finished` or `Failed`
    /// event the coordinator accepts new submissions.
    pub async fn next_event(&mut self) -> Option<ParseEvent> {
        let current = self.in_flight.as_ref()?.request_id;
        loop {
            let Some(response) = self.responses.recv().await else {
                self.in_flight = None;
                return Some(ParseEvent::Failed(TableError::WorkerUnavailable));
            };
            if response.request_id() != current {
                continue;
            }
            if response.is_final() {
                self.in_flight = None;
            }
            return Some(match response {
                ParseResponse::Progress { progress, .. } => ParseEvent::Progress(progress),
                ParseResponse::Completed { rows, .. } => {
                    ParseEvent::Finished(ParseOutcome::Completed(rows))
                }
                ParseResponse::Cancelled { .. } => ParseEvent::Finished(ParseOutcome::Cancelled),
                ParseResponse::Failed { error, .. } => ParseEvent::Failed(error),
            });
        }
    }

    /// Drive the in-flight parse to its end, reporting progress along the way.
    ///
    /// Returning `ControlFlow::Break` from `on_progress` cancels the parse; the
    /// call then resolves to [`ParseOutcome::Cancelled`] once the worker stops.
    pub async fn finish(
        &mut self,
        mut on_progress: impl FnMut(ParseProgress) -> ControlFlow<()>,
    ) -> Result<ParseOutcome> {
        while let Some(event) = self.next_event().await {
            match event {
                ParseEvent::Progress(progress) => {
                    if on_progress(progress).is_break() {
                        self.cancel();
                    }
                }
                ParseEvent::Finished(outcome) => return Ok(outcome),
                ParseEvent::Failed(error) => return Err(error),
            }
        }
        Err(TableError::invalid("no parse in flight"))
    }

    /// Stop the worker and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(in_flight) = &self.in_flight {
            in_flight.cancel.store(true, Ordering::Relaxed);
        }
        let _ = self.commands.send(ParseCommand::Shutdown).await;
        // Keep draining so a worker blocked on a full channel can reach the command.
        while self.responses.recv().await.is_some() {}
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                log::warn!("parse worker ended abnormally: {err}");
            }
        }
    }
}
