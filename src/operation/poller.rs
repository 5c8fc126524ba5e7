//! Submitting mutating calls and polling them to completion

use super::{AsyncOperation, Backoff, OperationResult, OperationState, PollLocator, Submission};
use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::payload::{provisioning_state_of, ErrorDetail, OperationStatus, ProvisioningState};
use crate::transport::{Request, Response, Transport, TransportError};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a single non-transient status check was classified
enum PollOutcome {
    Running { next_location: Option<String> },
    Succeeded(OperationResult),
    Failed(ErrorDetail),
    Canceled(ErrorDetail),
}

/// Drives mutating calls against a [`Transport`]
#[derive(Clone)]
pub struct Poller {
    transport: Arc<dyn Transport>,
    config: PollConfig,
}

impl Poller {
    pub fn new(transport: Arc<dyn Transport>, config: PollConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Issue a mutating call.
    ///
    /// Transient failures are retried with backoff. A response that carries a
    /// polling locator becomes [`Submission::Accepted`]; any other success is
    /// returned as [`Submission::Completed`].
    pub async fn submit(&self, request: Request) -> Result<Submission> {
        tracing::info!("submitting {} {}", request.method, request.path);
        let response = self.send_with_retry(&request).await?;
        classify_submission(request, response)
    }

    /// `submit` followed by `poll_until_done` when the call was accepted
    pub async fn submit_and_poll(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<OperationResult> {
        match self.submit(request).await? {
            Submission::Completed(result) => Ok(result),
            Submission::Accepted(mut op) => self.poll_until_done(&mut op, cancel).await,
        }
    }

    /// Poll an accepted operation until it reaches a terminal state.
    ///
    /// Cancellation and the overall deadline are checked before every status
    /// check and interrupt the wait between checks. Calling this again on a
    /// terminal operation returns its outcome without any network calls.
    pub async fn poll_until_done(
        &self,
        op: &mut AsyncOperation,
        cancel: &CancellationToken,
    ) -> Result<OperationResult> {
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut backoff = Backoff::new(&self.config);
        let mut hint = op.initial_delay.take();

        loop {
            if op.state().is_terminal() {
                return terminal_outcome(op);
            }

            if cancel.is_cancelled() {
                return Err(cancel_operation(op));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(time_out(op, now - started));
            }

            let delay = backoff.next_delay(hint.take());
            let wake = (now + delay).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancel_operation(op)),
                _ = tokio::time::sleep_until(wake) => {},
            }
            if Instant::now() >= deadline {
                continue;
            }

            op.transition(OperationState::Running);
            op.polls += 1;
            tracing::debug!(
                "status check #{} for {} at {}",
                op.polls,
                op.request.path,
                op.locator.url()
            );

            let request = Request::get(op.locator.url());
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancel_operation(op)),
                sent = tokio::time::timeout_at(deadline, self.transport.send(request)) => sent,
            };

            let response = match sent {
                // deadline hit mid-request; the check at the top of the loop reports it
                Err(_) => continue,
                Ok(Err(e)) => {
                    self.record_transient(op, e)?;
                    continue;
                },
                Ok(Ok(response)) if response.is_transient() => {
                    hint = response.retry_after();
                    self.record_transient(op, TransportError::from_response(&response))?;
                    continue;
                },
                Ok(Ok(response)) => response,
            };

            op.transient_failures = 0;
            hint = response.retry_after();

            let outcome = match classify_poll(&op.locator, &op.request.method, &response) {
                Ok(outcome) => outcome,
                Err(e) => {
                    op.last_error = Some(ErrorDetail::new("InvalidStatusDocument", e.to_string()));
                    op.transition(OperationState::Failed);
                    return Err(e);
                },
            };

            match outcome {
                PollOutcome::Running { next_location } => {
                    if let Some(location) = next_location {
                        op.locator = PollLocator::Location(location);
                    }
                },
                PollOutcome::Succeeded(result) => {
                    let result = self.final_result(op, result).await;
                    tracing::info!("{} {} succeeded after {} status check(s)", op.request.method, op.request.path, op.polls);
                    op.transition(OperationState::Succeeded);
                    op.outcome = Some(result.clone());
                    return Ok(result);
                },
                PollOutcome::Failed(detail) => {
                    tracing::info!("{} {} failed: {}", op.request.method, op.request.path, detail);
                    op.last_error = Some(detail.clone());
                    op.transition(OperationState::Failed);
                    return Err(Error::RemoteOperationFailed(detail));
                },
                PollOutcome::Canceled(detail) => {
                    tracing::info!("{} {} was canceled remotely", op.request.method, op.request.path);
                    op.last_error = Some(detail.clone());
                    op.transition(OperationState::Canceled);
                    return Err(Error::RemoteOperationFailed(detail));
                },
            }
        }
    }

    /// Send, retrying transient failures up to the configured bound
    pub(crate) async fn send_with_retry(&self, request: &Request) -> Result<Response> {
        let mut backoff = Backoff::new(&self.config);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let (error, hint) = match self.transport.send(request.clone()).await {
                Ok(response) if !response.is_transient() => return Ok(response),
                Ok(response) => (TransportError::from_response(&response), response.retry_after()),
                Err(e) => (e, None),
            };

            if attempts > self.config.max_transient_retries {
                return Err(Error::TransientTransport {
                    attempts,
                    source: error,
                });
            }

            let delay = backoff.next_delay(hint);
            tracing::warn!(
                "{} {} failed (attempt {}), retrying in {:?}: {}",
                request.method,
                request.path,
                attempts,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// A status document says nothing about the resource, so a finished PUT or
    /// PATCH tracked through one reads the resource back. A failed read keeps
    /// the status document.
    async fn final_result(&self, op: &AsyncOperation, result: OperationResult) -> OperationResult {
        if !matches!(op.locator, PollLocator::AsyncOperation(_)) || !is_put_or_patch(&op.request.method) {
            return result;
        }
        match self.transport.send(Request::get(op.request.path.clone())).await {
            Ok(response) if response.is_success() => OperationResult {
                status: response.status,
                body: response.json_value(),
            },
            Ok(response) => {
                tracing::warn!("reading {} after completion returned {}", op.request.path, response.status);
                result
            },
            Err(e) => {
                tracing::warn!("reading {} after completion failed: {}", op.request.path, e);
                result
            },
        }
    }

    fn record_transient(&self, op: &mut AsyncOperation, error: TransportError) -> Result<()> {
        op.transient_failures += 1;
        if op.transient_failures > self.config.max_transient_retries {
            op.last_error = Some(ErrorDetail::new("TransientFailure", error.to_string()));
            op.transition(OperationState::Failed);
            return Err(Error::TransientTransport {
                attempts: op.transient_failures,
                source: error,
            });
        }
        tracing::warn!(
            "status check for {} failed ({} of {} retries): {}",
            op.request.path,
            op.transient_failures,
            self.config.max_transient_retries,
            error
        );
        Ok(())
    }
}

fn cancel_operation(op: &mut AsyncOperation) -> Error {
    tracing::info!("operation on {} canceled by caller", op.request.path);
    op.transition(OperationState::Canceled);
    Error::Canceled
}

fn time_out(op: &mut AsyncOperation, waited: std::time::Duration) -> Error {
    tracing::warn!("gave up waiting for {} after {:?}", op.request.path, waited);
    op.transition(OperationState::Canceled);
    op.timed_out = Some(waited);
    Error::Timeout { waited }
}

fn terminal_outcome(op: &AsyncOperation) -> Result<OperationResult> {
    if let (OperationState::Canceled, Some(waited)) = (op.state(), op.timed_out) {
        return Err(Error::Timeout { waited });
    }
    match (op.state(), &op.outcome) {
        (OperationState::Succeeded, Some(result)) => Ok(result.clone()),
        (OperationState::Failed | OperationState::Canceled, _) if op.last_error.is_some() => {
            Err(Error::RemoteOperationFailed(op.last_error.clone().unwrap_or_default()))
        },
        _ => Err(Error::Canceled),
    }
}

fn is_put_or_patch(method: &Method) -> bool {
    *method == Method::PUT || *method == Method::PATCH
}

/// Decide whether a submit response finished the call or started an operation
fn classify_submission(request: Request, response: Response) -> Result<Submission> {
    let status = response.status;
    if !status.is_success() {
        return Err(Error::from_response(&response));
    }

    let retry_after = response.retry_after();

    if let Some(url) = response.header("azure-asyncoperation") {
        let locator = PollLocator::AsyncOperation(url.to_string());
        return Ok(Submission::Accepted(
            AsyncOperation::new(request, locator).with_initial_delay(retry_after),
        ));
    }

    if status == StatusCode::ACCEPTED {
        if let Some(url) = response.header("location") {
            let locator = PollLocator::Location(url.to_string());
            return Ok(Submission::Accepted(
                AsyncOperation::new(request, locator).with_initial_delay(retry_after),
            ));
        }
    }

    let body = response.json_value();

    if is_put_or_patch(&request.method) {
        let in_progress = body
            .as_ref()
            .and_then(provisioning_state_of)
            .is_some_and(|state| !state.is_terminal());
        if in_progress || status == StatusCode::ACCEPTED {
            let locator = PollLocator::ProvisioningState(request.path.clone());
            return Ok(Submission::Accepted(
                AsyncOperation::new(request, locator).with_initial_delay(retry_after),
            ));
        }
    }

    Ok(Submission::Completed(OperationResult { status, body }))
}

/// Classify a non-transient status check response
fn classify_poll(locator: &PollLocator, method: &Method, response: &Response) -> Result<PollOutcome> {
    let status = response.status;
    let gone_after_delete = *method == Method::DELETE && status == StatusCode::NOT_FOUND;

    match locator {
        PollLocator::AsyncOperation(_) => {
            if !status.is_success() {
                return Ok(PollOutcome::Failed(response.error_detail()));
            }
            let document: OperationStatus = response.json()?;
            Ok(match document.status {
                ProvisioningState::Succeeded => PollOutcome::Succeeded(OperationResult {
                    status,
                    body: response.json_value(),
                }),
                ProvisioningState::Failed => PollOutcome::Failed(
                    document
                        .error
                        .unwrap_or_else(|| ErrorDetail::new("OperationFailed", "the operation failed")),
                ),
                ProvisioningState::Canceled => PollOutcome::Canceled(
                    document
                        .error
                        .unwrap_or_else(|| ErrorDetail::new("Canceled", "the operation was canceled")),
                ),
                _ => PollOutcome::Running {
                    next_location: None,
                },
            })
        },
        PollLocator::Location(_) => {
            if status == StatusCode::ACCEPTED {
                return Ok(PollOutcome::Running {
                    next_location: response.header("location").map(str::to_string),
                });
            }
            if status.is_success() || gone_after_delete {
                return Ok(PollOutcome::Succeeded(OperationResult {
                    status,
                    body: response.json_value(),
                }));
            }
            Ok(PollOutcome::Failed(response.error_detail()))
        },
        PollLocator::ProvisioningState(_) => {
            if gone_after_delete {
                return Ok(PollOutcome::Succeeded(OperationResult { status, body: None }));
            }
            if !status.is_success() {
                return Ok(PollOutcome::Failed(response.error_detail()));
            }
            let body = response.json_value();
            let state = body.as_ref().and_then(provisioning_state_of);
            Ok(match state {
                None | Some(ProvisioningState::Succeeded) => {
                    PollOutcome::Succeeded(OperationResult { status, body })
                },
                Some(ProvisioningState::Failed) => PollOutcome::Failed(ErrorDetail::new(
                    "ProvisioningFailed",
                    "provisioning state is Failed",
                )),
                Some(ProvisioningState::Canceled) => PollOutcome::Canceled(ErrorDetail::new(
                    "Canceled",
                    "provisioning state is Canceled",
                )),
                Some(_) => PollOutcome::Running {
                    next_location: None,
                },
            })
        },
    }
}
