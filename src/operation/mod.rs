//! Long-running operation execution
//!
//! A mutating call either completes synchronously or is accepted and has to
//! be polled through a separate status locator. [`Poller::submit`] issues the
//! call and classifies the response; [`Poller::poll_until_done`] drives an
//! accepted [`AsyncOperation`] to a terminal state. The two are kept apart so
//! polling can be exercised without a real submit.
//!
//! # State machine
//!
//! ```text
//! Pending --first poll--> Running --succeeded--> Succeeded
//!                         Running --failed-----> Failed
//! Pending | Running --canceled / deadline--> Canceled
//! ```

pub mod availability;
mod backoff;
mod poller;

pub use backoff::Backoff;
pub use poller::Poller;

use crate::payload::ErrorDetail;
use crate::transport::Request;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationState {
    /// Position in `Pending < Running < {Succeeded, Failed, Canceled}`
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Succeeded | Self::Failed | Self::Canceled => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }
}

/// Where the status of an accepted operation is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollLocator {
    /// `Azure-AsyncOperation` header: a status document with a `status` field
    AsyncOperation(String),
    /// `Location` header: 202 while running, the final result once done
    Location(String),
    /// The resource itself, watched through `properties.provisioningState`
    ProvisioningState(String),
}

impl PollLocator {
    pub fn url(&self) -> &str {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) | Self::ProvisioningState(url) => url,
        }
    }
}

/// Final outcome of a mutating call
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl OperationResult {
    /// Decode the body into a typed model, `None` when there was no body
    pub fn model<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.body
            .as_ref()
            .map(|body| serde_json::from_value(body.clone()))
            .transpose()
    }
}

/// What submitting a mutating call produced
#[derive(Debug)]
pub enum Submission {
    Completed(OperationResult),
    Accepted(AsyncOperation),
}

/// One in-flight mutating call, owned by the loop polling it
#[derive(Debug)]
pub struct AsyncOperation {
    request: Request,
    locator: PollLocator,
    state: OperationState,
    history: Vec<OperationState>,
    last_error: Option<ErrorDetail>,
    initial_delay: Option<Duration>,
    outcome: Option<OperationResult>,
    /// How long was waited when the deadline ended the operation
    timed_out: Option<Duration>,
    polls: u32,
    transient_failures: u32,
}

impl AsyncOperation {
    pub fn new(request: Request, locator: PollLocator) -> Self {
        Self {
            request,
            locator,
            state: OperationState::Pending,
            history: vec![OperationState::Pending],
            last_error: None,
            initial_delay: None,
            outcome: None,
            timed_out: None,
            polls: 0,
            transient_failures: 0,
        }
    }

    /// Server hint from the submit response, used in place of the first backoff interval
    pub fn with_initial_delay(mut self, delay: Option<Duration>) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Path of the resource the operation mutates
    pub fn target(&self) -> &str {
        &self.request.path
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn locator(&self) -> &PollLocator {
        &self.locator
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Every state the operation has been in, oldest first
    pub fn history(&self) -> &[OperationState] {
        &self.history
    }

    pub fn last_error(&self) -> Option<&ErrorDetail> {
        self.last_error.as_ref()
    }

    /// Status checks issued so far
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Consecutive transient failures since the last good status check
    pub fn transient_failures(&self) -> u32 {
        self.transient_failures
    }

    /// Move forward; terminal states are sticky and backwards moves are ignored
    fn transition(&mut self, next: OperationState) {
        if self.state.is_terminal() || next == self.state || next.rank() < self.state.rank() {
            return;
        }
        tracing::debug!("operation on {}: {:?} -> {:?}", self.request.path, self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
