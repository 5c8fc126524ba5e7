//! Resource lifecycle driver
//!
//! Runs one mutation end to end: parse the identifier, submit, poll until
//! the operation finishes, then keep the endpoint cache in step with the
//! result. The first failing stage stops the run and is reported together
//! with the resource it concerned.

use crate::cache::EndpointCache;
use crate::config::{AvailabilityConfig, Config};
use crate::error::{Error, LifecycleError, Stage};
use crate::ids::{ResourceId, ScopedResource};
use crate::operation::availability::wait_until_available;
use crate::operation::{OperationResult, Poller, Submission};
use crate::payload::ResourcePayload;
use crate::transport::{ProbeTransport, Request, Transport};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A change to apply to a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Put(Value),
    Patch(Value),
    Delete,
    /// `POST {id}/{name}`, e.g. `regenerateKey`
    Action { name: String, body: Option<Value> },
}

impl Mutation {
    fn request_for(&self, path: String) -> Request {
        match self {
            Mutation::Put(body) => Request::put(path, body.clone()),
            Mutation::Patch(body) => Request::patch(path, body.clone()),
            Mutation::Delete => Request::delete(path),
            Mutation::Action { name, body } => {
                let request = Request::post(format!("{}/{}", path, name));
                match body {
                    Some(body) => request.with_body(body.clone()),
                    None => request,
                }
            },
        }
    }
}

/// A finished mutation
#[derive(Debug, Clone)]
pub struct Outcome<I> {
    pub id: I,
    pub result: OperationResult,
    /// Data-plane endpoint, when a cache is attached and the resource still exists
    pub endpoint: Option<String>,
}

pub struct Driver<I: ScopedResource> {
    poller: Poller,
    cache: Option<Arc<EndpointCache<I>>>,
    availability: AvailabilityConfig,
    /// Sends availability probes; never carries management credentials
    probe: Option<Arc<dyn Transport>>,
}

impl<I: ScopedResource> Driver<I> {
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let probe = match ProbeTransport::new(config) {
            Ok(probe) => Some(Arc::new(probe) as Arc<dyn Transport>),
            Err(e) => {
                tracing::warn!("availability probes disabled: {:#}", e);
                None
            },
        };

        Self {
            poller: Poller::new(transport, config.poll.clone()),
            cache: None,
            availability: config.availability.clone(),
            probe,
        }
    }

    /// Replace the transport used for availability probes
    pub fn with_probe_transport(mut self, probe: Arc<dyn Transport>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_cache(mut self, cache: Arc<EndpointCache<I>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<EndpointCache<I>>> {
        self.cache.as_ref()
    }

    /// Parse `raw_id` strictly and apply `mutation` to it
    pub async fn execute(
        &self,
        raw_id: &str,
        mutation: Mutation,
        cancel: &CancellationToken,
    ) -> Result<Outcome<I>, LifecycleError> {
        let id = I::parse(raw_id).map_err(|e| LifecycleError::new(Stage::Parse, raw_id, e.into()))?;
        self.run(id, mutation, cancel).await
    }

    /// Create a resource that must not exist yet.
    ///
    /// An existing resource fails with [`Error::AlreadyExists`] instead of
    /// being overwritten, so it can be imported instead.
    pub async fn create(
        &self,
        raw_id: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Outcome<I>, LifecycleError> {
        let id = I::parse(raw_id).map_err(|e| LifecycleError::new(Stage::Parse, raw_id, e.into()))?;
        let submit_error = |e: Error| LifecycleError::new(Stage::Submit, id.describe(), e);

        let response = self
            .poller
            .send_with_retry(&Request::get(id.id()))
            .await
            .map_err(&submit_error)?;
        match response.status {
            StatusCode::NOT_FOUND => {},
            status if status.is_success() => {
                return Err(submit_error(Error::AlreadyExists { id: id.id() }));
            },
            _ => return Err(submit_error(Error::from_response(&response))),
        }

        self.run(id, Mutation::Put(body), cancel).await
    }

    async fn run(
        &self,
        id: I,
        mutation: Mutation,
        cancel: &CancellationToken,
    ) -> Result<Outcome<I>, LifecycleError> {
        let started = Instant::now();
        let describe = id.describe();
        let request = mutation.request_for(id.id());
        tracing::info!("{} {}", request.method, describe);

        let result = match self.poller.submit(request).await {
            Ok(Submission::Completed(result)) => result,
            Ok(Submission::Accepted(mut op)) => self
                .poller
                .poll_until_done(&mut op, cancel)
                .await
                .map_err(|e| LifecycleError::new(Stage::Poll, &describe, e))?,
            Err(e) => return Err(LifecycleError::new(Stage::Submit, &describe, e)),
        };

        let Some(cache) = &self.cache else {
            return Ok(Outcome {
                id,
                result,
                endpoint: None,
            });
        };

        if mutation == Mutation::Delete {
            cache.invalidate_id(&id).await;
            return Ok(Outcome {
                id,
                result,
                endpoint: None,
            });
        }

        let endpoint = self
            .refresh_endpoint(cache, &id, &mutation, &result, cancel)
            .await
            .map_err(|e| LifecycleError::new(Stage::Resolve, &describe, e))?;

        if self.availability.enabled && matches!(mutation, Mutation::Put(_)) {
            match &self.probe {
                Some(probe) => {
                    let deadline = started + self.poller.config().timeout;
                    wait_until_available(probe.as_ref(), &endpoint, &self.availability, deadline, cancel)
                        .await
                        .map_err(|e| LifecycleError::new(Stage::Resolve, &describe, e))?;
                },
                None => tracing::warn!("skipping availability wait for {}", describe),
            }
        }

        Ok(Outcome {
            id,
            result,
            endpoint: Some(endpoint),
        })
    }

    /// Bring the cache entry for `id` up to date after a successful change
    async fn refresh_endpoint(
        &self,
        cache: &EndpointCache<I>,
        id: &I,
        mutation: &Mutation,
        result: &OperationResult,
        cancel: &CancellationToken,
    ) -> crate::error::Result<String> {
        if matches!(mutation, Mutation::Action { .. }) {
            return cache.resolve(id, cancel).await;
        }

        // a write may have moved the endpoint
        cache.invalidate_id(id).await;
        let reported = result
            .body
            .clone()
            .and_then(|body| ResourcePayload::from_value(body).ok())
            .and_then(|payload| payload.endpoint().map(str::to_string));

        match reported {
            Some(endpoint) => {
                cache.insert(id.clone(), endpoint.clone()).await;
                Ok(endpoint)
            },
            None => cache.resolve(id, cancel).await,
        }
    }
}
