//! Action/response correlation
//!
//! A selection click and the AJAX response it provokes come from two event
//! sources. The listener has to exist before the click is issued, otherwise
//! a fast response can slip past. `ResponseCorrelator::arm` subscribes and
//! returns a `PendingCorrelation`; the only way to issue a correlated action
//! is `trigger_and_resolve`, which consumes that handle.

use std::future::Future;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace, warn};
use url::Url;

use cableguy_common::{
    CorrelationConfig, Error, ExtractedRecord, NetworkResponse, ResourceType, ResultExtractor,
};

use crate::driver::{BrowserDriver, ResponseStream};
use crate::error::{E2eError, E2eResult};

/// Decides whether an observed response is the one an action provoked
#[derive(Debug, Clone)]
pub struct ResponsePredicate {
    token: String,
    pattern: Regex,
    resource_types: Vec<ResourceType>,
}

impl ResponsePredicate {
    pub fn new(token: &str, resource_types: Vec<ResourceType>) -> E2eResult<Self> {
        let pattern = RegexBuilder::new(&regex::escape(token))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("endpoint token '{}': {}", token, e)))?;

        Ok(Self {
            token: token.to_string(),
            pattern,
            resource_types,
        })
    }

    pub fn from_config(config: &CorrelationConfig) -> E2eResult<Self> {
        config.validate()?;
        Self::new(&config.endpoint_token, config.resource_types.clone())
    }

    /// Success status, triggering resource type, endpoint token in the path.
    ///
    /// Host, query and fragment are never searched; an unparseable URL does
    /// not match.
    pub fn matches(&self, response: &NetworkResponse) -> bool {
        if !response.is_success() || !self.resource_types.contains(&response.resource_type) {
            return false;
        }
        match Url::parse(&response.url) {
            Ok(url) => self.pattern.is_match(url.path()),
            Err(e) => {
                trace!("Unparseable response URL {:?}: {}", response.url, e);
                false
            }
        }
    }

    pub fn describe(&self) -> String {
        self.token.clone()
    }
}

/// A listener registered before its action has been issued
#[derive(Debug)]
pub struct PendingCorrelation {
    receiver: ResponseStream,
    predicate: ResponsePredicate,
    timeout: Duration,
}

impl PendingCorrelation {
    pub fn new(receiver: ResponseStream, predicate: ResponsePredicate, timeout: Duration) -> Self {
        Self {
            receiver,
            predicate,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue the action once and wait for both it and the matching response.
    ///
    /// The armed timeout bounds the action and the response wait together;
    /// an action error ends the wait immediately.
    pub async fn trigger<F>(self, action: F) -> E2eResult<NetworkResponse>
    where
        F: Future<Output = E2eResult<()>>,
    {
        let Self {
            mut receiver,
            predicate,
            timeout,
        } = self;

        let correlated = async {
            let ((), response) = tokio::try_join!(action, next_match(&mut receiver, &predicate))?;
            Ok::<_, E2eError>(response)
        };

        match tokio::time::timeout(timeout, correlated).await {
            Ok(result) => result,
            Err(_) => Err(Error::ResponseTimeout {
                pattern: predicate.describe(),
                timeout_ms: timeout.as_millis() as u64,
            }
            .into()),
        }
    }
}

async fn next_match(
    receiver: &mut ResponseStream,
    predicate: &ResponsePredicate,
) -> E2eResult<NetworkResponse> {
    loop {
        match receiver.recv().await {
            Ok(response) if predicate.matches(&response) => {
                debug!("Correlated {} ({})", response.url, response.status);
                return Ok(response);
            }
            Ok(response) => {
                trace!(
                    "Ignoring {} ({}, {:?})",
                    response.url,
                    response.status,
                    response.resource_type
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Response listener lagged, {} responses dropped", skipped);
            }
            Err(RecvError::Closed) => {
                return Err(E2eError::Driver(
                    "response stream closed while waiting for correlation".to_string(),
                ));
            }
        }
    }
}

/// Arms listeners and turns correlated responses into records
#[derive(Debug, Clone)]
pub struct ResponseCorrelator {
    predicate: ResponsePredicate,
    timeout: Duration,
    extractor: ResultExtractor,
}

impl ResponseCorrelator {
    pub fn new(predicate: ResponsePredicate, timeout: Duration) -> Self {
        Self {
            predicate,
            timeout,
            extractor: ResultExtractor::default(),
        }
    }

    pub fn from_config(config: &CorrelationConfig) -> E2eResult<Self> {
        Ok(Self::new(
            ResponsePredicate::from_config(config)?,
            config.timeout(),
        ))
    }

    /// Register a listener on the driver's response stream
    pub fn arm<D: BrowserDriver + ?Sized>(&self, driver: &D) -> PendingCorrelation {
        self.arm_on(driver.subscribe_responses())
    }

    /// Register on an already obtained response stream
    pub fn arm_on(&self, receiver: ResponseStream) -> PendingCorrelation {
        PendingCorrelation::new(receiver, self.predicate.clone(), self.timeout)
    }

    /// Issue the action under an armed listener and extract the response
    pub async fn trigger_and_resolve<F>(
        &self,
        pending: PendingCorrelation,
        action: F,
    ) -> E2eResult<ExtractedRecord>
    where
        F: Future<Output = E2eResult<()>>,
    {
        let response = pending.trigger(action).await?;
        Ok(self.extractor.extract(&response)?)
    }
}
