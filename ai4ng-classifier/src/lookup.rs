//! Ordered lookup strategies with fallback
//!
//! A logical lookup is a [`LookupPlan`]: the strategies a deployment can
//! serve it with, most efficient first. Strategies whose capability is not
//! configured are never added to the plan. At execution time a strategy whose
//! index turns out not to exist is skipped with a warning; the first strategy
//! that runs decides the result, even when that result is empty.

use crate::deadline::within;
use ai4ng_common::store::{Item, QueryRequest, RecordStore, ScanRequest, StoreError};
use ai4ng_common::{Error, Result};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// One concrete way of querying the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStrategy {
    PrimaryKey,
    Index(String),
    Scan,
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupStrategy::PrimaryKey => write!(f, "primary key"),
            LookupStrategy::Index(name) => write!(f, "index {}", name),
            LookupStrategy::Scan => write!(f, "scan"),
        }
    }
}

#[derive(Debug, Clone)]
enum StepRequest {
    Query(QueryRequest),
    Scan(ScanRequest),
}

#[derive(Debug, Clone)]
struct LookupStep {
    strategy: LookupStrategy,
    request: StepRequest,
}

/// Items returned by the strategy that served a lookup
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub strategy: LookupStrategy,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct LookupPlan {
    operation: &'static str,
    steps: Vec<LookupStep>,
}

impl LookupPlan {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            steps: Vec::new(),
        }
    }

    /// Add a primary-key query when the deployment allows it
    pub fn primary_key(mut self, enabled: bool, build: impl FnOnce() -> QueryRequest) -> Self {
        if enabled {
            self.steps.push(LookupStep {
                strategy: LookupStrategy::PrimaryKey,
                request: StepRequest::Query(build()),
            });
        }
        self
    }

    /// Add a secondary-index query when the index is configured
    pub fn index(mut self, index: Option<&str>, build: impl FnOnce(&str) -> QueryRequest) -> Self {
        if let Some(name) = index {
            let request = build(name).index(name);
            self.steps.push(LookupStep {
                strategy: LookupStrategy::Index(name.to_string()),
                request: StepRequest::Query(request),
            });
        }
        self
    }

    /// Add a filtered full scan when scans are permitted
    pub fn scan(mut self, enabled: bool, build: impl FnOnce() -> ScanRequest) -> Self {
        if enabled {
            self.steps.push(LookupStep {
                strategy: LookupStrategy::Scan,
                request: StepRequest::Scan(build()),
            });
        }
        self
    }

    pub fn strategies(&self) -> Vec<LookupStrategy> {
        self.steps.iter().map(|s| s.strategy.clone()).collect()
    }

    /// Run the plan against `store`, each call bounded by `timeout`
    pub async fn execute(&self, store: &dyn RecordStore, timeout: Duration) -> Result<LookupOutcome> {
        for step in &self.steps {
            let what = format!("{} via {}", self.operation, step.strategy);
            let result = match &step.request {
                StepRequest::Query(request) => {
                    within(timeout, &what, StoreError::Unavailable, store.query(request)).await
                }
                StepRequest::Scan(request) => {
                    within(timeout, &what, StoreError::Unavailable, store.scan(request)).await
                }
            };

            match result {
                Ok(items) => {
                    debug!(
                        operation = self.operation,
                        strategy = %step.strategy,
                        count = items.len(),
                        "Lookup served"
                    );
                    return Ok(LookupOutcome {
                        strategy: step.strategy.clone(),
                        items,
                    });
                }
                Err(StoreError::IndexNotFound { table, index }) => {
                    warn!(
                        operation = self.operation,
                        table = %table,
                        index = %index,
                        "Index not present in this deployment, falling back"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::unexpected(format!(
            "no lookup strategy available for {}",
            self.operation
        )))
    }
}
