//! Classifier read operations
//!
//! Stateless composition of resolver, locator and fetcher. Each operation
//! validates the caller identity before touching either store.

use crate::config::ServiceConfig;
use crate::fetcher::ArtifactFetcher;
use crate::locator::{ArtifactDescriptor, ArtifactLocator};
use crate::models::{Classifier, Graph, GraphData, SessionRef};
use crate::resolver::ClassifierResolver;
use crate::validate::{require_name, require_session, require_user};
use ai4ng_common::object_store::ObjectStore;
use ai4ng_common::store::RecordStore;
use ai4ng_common::{Error, Result};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ClassifierService {
    resolver: ClassifierResolver,
    locator: ArtifactLocator,
    fetcher: ArtifactFetcher,
    fetch_concurrency: usize,
}

impl ClassifierService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        config: &ServiceConfig,
    ) -> Self {
        let timeout = config.limits.request_timeout();
        Self {
            resolver: ClassifierResolver::new(
                Arc::clone(&records),
                config.classifier_table.clone(),
                timeout,
            ),
            locator: ArtifactLocator::new(records, config.file_index.clone(), timeout),
            fetcher: ArtifactFetcher::new(objects, timeout),
            fetch_concurrency: config.limits.fetch_concurrency.max(1),
        }
    }

    pub async fn list_classifiers(&self, user_id: &str) -> Result<Vec<Classifier>> {
        let classifiers = self.resolver.list_by_user(user_id).await?;
        info!(user_id, count = classifiers.len(), "Listed classifiers");
        Ok(classifiers)
    }

    /// One classifier with its graph descriptors attached
    pub async fn get_classifier(&self, user_id: &str, classifier_id: i64) -> Result<Classifier> {
        let mut classifier = self.resolver.get_by_id(user_id, classifier_id).await?;
        classifier.graphs = self.graph_descriptors(user_id, &artifact_key(&classifier)).await;
        Ok(classifier)
    }

    /// Most recent classifier of a session with its graph descriptors attached
    pub async fn get_classifier_by_session(
        &self,
        user_id: &str,
        session: &SessionRef,
    ) -> Result<Classifier> {
        let mut classifier = self.resolver.get_by_session(user_id, session).await?;
        classifier.graphs = self.graph_descriptors(user_id, &artifact_key(&classifier)).await;
        Ok(classifier)
    }

    /// Allow-listed image artifacts of a session, base64-encoded
    ///
    /// Artifacts that fail to fetch are logged and left out.
    pub async fn list_graphs(&self, user_id: &str, session: &SessionRef) -> Result<Vec<Graph>> {
        let key = self.artifact_session(user_id, session).await?;
        let descriptors: Vec<ArtifactDescriptor> = self
            .locator
            .list_descriptors(user_id, &key, None)
            .await?
            .into_iter()
            .filter(|d| d.is_allow_listed() && !d.is_json())
            .collect();

        let fetcher = &self.fetcher;
        let graphs = self
            .fetch_all(descriptors, |d| async move {
                fetcher
                    .fetch_binary(&d.path)
                    .await
                    .map(|data| Graph { name: d.name, data })
            })
            .await;
        info!(user_id, session = %session, count = graphs.len(), "Fetched graphs");
        Ok(graphs)
    }

    /// Allow-listed JSON artifacts of a session, parsed
    pub async fn list_graph_data(
        &self,
        user_id: &str,
        session: &SessionRef,
    ) -> Result<Vec<GraphData>> {
        let key = self.artifact_session(user_id, session).await?;
        let descriptors: Vec<ArtifactDescriptor> = self
            .locator
            .list_descriptors(user_id, &key, Some("json"))
            .await?
            .into_iter()
            .filter(ArtifactDescriptor::is_allow_listed)
            .collect();

        let fetcher = &self.fetcher;
        let graph_data = self
            .fetch_all(descriptors, |d| async move {
                fetcher
                    .fetch_json(&d.path)
                    .await
                    .map(|data| GraphData { name: d.name, data })
            })
            .await;
        info!(user_id, session = %session, count = graph_data.len(), "Fetched graph data");
        Ok(graph_data)
    }

    /// Names of every artifact indexed for a session
    pub async fn list_graph_names(&self, user_id: &str, session: &SessionRef) -> Result<Vec<String>> {
        let key = self.artifact_session(user_id, session).await?;
        let descriptors = self.locator.list_descriptors(user_id, &key, None).await?;
        Ok(descriptors.into_iter().map(|d| d.name).collect())
    }

    /// One image artifact by name, base64-encoded
    pub async fn get_graph(&self, user_id: &str, session: &SessionRef, name: &str) -> Result<Graph> {
        self.check_named(user_id, session, name)?;
        let key = self.artifact_session(user_id, session).await?;
        let descriptor = self.locator.find_descriptor(user_id, &key, name, false).await?;
        let data = self.fetcher.fetch_binary(&descriptor.path).await?;
        Ok(Graph {
            name: descriptor.name,
            data,
        })
    }

    /// One JSON artifact by name, parsed
    pub async fn get_graph_data(
        &self,
        user_id: &str,
        session: &SessionRef,
        name: &str,
    ) -> Result<GraphData> {
        self.check_named(user_id, session, name)?;
        let key = self.artifact_session(user_id, session).await?;
        let descriptor = self.locator.find_descriptor(user_id, &key, name, true).await?;
        let data = self.fetcher.fetch_json(&descriptor.path).await?;
        Ok(GraphData {
            name: descriptor.name,
            data,
        })
    }

    fn check_named(&self, user_id: &str, session: &SessionRef, name: &str) -> Result<()> {
        require_user(user_id)?;
        require_session(session)?;
        require_name(name, "graph name")
    }

    /// Session reference under which the file index keys a session's artifacts
    ///
    /// The file index is keyed by session id, so a session name is first
    /// resolved to the id of its most recent classifier. A name that no
    /// classifier carries is kept as is: older uploads used the name as the
    /// session id.
    async fn artifact_session(&self, user_id: &str, session: &SessionRef) -> Result<SessionRef> {
        require_user(user_id)?;
        require_session(session)?;
        match session {
            SessionRef::Numeric(_) => Ok(session.clone()),
            SessionRef::Name(name) => match self.resolver.get_by_session(user_id, session).await {
                Ok(classifier) => {
                    let key = artifact_key(&classifier);
                    debug!(user_id, session = %name, key = %key, "Resolved session name");
                    Ok(key)
                }
                Err(Error::NotFound(_)) => Ok(session.clone()),
                Err(e) => Err(e),
            },
        }
    }

    /// Storage paths of a session's artifacts as graph placeholders
    ///
    /// Attached to an already resolved classifier, so a failure here only
    /// costs the graph list, never the classifier.
    async fn graph_descriptors(&self, user_id: &str, session: &SessionRef) -> Option<Vec<Graph>> {
        match self.locator.list_descriptors(user_id, session, None).await {
            Ok(descriptors) => Some(
                descriptors
                    .into_iter()
                    .map(|d| Graph {
                        name: d.name,
                        data: d.path,
                    })
                    .collect(),
            ),
            Err(e) => {
                warn!(user_id, session = %session, error = %e, "Graph descriptors unavailable");
                None
            }
        }
    }

    /// Fetch every descriptor with bounded parallelism
    ///
    /// Results keep discovery order; failed fetches are logged and dropped.
    async fn fetch_all<T, F, Fut>(&self, descriptors: Vec<ArtifactDescriptor>, fetch: F) -> Vec<T>
    where
        F: Fn(ArtifactDescriptor) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        stream::iter(descriptors)
            .map(|descriptor| {
                let path = descriptor.path.clone();
                let pending = fetch(descriptor);
                async move {
                    match pending.await {
                        Ok(value) => Some(value),
                        Err(e) => {
                            warn!(path = %path, error = %e, "Skipping artifact that failed to fetch");
                            None
                        }
                    }
                }
            })
            .buffered(self.fetch_concurrency)
            .filter_map(|fetched| async move { fetched })
            .collect()
            .await
    }
}

/// File index key of a resolved classifier's session
fn artifact_key(classifier: &Classifier) -> SessionRef {
    if classifier.session_id > 0 {
        SessionRef::Numeric(classifier.session_id)
    } else {
        SessionRef::Name(classifier.session_name.clone())
    }
}
