//! Graph artifact lookup through the secondary file index

use crate::accessors::item_string;
use crate::config::FileIndexConfig;
use crate::lookup::LookupPlan;
use crate::mapper::attr;
use crate::models::SessionRef;
use crate::resolver::retain_owned;
use crate::validate::{require_session, require_user};
use ai4ng_common::store::{AttributeValue, Condition, Item, QueryRequest, RecordStore, ScanRequest};
use ai4ng_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Diagnostic artifacts the client knows how to render
pub const GRAPH_ALLOW_LIST: &[&str] = &[
    "DA plot (smoothed).png",
    "DA plot.png",
    "heatmap (Freq v4).png",
    "DA plot (smoothed).json",
    "DA plot.json",
    "heatmap (Freq v4).json",
];

const JSON_EXTENSION: &str = "json";

/// Where one artifact lives in the object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub path: String,
    /// Lower-case, without the leading dot; empty when the name has none
    pub extension: String,
}

impl ArtifactDescriptor {
    pub fn is_json(&self) -> bool {
        self.extension == JSON_EXTENSION
    }

    pub fn is_allow_listed(&self) -> bool {
        GRAPH_ALLOW_LIST
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&self.name))
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    /// Decode one file index record
    ///
    /// The name falls back to `fileName`, then to the last path segment.
    /// Records without a storage path are unusable and yield `None`.
    pub fn from_item(item: &Item) -> Option<Self> {
        let path = item_string(item, "path").or_else(|| item_string(item, "s3Key"));
        let name = item_string(item, "name").or_else(|| item_string(item, "fileName"));

        let Some(path) = path else {
            warn!(name = ?name, "Skipping indexed artifact without a storage path");
            return None;
        };
        let name = name.unwrap_or_else(|| {
            path.rsplit('/').next().unwrap_or(path.as_str()).to_string()
        });
        let extension = item_string(item, "extension")
            .map(|ext| normalize_extension(&ext))
            .unwrap_or_else(|| extension_of(&name));

        Some(Self {
            name,
            path,
            extension,
        })
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => normalize_extension(ext),
        _ => String::new(),
    }
}

pub struct ArtifactLocator {
    store: Arc<dyn RecordStore>,
    index: FileIndexConfig,
    timeout: Duration,
}

impl ArtifactLocator {
    pub fn new(store: Arc<dyn RecordStore>, index: FileIndexConfig, timeout: Duration) -> Self {
        Self {
            store,
            index,
            timeout,
        }
    }

    /// Artifacts indexed for a session owned by `user_id`, in discovery order
    ///
    /// With `extension` set, only artifacts of that extension are returned.
    /// The filter is applied after the extension is derived, so records that
    /// do not store one still match.
    pub async fn list_descriptors(
        &self,
        user_id: &str,
        session: &SessionRef,
        extension: Option<&str>,
    ) -> Result<Vec<ArtifactDescriptor>> {
        require_user(user_id)?;
        require_session(session)?;

        let outcome = self
            .session_plan(user_id, session)
            .execute(self.store.as_ref(), self.timeout)
            .await?;

        let wanted = extension.map(normalize_extension);
        let descriptors: Vec<ArtifactDescriptor> = retain_owned(outcome.items, user_id)
            .iter()
            .filter_map(ArtifactDescriptor::from_item)
            .filter(|d| wanted.as_deref().map_or(true, |ext| d.extension == ext))
            .collect();

        debug!(
            user_id,
            session = %session,
            strategy = %outcome.strategy,
            count = descriptors.len(),
            "Located artifacts"
        );
        Ok(descriptors)
    }

    /// Find one artifact by name
    ///
    /// Matches the full file name case-insensitively, or the bare stem when
    /// the artifact is of the requested kind (`json` or not). A full-name
    /// match wins over a stem match.
    pub async fn find_descriptor(
        &self,
        user_id: &str,
        session: &SessionRef,
        name: &str,
        json: bool,
    ) -> Result<ArtifactDescriptor> {
        let wanted = name.trim();
        let descriptors = self.list_descriptors(user_id, session, None).await?;

        let exact = descriptors
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(wanted));
        let by_stem = || {
            descriptors
                .iter()
                .position(|d| d.is_json() == json && d.stem().eq_ignore_ascii_case(wanted))
        };

        match exact.or_else(by_stem) {
            Some(pos) => Ok(descriptors[pos].clone()),
            None => Err(Error::not_found(format!(
                "artifact {} for session {}",
                wanted, session
            ))),
        }
    }

    fn session_plan(&self, user_id: &str, session: &SessionRef) -> LookupPlan {
        let table = &self.index.table_name;
        let key = session.as_key();
        LookupPlan::new("list artifacts by session")
            .index(self.index.session_index.as_deref(), |_| {
                QueryRequest::new(table)
                    .key(Condition::eq(attr::SESSION_ID, key.as_str()))
                    .filter(Condition::eq(attr::USER_ID, user_id))
            })
            .scan(self.index.allow_scan, || {
                let mut session_match = vec![Condition::eq(attr::SESSION_ID, key.as_str())];
                if let SessionRef::Numeric(id) = session {
                    session_match.push(Condition::eq(attr::SESSION_ID, AttributeValue::n(*id)));
                }
                ScanRequest::new(table)
                    .filter(Condition::any_of(session_match))
                    .filter(Condition::eq(attr::USER_ID, user_id))
            })
    }
}
