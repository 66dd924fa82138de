//! Classifier record resolution
//!
//! Every lookup is scoped to the caller: the owner predicate goes into the
//! store call, and ownership is checked again on each returned item so a
//! loosely selective index or a fallback scan can never leak another user's
//! record.

use crate::accessors::{item_integer, item_number, item_string};
use crate::config::ClassifierTableConfig;
use crate::lookup::LookupPlan;
use crate::mapper::{attr, decode, decode_batch};
use crate::models::{Classifier, SessionRef};
use crate::validate::{require_positive, require_session, require_user};
use ai4ng_common::store::{AttributeValue, Condition, Item, QueryRequest, RecordStore, ScanRequest};
use ai4ng_common::{Error, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct ClassifierResolver {
    store: Arc<dyn RecordStore>,
    table: ClassifierTableConfig,
    timeout: Duration,
}

impl ClassifierResolver {
    pub fn new(store: Arc<dyn RecordStore>, table: ClassifierTableConfig, timeout: Duration) -> Self {
        Self {
            store,
            table,
            timeout,
        }
    }

    /// All classifiers owned by `user_id`, in discovery order
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Classifier>> {
        require_user(user_id)?;

        let outcome = self
            .list_by_user_plan(user_id)
            .execute(self.store.as_ref(), self.timeout)
            .await?;
        let owned = retain_owned(outcome.items, user_id);
        Ok(decode_batch(&owned))
    }

    /// The classifier with `classifier_id`, if owned by `user_id`
    pub async fn get_by_id(&self, user_id: &str, classifier_id: i64) -> Result<Classifier> {
        require_user(user_id)?;
        require_positive(classifier_id, "classifier id")?;

        let outcome = self
            .get_by_id_plan(user_id, classifier_id)
            .execute(self.store.as_ref(), self.timeout)
            .await?;
        let item = retain_owned(outcome.items, user_id)
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("classifier {}", classifier_id)))?;
        decode_single(&item, &format!("classifier {}", classifier_id))
    }

    /// Most recent classifier of a session owned by `user_id`
    pub async fn get_by_session(&self, user_id: &str, session: &SessionRef) -> Result<Classifier> {
        require_user(user_id)?;
        require_session(session)?;

        let plan = match session {
            SessionRef::Numeric(id) => self.session_id_plan(user_id, *id),
            SessionRef::Name(name) => self.session_name_plan(user_id, name),
        };
        let outcome = plan.execute(self.store.as_ref(), self.timeout).await?;
        debug!(user_id, session = %session, candidates = outcome.items.len(), "Session lookup");

        let item = pick_most_recent(retain_owned(outcome.items, user_id))
            .ok_or_else(|| Error::not_found(format!("classifier for session {}", session)))?;
        decode_single(&item, &format!("session {}", session))
    }

    pub fn list_by_user_plan(&self, user_id: &str) -> LookupPlan {
        let table = &self.table.table_name;
        LookupPlan::new("list classifiers by user")
            .index(self.table.user_index.as_deref(), |_| {
                QueryRequest::new(table).key(owner(user_id))
            })
            .scan(self.table.allow_scan, || {
                ScanRequest::new(table).filter(owner(user_id))
            })
    }

    pub fn get_by_id_plan(&self, user_id: &str, classifier_id: i64) -> LookupPlan {
        let table = &self.table.table_name;
        let id = || Condition::eq(attr::CLASSIFIER_ID, AttributeValue::n(classifier_id));
        LookupPlan::new("get classifier by id")
            .primary_key(self.table.primary_key_lookup, || {
                QueryRequest::new(table)
                    .key(Condition::eq(&self.table.primary_key, AttributeValue::n(classifier_id)))
                    .filter(owner(user_id))
                    .limit(1)
            })
            .index(self.table.user_index.as_deref(), |_| {
                QueryRequest::new(table)
                    .key(owner(user_id))
                    .filter(id())
                    .limit(1)
            })
            .scan(self.table.allow_scan, || {
                ScanRequest::new(table)
                    .filter(id())
                    .filter(owner(user_id))
                    .limit(1)
            })
    }

    pub fn session_id_plan(&self, user_id: &str, session_id: i64) -> LookupPlan {
        let table = &self.table.table_name;
        LookupPlan::new("get classifier by session id")
            .index(self.table.session_index.as_deref(), |_| {
                QueryRequest::new(table)
                    .key(Condition::eq(attr::SESSION_ID, AttributeValue::n(session_id)))
                    .filter(owner(user_id))
                    .descending()
                    .limit(1)
            })
            .scan(self.table.allow_scan, || {
                // Older writers stored the session id as text
                ScanRequest::new(table)
                    .filter(Condition::any_of(vec![
                        Condition::eq(attr::SESSION_ID, AttributeValue::n(session_id)),
                        Condition::eq(attr::SESSION_ID, AttributeValue::s(session_id.to_string())),
                    ]))
                    .filter(owner(user_id))
            })
    }

    pub fn session_name_plan(&self, user_id: &str, name: &str) -> LookupPlan {
        let table = &self.table.table_name;
        LookupPlan::new("get classifier by session name")
            .index(self.table.session_name_index.as_deref(), |_| {
                QueryRequest::new(table)
                    .key(Condition::eq(attr::SESSION_NAME, name))
                    .filter(owner(user_id))
                    .descending()
                    .limit(1)
            })
            .scan(self.table.allow_scan, || {
                ScanRequest::new(table)
                    .filter(Condition::any_of(vec![
                        Condition::eq(attr::SESSION_NAME, name),
                        Condition::eq(attr::SESSION_ID, name),
                    ]))
                    .filter(owner(user_id))
            })
    }
}

fn owner(user_id: &str) -> Condition {
    Condition::eq(attr::USER_ID, user_id)
}

/// Drop items not owned by `user_id`
pub fn retain_owned(items: Vec<Item>, user_id: &str) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| {
            let owned = item_string(item, attr::USER_ID).as_deref() == Some(user_id);
            if !owned {
                warn!(user_id, "Store returned a record owned by another user; dropping it");
            }
            owned
        })
        .collect()
}

/// Most recent item: highest `timestamp`, then highest `classifierId`,
/// then earliest discovered
pub fn pick_most_recent(items: Vec<Item>) -> Option<Item> {
    let rank = |item: &Item| {
        (
            item_number(item, attr::TIMESTAMP).unwrap_or(f64::NEG_INFINITY),
            item_integer(item, attr::CLASSIFIER_ID).unwrap_or(i64::MIN),
        )
    };

    let mut best: Option<(Item, (f64, i64))> = None;
    for item in items {
        let candidate = rank(&item);
        let newer = match &best {
            None => true,
            Some((_, current)) => {
                candidate
                    .0
                    .total_cmp(&current.0)
                    .then(candidate.1.cmp(&current.1))
                    == Ordering::Greater
            }
        };
        if newer {
            best = Some((item, candidate));
        }
    }
    best.map(|(item, _)| item)
}

/// Decode a record found by a single lookup
///
/// A record that exists but cannot be decoded is not the same as no record,
/// so it surfaces as an unexpected error rather than not-found.
fn decode_single(item: &Item, what: &str) -> Result<Classifier> {
    decode(item).map_err(|e| {
        warn!(record = what, error = %e, "Stored record could not be decoded");
        Error::unexpected(format!("record for {} could not be decoded: {}", what, e))
    })
}
