use crate::models::user::Identity;
use crate::session::IDENTITY_KEY;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::{session_store, SessionStore};

/// Server-side session records keyed by session id
///
/// This is the store behind the cookie session layer. On top of the plain
/// load/save contract it can find every session of a user, which is how
/// role changes and account deletion end sessions held by other browsers.
/// Records live only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    records: Arc<DashMap<Id, Record>>,
}

fn owner(record: &Record) -> Option<i64> {
    record.data.get(IDENTITY_KEY)?.get("user_id")?.as_i64()
}

fn is_live(record: &Record, now: OffsetDateTime) -> bool {
    record.expiry_date > now
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the identity snapshot in every session of a user
    pub fn refresh_user(&self, identity: &Identity) -> Result<usize, serde_json::Error> {
        let snapshot = serde_json::to_value(identity)?;
        let mut refreshed = 0;
        for mut entry in self.records.iter_mut() {
            if owner(entry.value()) == Some(identity.user_id) {
                entry.data.insert(IDENTITY_KEY.to_string(), snapshot.clone());
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }

    /// Destroy every session belonging to a user
    pub fn destroy_user(&self, user_id: i64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| owner(record) != Some(user_id));
        before.saturating_sub(self.records.len())
    }

    /// Detach a session so that no request can use it while a dependent
    /// operation runs. Pair with `restore` if that operation fails.
    pub fn take(&self, id: &Id) -> Option<Record> {
        self.records.remove(id).map(|(_, record)| record)
    }

    pub fn restore(&self, record: Record) {
        self.records.insert(record.id, record);
    }

    pub fn cleanup_expired(&self, now: OffsetDateTime) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| is_live(record, now));
        before.saturating_sub(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SessionStore for SessionRegistry {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        // Session ID collision mitigation
        loop {
            match self.records.entry(record.id) {
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                    return Ok(());
                }
                Entry::Occupied(_) => record.id = Id::default(),
            }
        }
    }

    /// Updates a live record only. A session destroyed while a request was
    /// still holding it stays destroyed when that request finishes.
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        if let Some(mut stored) = self.records.get_mut(&record.id) {
            *stored = record.clone();
        }
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();

        match self.records.get(session_id) {
            Some(record) if is_live(record.value(), now) => return Ok(Some(record.value().clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        self.records
            .remove_if(session_id, |_, record| !is_live(record, now));
        Ok(None)
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
impl SessionRegistry {
    /// Session handle bound to this registry, as the layer would build it
    pub(crate) fn open(&self, id: Option<Id>) -> tower_sessions::Session {
        tower_sessions::Session::new(
            id,
            Arc::new(self.clone()),
            Some(tower_sessions::Expiry::OnInactivity(time::Duration::hours(1))),
        )
    }

    /// Store a logged-in session directly and return its id
    pub(crate) fn seed(&self, identity: &Identity) -> Id {
        let mut record = Record {
            id: Id::default(),
            data: [(IDENTITY_KEY.to_string(), serde_json::to_value(identity).unwrap())]
                .into_iter()
                .collect(),
            expiry_date: OffsetDateTime::now_utc() + time::Duration::hours(1),
        };
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        let id = record.id;
        self.records.insert(id, record);
        id
    }

    pub(crate) fn identity_of(&self, id: &Id) -> Option<Identity> {
        let record = self.records.get(id)?;
        serde_json::from_value(record.data.get(IDENTITY_KEY)?.clone()).ok()
    }
}
