//! In-memory backend for resource tests
//!
//! Stores status pages in a map and lets a test script the responses of
//! upcoming reads, to simulate replicas that lag behind a write.

use super::{ApiError, Monitor, Psp, PspBackend, PspPayload};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeBackend {
    pub psps: Mutex<HashMap<i64, Psp>>,
    /// Served by get_psp before the stored page, one per call
    pub scripted_reads: Mutex<VecDeque<Result<Psp, ApiError>>>,
    /// Monitors that exist
    pub monitors: Mutex<HashSet<i64>>,
    /// Monitors whose lookup is refused
    pub forbidden_monitors: Mutex<HashSet<i64>>,
    /// Existing monitors the API silently refuses to attach
    pub unattachable: Mutex<HashSet<i64>>,
    pub fail_delete: Mutex<bool>,
    /// Deleted pages keep being served this many more times
    pub ghost_reads_after_delete: Mutex<u32>,
    pub calls: Mutex<Vec<String>>,
    pub payloads: Mutex<Vec<PspPayload>>,
    next_id: Mutex<i64>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitors(ids: &[i64]) -> Self {
        let backend = Self::new();
        backend.monitors.lock().unwrap().extend(ids);
        backend
    }

    pub fn insert(&self, psp: Psp) {
        self.psps.lock().unwrap().insert(psp.id, psp);
    }

    pub fn script_read(&self, response: Result<Psp, ApiError>) {
        self.scripted_reads.lock().unwrap().push_back(response);
    }

    pub fn stored(&self, id: i64) -> Option<Psp> {
        self.psps.lock().unwrap().get(&id).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn attachable(&self, ids: &[i64]) -> Vec<i64> {
        let monitors = self.monitors.lock().unwrap();
        let unattachable = self.unattachable.lock().unwrap();
        ids.iter()
            .copied()
            .filter(|id| monitors.contains(id) && !unattachable.contains(id))
            .collect()
    }

    fn apply(&self, psp: &mut Psp, payload: &PspPayload) {
        if let Some(name) = payload.friendly_name.value() {
            psp.friendly_name = name.clone();
        }
        if let Some(status) = payload.status.value() {
            psp.status = Some(status.clone());
        }
        if let Some(ids) = payload.monitor_ids.value() {
            psp.monitor_ids = Some(self.attachable(ids));
        }
        if !payload.custom_domain.is_absent() {
            psp.custom_domain = payload.custom_domain.value().cloned();
        }
        if let Some(sort) = payload.sort.value() {
            psp.sort = Some(sort.clone());
        }
        if let Some(hide) = payload.hide_url_links.value() {
            psp.hide_url_links = Some(*hide);
        }
        if !payload.password.is_absent() {
            psp.is_password_set = Some(payload.password.value().is_some());
        }
        if let Some(settings) = payload.custom_settings.value() {
            psp.custom_settings = Some(settings.clone());
        }
    }
}

#[async_trait]
impl PspBackend for FakeBackend {
    async fn get_psp(&self, id: i64) -> Result<Psp, ApiError> {
        self.record(format!("get_psp {}", id));
        if let Some(scripted) = self.scripted_reads.lock().unwrap().pop_front() {
            return scripted;
        }
        self.stored(id).ok_or(ApiError::NotFound {
            path: format!("/psps/{}", id),
        })
    }

    async fn create_psp(&self, payload: &PspPayload) -> Result<Psp, ApiError> {
        self.record("create_psp".to_string());
        self.payloads.lock().unwrap().push(payload.clone());
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            100 + *next
        };
        let mut psp = Psp {
            id,
            url_key: Some(format!("key{}", id)),
            status: Some("ENABLED".to_string()),
            ..Default::default()
        };
        self.apply(&mut psp, payload);
        self.insert(psp.clone());
        Ok(psp)
    }

    async fn update_psp(&self, id: i64, payload: &PspPayload) -> Result<Psp, ApiError> {
        self.record(format!("update_psp {}", id));
        self.payloads.lock().unwrap().push(payload.clone());
        let mut psp = self.stored(id).ok_or(ApiError::NotFound {
            path: format!("/psps/{}", id),
        })?;
        self.apply(&mut psp, payload);
        self.insert(psp.clone());
        Ok(psp)
    }

    async fn delete_psp(&self, id: i64) -> Result<(), ApiError> {
        self.record(format!("delete_psp {}", id));
        if *self.fail_delete.lock().unwrap() {
            return Err(ApiError::ServiceUnavailable);
        }
        let removed = self.psps.lock().unwrap().remove(&id);
        let ghosts = *self.ghost_reads_after_delete.lock().unwrap();
        if let Some(psp) = removed {
            for _ in 0..ghosts {
                self.script_read(Ok(psp.clone()));
            }
            Ok(())
        } else {
            Err(ApiError::NotFound {
                path: format!("/psps/{}", id),
            })
        }
    }

    async fn get_monitor(&self, id: i64) -> Result<Monitor, ApiError> {
        self.record(format!("get_monitor {}", id));
        if self.forbidden_monitors.lock().unwrap().contains(&id) {
            return Err(ApiError::Forbidden {
                code: Some("MONITOR_FORBIDDEN".to_string()),
                message: "monitor belongs to another account".to_string(),
            });
        }
        if self.monitors.lock().unwrap().contains(&id) {
            Ok(Monitor {
                id,
                friendly_name: Some(format!("monitor {}", id)),
                status: Some("UP".to_string()),
            })
        } else {
            Err(ApiError::NotFound {
                path: format!("/monitors/{}", id),
            })
        }
    }
}
