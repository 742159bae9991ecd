// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Session & Connection Pooling
 * Shared pooled client plus named cookie-bearing sessions
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::errors::FetchResult;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);
const MAX_REDIRECTS: usize = 5;

static USER_AGENT: &str = concat!("haavi/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
struct ClientSettings {
    timeout: Duration,
    ssl_verify: bool,
    max_idle_per_host: usize,
}

impl ClientSettings {
    fn from_config(config: &FetchConfig) -> Self {
        Self {
            timeout: config.timeout(),
            ssl_verify: config.ssl_verify,
            max_idle_per_host: config.max_connections_per_host,
        }
    }

    fn build(&self, cookie_jar: Option<Arc<Jar>>) -> FetchResult<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!self.ssl_verify)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .tcp_nodelay(true);

        if let Some(jar) = cookie_jar {
            builder = builder.cookie_provider(jar);
        }

        Ok(builder.build()?)
    }
}

/// Lazily-created pooled client shared by all non-session fetches.
///
/// Created on first use, reused until closed, recreated on the next use
/// after a close.
pub struct SharedClientPool {
    settings: ClientSettings,
    client: RwLock<Option<Client>>,
}

impl SharedClientPool {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            settings: ClientSettings::from_config(config),
            client: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> FetchResult<Client> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.client.write().await;
        // Double-checked: another task may have built it while we waited
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = self.settings.build(None)?;
        *guard = Some(client.clone());
        info!(
            max_idle_per_host = self.settings.max_idle_per_host,
            "created shared pooled client"
        );
        Ok(client)
    }

    pub async fn is_open(&self) -> bool {
        self.client.read().await.is_some()
    }

    pub async fn close(&self) {
        let mut guard = self.client.write().await;
        if guard.take().is_some() {
            debug!("shared pooled client closed");
        }
    }
}

/// Registry of named persistent sessions, each with its own cookie jar.
///
/// A session id maps to at most one live client; closing is idempotent.
pub struct SessionRegistry {
    settings: ClientSettings,
    sessions: RwLock<HashMap<String, Arc<Client>>>,
}

impl SessionRegistry {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            settings: ClientSettings::from_config(config),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the live client for `session_id`, creating one with a fresh
    /// cookie jar if absent.
    pub async fn get_or_create(&self, session_id: &str) -> FetchResult<Arc<Client>> {
        if let Some(client) = self.sessions.read().await.get(session_id) {
            return Ok(Arc::clone(client));
        }

        let mut sessions = self.sessions.write().await;
        if let Some(client) = sessions.get(session_id) {
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(self.settings.build(Some(Arc::new(Jar::default())))?);
        sessions.insert(session_id.to_string(), Arc::clone(&client));
        info!(session = session_id, "created persistent session");
        Ok(client)
    }

    /// Tear down a session. Returns whether one existed; closing a missing
    /// id is a no-op.
    pub async fn close(&self, session_id: &str) -> bool {
        let existed = self.sessions.write().await.remove(session_id).is_some();
        if existed {
            info!(session = session_id, "closed session");
        }
        existed
    }

    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            info!(count, "closed all sessions");
        }
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
