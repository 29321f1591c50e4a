//! Process-wide transport slot and the install/restore lifecycle

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock};

use super::Interceptor;
use crate::config::InterceptorConfig;
use crate::error::TransportError;
use crate::fetch::{ReqwestTransport, RequestInit, RequestInput, Response, Transport};

/// Transport every [`fetch`] call goes through.
static TRANSPORT: LazyLock<RwLock<Arc<dyn Transport>>> =
    LazyLock::new(|| RwLock::new(Arc::new(ReqwestTransport::default())));

/// The installed interceptor, if any. At most one at a time.
static ACTIVE: Mutex<Option<Installation>> = Mutex::new(None);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct Installation {
    id: u64,
    interceptor: Arc<Interceptor>,
    original: Arc<dyn Transport>,
}

/// Handle to an installed interceptor. Restoring is idempotent.
#[derive(Debug)]
#[must_use = "dropping the handle leaves the interceptor installed with no way to restore it"]
pub struct InterceptorHandle {
    id: u64,
}

impl InterceptorHandle {
    /// Put the transport that was active before [`install`] back in place.
    pub fn restore(&self) {
        restore(self);
    }

    pub fn is_active(&self) -> bool {
        lock_active()
            .as_ref()
            .is_some_and(|installation| installation.id == self.id)
    }
}

fn lock_active() -> std::sync::MutexGuard<'static, Option<Installation>> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_transport(transport: Arc<dyn Transport>) {
    *TRANSPORT.write().unwrap_or_else(PoisonError::into_inner) = transport;
}

/// The transport currently behind [`fetch`].
pub fn current_transport() -> Arc<dyn Transport> {
    Arc::clone(&TRANSPORT.read().unwrap_or_else(PoisonError::into_inner))
}

/// Perform a call through the process-wide transport, intercepted when an
/// interceptor is installed.
pub async fn fetch(
    input: impl Into<RequestInput>,
    init: RequestInit,
) -> Result<Response, TransportError> {
    let transport = current_transport();
    transport.fetch(input.into(), init).await
}

/// Intercept every subsequent [`fetch`] call with the given configuration.
///
/// An interceptor that is already installed is restored first, so layers
/// never stack.
pub fn install(config: InterceptorConfig) -> InterceptorHandle {
    let mut active = lock_active();

    if let Some(previous) = active.take() {
        tracing::debug!(id = previous.id, "Restoring previous interceptor before install");
        write_transport(previous.original);
    }

    let original = current_transport();
    let interceptor = Arc::new(Interceptor::new(config));
    write_transport(Arc::new(
        Arc::clone(&interceptor).wrap(Arc::clone(&original)),
    ));

    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        id,
        capture_request_body = interceptor.config().capture_request_body,
        capture_response_body = interceptor.config().capture_response_body,
        capture_headers = interceptor.config().capture_headers,
        max_body_size = interceptor.config().max_body_size,
        "Installed fetch interceptor"
    );
    *active = Some(Installation {
        id,
        interceptor,
        original,
    });

    InterceptorHandle { id }
}

/// Restore the transport saved by `handle`'s install. A no-op for handles
/// that were already restored or replaced by a later install.
pub fn restore(handle: &InterceptorHandle) {
    let mut active = lock_active();

    match active.take() {
        Some(installation) if installation.id == handle.id => {
            write_transport(installation.original);
            tracing::info!(id = handle.id, "Restored original fetch transport");
        }
        other => {
            *active = other;
            tracing::debug!(id = handle.id, "Interceptor handle not active, nothing to restore");
        }
    }
}

/// Replace the underlying transport. With an interceptor installed, the new
/// transport is placed behind it and becomes what a later restore returns to.
pub fn set_base_transport(transport: Arc<dyn Transport>) {
    let mut active = lock_active();

    match active.as_mut() {
        Some(installation) => {
            installation.original = Arc::clone(&transport);
            write_transport(Arc::new(
                Arc::clone(&installation.interceptor).wrap(transport),
            ));
        }
        None => write_transport(transport),
    }
}
