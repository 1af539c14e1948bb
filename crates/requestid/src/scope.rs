//! Task-local access to the identifier of the request being served.
//!
//! Code deep in a call stack often has no handle on the request. Inside
//! [`scope`], [`current`] returns the bound identifier for the whole task;
//! outside it returns `""`. Tasks spawned from a handler do not inherit the
//! scope and must be wrapped again if they need it.

use std::future::Future;

use crate::propagation::RequestId;

tokio::task_local! {
    static CURRENT: RequestId;
}

/// Run `future` with `request_id` as the task's current identifier.
pub async fn scope<F>(request_id: RequestId, future: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(request_id, future).await
}

/// Identifier of the request served by the current task, or `""`.
pub fn current() -> String {
    CURRENT
        .try_with(|request_id| request_id.as_str().to_owned())
        .unwrap_or_default()
}
