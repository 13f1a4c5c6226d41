use crate::utils::KycError;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Run an engine call, giving up after `limit` when one is set.
///
/// The call runs on its own worker thread so a stuck engine cannot hold the
/// request past the limit. The worker is detached on timeout and its result
/// is dropped when it eventually finishes. A worker that dies without a
/// result is reported through `lost`, so each engine keeps its own kind.
pub fn call_bounded<T, F>(
    stage: &'static str,
    limit: Option<Duration>,
    lost: fn(String) -> KycError,
    f: F,
) -> Result<T, KycError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, KycError> + Send + 'static,
{
    let Some(limit) = limit else {
        return f();
    };

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("hawiya-{}", stage))
        .spawn(move || {
            let _ = tx.send(f());
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(KycError::StageTimeout { stage, limit }),
        Err(RecvTimeoutError::Disconnected) => Err(lost(format!(
            "worker for stage '{}' stopped without a result",
            stage
        ))),
    }
}
