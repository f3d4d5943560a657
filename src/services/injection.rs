//! Real (logged) injections, as opposed to the explorer's trial ones.

use tracing::{info, warn};

use super::run_log::RunLog;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Change, InjectionPhase};
use crate::domain::ports::Injector;

/// Apply `changes`, log the ones that were written and return them.
pub async fn inject<I: Injector + ?Sized>(
    injector: &I,
    changes: &[Change],
    phase: InjectionPhase,
    log: &mut RunLog,
) -> DomainResult<Vec<Change>> {
    if changes.is_empty() {
        return Ok(Vec::new());
    }
    let outcome = injector.apply(changes).await?;
    for failed in &outcome.failed {
        warn!(change = %failed, %phase, "injection failed");
    }
    let applied: Vec<Change> = outcome.applied(changes).into_iter().cloned().collect();
    log.record_injection(phase, &applied);
    info!(%phase, injected = applied.len(), "annotations injected");
    Ok(applied)
}
