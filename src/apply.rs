use crate::browser::{Control, PageDriver};
use crate::config::Settings;
use log::{debug, info, warn};
use std::time::Duration;

/// Where one quick-apply attempt is, or ended up. `Submitted`, `Abandoned`
/// and `Failed` are terminal; a terminal session is never reopened for the
/// same record within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Opened,
    InStep,
    ReviewPending,
    Submitted,
    Abandoned,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Submitted | SessionState::Abandoned | SessionState::Failed
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ApplicationSession {
    pub state: SessionState,
    /// Wizard-step clicks performed, bounded by `max_wizard_steps`.
    pub steps_taken: u32,
}

/// Drive the multi-step apply wizard to completion or safe abandonment.
///
/// A missing quick-apply control or a dialog that never opens is expected
/// (external-apply jobs, stale cards) and abandons; a broken interaction
/// fails. At each step the submit affordance is checked before "continue"
/// so the wizard cannot click "next" past its submit screen. Steps that
/// present no recognized affordance (including forms waiting on mandatory
/// input, which this machine does not fill) dismiss the dialog and abandon.
pub async fn run_session<D: PageDriver>(driver: &D, settings: &Settings) -> ApplicationSession {
    let mut session = ApplicationSession { state: SessionState::NotStarted, steps_taken: 0 };
    let modal_wait = Duration::from_millis(settings.modal_wait_ms);

    match driver.click(Control::QuickApply).await {
        Ok(true) => {}
        Ok(false) => {
            debug!("No quick-apply control present, abandoning");
            session.state = SessionState::Abandoned;
            return session;
        }
        Err(e) => {
            warn!("Quick-apply click broke: {e:#}");
            session.state = SessionState::Failed;
            return session;
        }
    }

    driver.settle(modal_wait).await;
    match confirm_modal(driver, modal_wait).await {
        Ok(true) => session.state = SessionState::Opened,
        Ok(false) => {
            debug!("Application dialog never opened, abandoning");
            session.state = SessionState::Abandoned;
            return session;
        }
        Err(e) => {
            warn!("Dialog check broke: {e:#}");
            session.state = SessionState::Failed;
            return session;
        }
    }

    for _ in 0..settings.max_wizard_steps {
        session.state = match session.state {
            SessionState::ReviewPending => SessionState::ReviewPending,
            _ => SessionState::InStep,
        };

        match step(driver, &mut session, modal_wait).await {
            Ok(StepOutcome::Submitted) => {
                info!("Application submitted after {} step(s)", session.steps_taken);
                session.state = SessionState::Submitted;
                return session;
            }
            Ok(StepOutcome::Advanced) => continue,
            Ok(StepOutcome::Unrecognized) => {
                debug!("No recognized affordance at step {}, dismissing", session.steps_taken);
                return abandon(driver, session).await;
            }
            Err(e) => {
                warn!("Wizard interaction broke: {e:#}");
                return fail(driver, session).await;
            }
        }
    }

    debug!("Wizard step budget exhausted without submit, dismissing");
    abandon(driver, session).await
}

enum StepOutcome {
    Submitted,
    Advanced,
    Unrecognized,
}

async fn step<D: PageDriver>(
    driver: &D,
    session: &mut ApplicationSession,
    modal_wait: Duration,
) -> anyhow::Result<StepOutcome> {
    // Submit wins over continue.
    if driver.click(Control::Submit).await? {
        session.steps_taken += 1;
        driver.settle(modal_wait).await;
        return Ok(StepOutcome::Submitted);
    }
    if driver.click(Control::Continue).await? {
        session.steps_taken += 1;
        driver.settle(modal_wait).await;
        return Ok(StepOutcome::Advanced);
    }
    if driver.click(Control::Review).await? {
        session.steps_taken += 1;
        session.state = SessionState::ReviewPending;
        driver.settle(modal_wait).await;
        return Ok(StepOutcome::Advanced);
    }
    Ok(StepOutcome::Unrecognized)
}

async fn abandon<D: PageDriver>(driver: &D, mut session: ApplicationSession) -> ApplicationSession {
    dismiss(driver).await;
    session.state = SessionState::Abandoned;
    session
}

async fn fail<D: PageDriver>(driver: &D, mut session: ApplicationSession) -> ApplicationSession {
    dismiss(driver).await;
    session.state = SessionState::Failed;
    session
}

async fn dismiss<D: PageDriver>(driver: &D) {
    // Best effort; a dialog that will not close changes nothing terminal.
    if let Err(e) = driver.click(Control::Dismiss).await {
        debug!("Dismiss failed: {e:#}");
    }
}

async fn confirm_modal<D: PageDriver>(driver: &D, wait: Duration) -> anyhow::Result<bool> {
    if driver.modal_open().await? {
        return Ok(true);
    }
    // One more bounded wait before giving up on the dialog.
    driver.settle(wait).await;
    driver.modal_open().await
}
