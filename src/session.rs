//! Verification session state machine.
//!
//! A session runs one attempt at a time: validate the key, look up the
//! public IP (diagnostic only), then query the search API with the key and
//! classify the answer. Each request runs as a spawned task that reports
//! back over a channel; the session itself is only ever mutated through
//! `&mut self` by the caller's control thread.
//!
//! Prompts are continuation states. After a redirect the session sits in
//! [`SessionState::ConfirmingRedirect`] until [`VerificationSession::confirm_redirect`]
//! is called; after a warning it sits in
//! [`SessionState::AwaitingAcknowledgment`] until
//! [`VerificationSession::acknowledge`].

use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classify::{classify, parse_ipv4, render_detail, status_text, Outcome};
use crate::config::ProbeConfig;
use crate::key::{self, Credential};
use crate::probe::{CompletedExchange, ErrorKind, Transport};

/// Which of the two checks is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    CheckingIp,
    CheckingCredential,
}

impl ProbeStage {
    /// Status line shown while this stage is in flight.
    pub const fn status(&self) -> &'static str {
        match self {
            ProbeStage::CheckingIp => "Checking IP...",
            ProbeStage::CheckingCredential => "Connecting...",
        }
    }
}

/// Final result of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Success,
    /// The key failed the format check; carries the reason.
    MalformedKey(String),
    /// Transport or HTTP failure, including a rejected key (HTTP 401,
    /// status "Invalid Auth Key").
    NetworkError { status: String, detail: String },
    /// The server answered OK with an unexpected body.
    Unrecognized(String),
    Cancelled,
}

impl SessionResult {
    /// Short status line for this result.
    pub fn status_text(&self) -> &str {
        match self {
            Self::Success => "Success!",
            Self::MalformedKey(_) => "Malformed Auth Key",
            Self::NetworkError { status, .. } => status,
            Self::Unrecognized(_) => "Unrecognized Response.",
            Self::Cancelled => "Canceled.",
        }
    }

    /// Detail report, for results that carry one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::NetworkError { detail, .. } | Self::Unrecognized(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Current state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Never started.
    Idle,
    /// A request for this stage is in flight.
    Probing(ProbeStage),
    /// A redirect came back; waiting for the user's decision.
    ConfirmingRedirect { stage: ProbeStage, target: Url },
    /// A warning is shown; waiting for the user to dismiss it.
    AwaitingAcknowledgment(SessionResult),
    /// Attempt over. A new one may be started.
    Finished(SessionResult),
}

/// A modal warning for the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub title: String,
    pub summary: String,
    pub detail: Option<String>,
}

/// Identifies one exchange within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(u64);

/// A finished exchange, as delivered by the spawned request task.
#[derive(Debug, Clone)]
pub struct Completion {
    pub exchange: ExchangeId,
    pub response: CompletedExchange,
}

/// The outstanding request.
#[derive(Debug)]
struct Exchange {
    id: ExchangeId,
    url: Url,
    cancelled: bool,
    task: JoinHandle<()>,
}

/// Operation not valid in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a verification is already in progress")]
    Busy,
    #[error("no request is pending")]
    NothingToCancel,
    #[error("no redirect is awaiting confirmation")]
    NoRedirectPending,
    #[error("no warning is awaiting acknowledgment")]
    NoWarningPending,
}

/// Receiver of everything the session wants shown to the user.
pub trait Presenter {
    /// Replace the status line.
    fn status_changed(&mut self, text: &str);

    /// Show a modal warning. The session waits in
    /// [`SessionState::AwaitingAcknowledgment`] until
    /// [`VerificationSession::acknowledge`] is called.
    fn blocking_warning(&mut self, warning: &Warning);

    /// Ask whether to follow a redirect. Answer with
    /// [`VerificationSession::confirm_redirect`].
    fn redirect_confirm(&mut self, target: &Url);

    /// Whether a new attempt may be started.
    fn connect_enabled(&mut self, enabled: bool);

    /// The key was accepted after trimming whitespace.
    fn key_corrected(&mut self, _credential: &Credential) {}
}

/// Drives one verification attempt at a time.
pub struct VerificationSession {
    transport: Arc<dyn Transport>,
    config: ProbeConfig,
    state: SessionState,
    credential: Option<Credential>,
    resolved_ip: Option<String>,
    exchange: Option<Exchange>,
    next_id: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl VerificationSession {
    /// Create an idle session.
    pub fn new(transport: Arc<dyn Transport>, config: ProbeConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            config,
            state: SessionState::Idle,
            credential: None,
            resolved_ip: None,
            exchange: None,
            next_id: 0,
            completions_tx,
            completions_rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Active stage while probing or confirming a redirect.
    pub fn stage(&self) -> Option<ProbeStage> {
        match &self.state {
            SessionState::Probing(stage) => Some(*stage),
            SessionState::ConfirmingRedirect { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Result of the current attempt, once known.
    pub fn result(&self) -> Option<&SessionResult> {
        match &self.state {
            SessionState::AwaitingAcknowledgment(result) | SessionState::Finished(result) => {
                Some(result)
            }
            _ => None,
        }
    }

    /// Public IP found by the IP check. `Some("")` means the check ran but
    /// returned nothing usable.
    pub fn resolved_ip(&self) -> Option<&str> {
        self.resolved_ip.as_deref()
    }

    /// Key accepted for the current attempt.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Id and URL of the live (not cancelled) exchange.
    pub fn current_exchange(&self) -> Option<(ExchangeId, &Url)> {
        self.exchange
            .as_ref()
            .filter(|ex| !ex.cancelled)
            .map(|ex| (ex.id, &ex.url))
    }

    /// Whether a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.current_exchange().is_some()
    }

    /// Whether a request or a prompt is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SessionState::Probing(_)
                | SessionState::ConfirmingRedirect { .. }
                | SessionState::AwaitingAcknowledgment(_)
        )
    }

    /// Begin a new attempt with the key as typed by the user.
    pub fn start(&mut self, raw_key: &str, presenter: &mut dyn Presenter) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        self.credential = None;
        self.resolved_ip = None;
        self.exchange = None;

        let normalized = match key::normalize(raw_key) {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!("malformed auth key: {}", err);
                presenter.status_changed("Malformed Auth Key");
                self.await_acknowledgment(
                    Warning {
                        title: "Malformed Auth Key".to_string(),
                        summary: err.guidance(),
                        detail: None,
                    },
                    SessionResult::MalformedKey(err.to_string()),
                    presenter,
                );
                return Ok(());
            }
        };

        let credential = normalized.credential;
        if normalized.corrected {
            info!(key = %credential.masked(), "trimmed whitespace around auth key");
            presenter.key_corrected(&credential);
            presenter.status_changed(&format!(
                "Malformed Auth Key. Continuing with fixed auth key: \"{}\"",
                credential
            ));
        }

        info!(key = %credential.masked(), "starting verification");
        self.credential = Some(credential);
        presenter.connect_enabled(false);
        self.enter_stage(ProbeStage::CheckingIp, self.config.ip_url.clone(), presenter);
        Ok(())
    }

    /// Abort the in-flight request.
    pub fn cancel(&mut self, presenter: &mut dyn Presenter) -> Result<(), SessionError> {
        let Some(exchange) = self.exchange.as_mut().filter(|ex| !ex.cancelled) else {
            return Err(SessionError::NothingToCancel);
        };
        exchange.cancelled = true;
        exchange.task.abort();
        info!(exchange = exchange.id.0, "request cancelled");

        presenter.status_changed(SessionResult::Cancelled.status_text());
        self.finish(SessionResult::Cancelled, presenter);
        Ok(())
    }

    /// Answer a pending redirect prompt.
    pub fn confirm_redirect(
        &mut self,
        accept: bool,
        presenter: &mut dyn Presenter,
    ) -> Result<(), SessionError> {
        let (stage, target) = match &self.state {
            SessionState::ConfirmingRedirect { stage, target } => (*stage, target.clone()),
            _ => return Err(SessionError::NoRedirectPending),
        };

        if accept {
            info!(location = %target, "following redirect");
            self.enter_stage(stage, target, presenter);
        } else {
            info!(location = %target, "redirect declined");
            presenter.status_changed(SessionResult::Cancelled.status_text());
            self.finish(SessionResult::Cancelled, presenter);
        }
        Ok(())
    }

    /// Dismiss a pending warning, ending the attempt.
    pub fn acknowledge(&mut self, presenter: &mut dyn Presenter) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::AwaitingAcknowledgment(result) => {
                self.finish(result, presenter);
                Ok(())
            }
            other => {
                self.state = other;
                Err(SessionError::NoWarningPending)
            }
        }
    }

    /// Handle every completion already delivered, without waiting.
    ///
    /// Call this in the event loop. Returns true if anything was handled.
    pub fn process_completions(&mut self, presenter: &mut dyn Presenter) -> bool {
        let mut handled = false;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.handle_completion(completion, presenter);
            handled = true;
        }
        handled
    }

    /// Wait for the next completion.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    /// Advance the state machine with a finished exchange.
    ///
    /// Completions for cancelled or superseded exchanges are dropped.
    pub fn handle_completion(&mut self, completion: Completion, presenter: &mut dyn Presenter) {
        let live = matches!(
            &self.exchange,
            Some(ex) if ex.id == completion.exchange && !ex.cancelled
        );
        let stage = match (&self.state, live) {
            (SessionState::Probing(stage), true) => *stage,
            _ => {
                debug!(exchange = completion.exchange.0, "discarding stale completion");
                return;
            }
        };
        self.exchange = None;

        let response = completion.response;
        match (classify(&response), stage) {
            (Outcome::Redirect(target), stage) => {
                info!(location = %target, ?stage, "server redirected");
                presenter.status_changed("Redirecting...");
                presenter.redirect_confirm(&target);
                self.state = SessionState::ConfirmingRedirect { stage, target };
            }
            (outcome, ProbeStage::CheckingIp) => self.finish_ip_check(&response, &outcome, presenter),
            (outcome, ProbeStage::CheckingCredential) => {
                self.finish_credential_check(&response, outcome, presenter)
            }
        }
    }

    fn finish_ip_check(
        &mut self,
        response: &CompletedExchange,
        outcome: &Outcome,
        presenter: &mut dyn Presenter,
    ) {
        let ip = if outcome.is_failure() {
            None
        } else {
            parse_ipv4(&response.body)
        };
        match ip {
            Some(ip) => info!(%ip, "public IP resolved"),
            None => warn!("public IP lookup failed; continuing without it"),
        }
        self.resolved_ip = Some(ip.map(|ip| ip.to_string()).unwrap_or_default());

        let Some(credential) = &self.credential else {
            return;
        };
        let url = self.config.credential_url(credential);
        self.enter_stage(ProbeStage::CheckingCredential, url, presenter);
    }

    fn finish_credential_check(
        &mut self,
        response: &CompletedExchange,
        outcome: Outcome,
        presenter: &mut dyn Presenter,
    ) {
        let Some(credential) = self.credential.clone() else {
            return;
        };
        let ip = self.resolved_ip.as_deref();
        let status = status_text(&outcome, ip);
        presenter.status_changed(&status);

        match outcome {
            Outcome::Success => {
                info!(key = %credential.masked(), "auth key verified");
                self.finish(SessionResult::Success, presenter);
            }
            Outcome::UnrecognizedBody => {
                warn!(bytes = response.body.len(), "unrecognized response body");
                let detail = render_detail(response, &credential, ip);
                self.await_acknowledgment(
                    Warning {
                        title: "Unrecognized Response".to_string(),
                        summary: "Server returned OK, but the response body is unrecognized"
                            .to_string(),
                        detail: Some(detail.clone()),
                    },
                    SessionResult::Unrecognized(detail),
                    presenter,
                );
            }
            outcome => {
                warn!(status = ?response.status, "connection failed: {}", status);
                let detail = render_detail(response, &credential, ip);
                if outcome.error_kind() == Some(ErrorKind::AuthenticationRequired) {
                    info!(key = %credential.masked(), "auth key rejected");
                }
                let warning = Warning {
                    title: "Connection Failed".to_string(),
                    summary: format!("Connection failed: {}.", status),
                    detail: Some(detail.clone()),
                };
                self.await_acknowledgment(
                    warning,
                    SessionResult::NetworkError { status, detail },
                    presenter,
                );
            }
        }
    }

    fn enter_stage(&mut self, stage: ProbeStage, url: Url, presenter: &mut dyn Presenter) {
        presenter.status_changed(stage.status());
        self.state = SessionState::Probing(stage);
        self.issue(url);
    }

    fn issue(&mut self, url: Url) {
        self.next_id += 1;
        let id = ExchangeId(self.next_id);
        debug!(exchange = id.0, url = %url, "issuing request");

        let request = self.config.request(url.clone());
        let transport = Arc::clone(&self.transport);
        let tx = self.completions_tx.clone();
        let task = tokio::spawn(async move {
            let response = transport.get(&request).await;
            let _ = tx.send(Completion {
                exchange: id,
                response,
            });
        });

        self.exchange = Some(Exchange {
            id,
            url,
            cancelled: false,
            task,
        });
    }

    fn await_acknowledgment(
        &mut self,
        warning: Warning,
        result: SessionResult,
        presenter: &mut dyn Presenter,
    ) {
        self.state = SessionState::AwaitingAcknowledgment(result);
        presenter.blocking_warning(&warning);
    }

    fn finish(&mut self, result: SessionResult, presenter: &mut dyn Presenter) {
        self.state = SessionState::Finished(result);
        presenter.connect_enabled(true);
    }
}

impl Drop for VerificationSession {
    fn drop(&mut self) {
        if let Some(exchange) = &self.exchange {
            exchange.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_result_status_text() {
        assert_eq!(SessionResult::Success.status_text(), "Success!");
        assert_eq!(SessionResult::Cancelled.status_text(), "Canceled.");
        assert_eq!(SessionResult::Unrecognized(String::new()).status_text(), "Unrecognized Response.");
        let result = SessionResult::NetworkError {
            status: "Network Error: Connection Refused".to_string(),
            detail: "BCL Key".to_string(),
        };
        assert_eq!(result.status_text(), "Network Error: Connection Refused");
        assert_eq!(result.detail(), Some("BCL Key"));
    }

    #[test]
    fn test_stage_status() {
        assert_eq!(ProbeStage::CheckingIp.status(), "Checking IP...");
        assert_eq!(ProbeStage::CheckingCredential.status(), "Connecting...");
    }

    #[test]
    fn test_session_error_display() {
        assert_eq!(
            SessionError::Busy.to_string(),
            "a verification is already in progress"
        );
        assert_eq!(SessionError::NothingToCancel.to_string(), "no request is pending");
    }
}
