//! Mobile-side scan loop.
//!
//! Decoded payloads arrive on a bounded channel fed by the camera capability.
//! The loop accepts one payload per armed session; everything the camera emits
//! after that is dropped until the user continues. Each submission runs as its
//! own task tagged with the session id, and results for an older session are
//! discarded when they arrive.

use crate::{
    outcome::{Event, OutcomeMachine, OutcomeState, Transition},
    payload::{self, Scanned},
    verification::{VerificationResult, Verifier},
};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, info, warn};

/// Capacity of the decoded-payload stream.
pub const CAMERA_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    /// Changes on every reset; results tagged with an older id are dropped.
    pub id: u64,
    pub is_scanning: bool,
    pub last_payload: Option<String>,
}

impl ScanSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: 1,
            is_scanning: true,
            last_payload: None,
        }
    }

    fn reset(&mut self) {
        self.id = self.id.wrapping_add(1);
        self.is_scanning = true;
        self.last_payload = None;
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands are applied in the order they were sent. Payloads sent as
/// [`ScanCommand::Scan`] are therefore ordered with `Continue`, unlike
/// emissions on the camera stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanCommand {
    /// A decoded payload, handled like a camera emission.
    Scan(String),
    /// Re-arm scanning after a result was shown.
    Continue,
    /// Take no more input; exit once in-flight submissions have resolved.
    Finish,
    /// Exit now, cancelling in-flight submissions.
    Stop,
}

/// What happened to one camera emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted {
    Submitted { candidate: String },
    Unrecognized,
    /// The session is not scanning; the emission was dropped.
    Ignored,
}

#[derive(Debug)]
struct Completion {
    session_id: u64,
    result: VerificationResult,
}

pub struct ScanLoop<V> {
    verifier: Arc<V>,
    session: ScanSession,
    outcome: OutcomeMachine,
    updates: watch::Sender<OutcomeState>,
    in_flight: JoinSet<Completion>,
}

impl<V: Verifier> ScanLoop<V> {
    #[must_use]
    pub fn new(verifier: Arc<V>) -> Self {
        let (updates, _rx) = watch::channel(OutcomeState::Idle);

        Self {
            verifier,
            session: ScanSession::new(),
            outcome: OutcomeMachine::new(),
            updates,
            in_flight: JoinSet::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    #[must_use]
    pub fn outcome(&self) -> &OutcomeState {
        self.outcome.state()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OutcomeState> {
        self.updates.subscribe()
    }

    /// Handle one decoded payload from the camera.
    pub fn handle_payload(&mut self, raw: String) -> Accepted {
        if !self.session.is_scanning {
            debug!(session = self.session.id, "scan ignored, session not armed");
            return Accepted::Ignored;
        }

        self.session.is_scanning = false;
        self.session.last_payload = Some(raw.clone());

        match payload::classify(&raw) {
            Scanned::Candidate(candidate) => {
                info!(session = self.session.id, "Verification code scanned");
                self.apply(Event::Submitted);
                self.spawn_submission(candidate.clone());
                Accepted::Submitted { candidate }
            }
            Scanned::Unrecognized => {
                info!(session = self.session.id, "Scanned code is not a verification code");
                self.apply(Event::Unrecognized { payload: raw });
                Accepted::Unrecognized
            }
        }
    }

    /// The user's "continue" action: re-arm and go back to idle.
    pub fn handle_continue(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(
                session = self.session.id,
                "continuing with a submission in flight, its result will be dropped"
            );
        }

        self.session.reset();
        self.apply(Event::Continue);
    }

    /// Wait for the next submission to finish and apply it.
    ///
    /// Returns `false` when nothing is in flight.
    pub async fn settle(&mut self) -> bool {
        match self.in_flight.join_next().await {
            Some(Ok(completion)) => {
                self.handle_completion(completion);
                true
            }
            Some(Err(e)) => {
                warn!("Verification task ended abnormally: {e}");
                true
            }
            None => false,
        }
    }

    /// Run until `Stop`, or until input ends and in-flight submissions settle.
    ///
    /// Input ends when the payload stream closes or `Finish` is received.
    pub async fn run(
        mut self,
        mut payloads: mpsc::Receiver<String>,
        mut commands: mpsc::Receiver<ScanCommand>,
    ) {
        let mut draining = false;

        loop {
            if draining && self.in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(ScanCommand::Scan(raw)) if !draining => {
                        self.handle_payload(raw);
                    }
                    Some(ScanCommand::Scan(_)) => debug!("scan ignored, loop is finishing"),
                    Some(ScanCommand::Continue) => self.handle_continue(),
                    Some(ScanCommand::Finish) => draining = true,
                    Some(ScanCommand::Stop) | None => break,
                },

                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok(completion) => self.handle_completion(completion),
                        Err(e) => warn!("Verification task ended abnormally: {e}"),
                    }
                }

                payload = payloads.recv(), if !draining => match payload {
                    Some(raw) => {
                        self.handle_payload(raw);
                    }
                    None => {
                        debug!(in_flight = self.in_flight.len(), "payload stream closed");
                        draining = true;
                    }
                },
            }
        }

        self.in_flight.abort_all();
        debug!("scan loop stopped");
    }

    /// Spawn [`ScanLoop::run`] and return a handle for the UI.
    pub fn spawn(self, payloads: mpsc::Receiver<String>) -> ScanHandle {
        let (commands, command_rx) = mpsc::channel(4);
        let outcome = self.subscribe();
        let task = tokio::spawn(self.run(payloads, command_rx));

        ScanHandle {
            commands,
            outcome,
            task,
        }
    }

    fn spawn_submission(&mut self, candidate: String) {
        let verifier = self.verifier.clone();
        let session_id = self.session.id;

        self.in_flight.spawn(async move {
            let result = verifier.submit(&candidate).await;
            Completion { session_id, result }
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        if completion.session_id != self.session.id {
            debug!(
                result_session = completion.session_id,
                session = self.session.id,
                "dropping result from a previous session"
            );
            return;
        }

        self.apply(Event::Resolved(completion.result));
    }

    fn apply(&mut self, event: Event) {
        let label = event_label(&event);

        match self.outcome.apply(event) {
            Transition::Applied => {
                debug!(event = label, state = self.outcome.state().label(), "outcome changed");
                self.updates.send_replace(self.outcome.state().clone());
            }
            Transition::Ignored => {
                debug!(event = label, state = self.outcome.state().label(), "event ignored");
            }
        }
    }
}

const fn event_label(event: &Event) -> &'static str {
    match event {
        Event::Unrecognized { .. } => "unrecognized",
        Event::Submitted => "submitted",
        Event::Resolved(_) => "resolved",
        Event::Continue => "continue",
    }
}

/// UI-side handle to a running scan loop.
#[derive(Debug)]
pub struct ScanHandle {
    commands: mpsc::Sender<ScanCommand>,
    outcome: watch::Receiver<OutcomeState>,
    task: JoinHandle<()>,
}

impl ScanHandle {
    #[must_use]
    pub fn outcome(&self) -> OutcomeState {
        self.outcome.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OutcomeState> {
        self.outcome.clone()
    }

    /// Feed a decoded payload, ordered with [`ScanHandle::continue_scanning`].
    pub async fn scan(&self, raw: String) {
        self.send(ScanCommand::Scan(raw)).await;
    }

    /// Re-arm scanning. A no-op once the loop has stopped.
    ///
    /// Ordered with [`ScanHandle::scan`] but not with the camera stream: the
    /// loop polls commands first, so a camera emission queued before this call
    /// may be taken by the new session.
    pub async fn continue_scanning(&self) {
        self.send(ScanCommand::Continue).await;
    }

    /// Stop taking input and wait until in-flight submissions have resolved.
    pub async fn finish(self) {
        self.send(ScanCommand::Finish).await;
        self.join().await;
    }

    /// Stop the loop and wait for it to exit. In-flight submissions are cancelled.
    pub async fn stop(self) {
        self.send(ScanCommand::Stop).await;
        self.join().await;
    }

    async fn send(&self, command: ScanCommand) {
        if self.commands.send(command).await.is_err() {
            debug!("scan loop already stopped");
        }
    }

    async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Scan loop ended abnormally: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Records candidates; answers once `release` is notified (or immediately).
    struct FakeVerifier {
        calls: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
        result: VerificationResult,
    }

    impl FakeVerifier {
        fn answering(result: VerificationResult) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                gate: None,
                result,
            })
        }

        fn gated(result: VerificationResult, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                gate: Some(gate),
                result,
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Verifier for FakeVerifier {
        async fn submit(&self, candidate: &str) -> VerificationResult {
            self.calls.lock().unwrap().push(candidate.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone()
        }
    }

    fn verified(domain: &str) -> VerificationResult {
        VerificationResult {
            valid: true,
            domain: Some(domain.to_string()),
            message: None,
        }
    }

    #[tokio::test]
    async fn matching_payload_is_submitted_and_verified() {
        let verifier = FakeVerifier::answering(verified("example.gov.pl"));
        let mut scan = ScanLoop::new(verifier.clone());

        let accepted = scan.handle_payload("verification-code:XYZ".to_string());
        assert_eq!(
            accepted,
            Accepted::Submitted {
                candidate: "XYZ".to_string()
            }
        );
        assert_eq!(scan.outcome(), &OutcomeState::Pending);
        assert!(!scan.session().is_scanning);
        assert_eq!(
            scan.session().last_payload.as_deref(),
            Some("verification-code:XYZ")
        );

        assert!(scan.settle().await);
        assert_eq!(scan.outcome(), &OutcomeState::Success(verified("example.gov.pl")));
        assert_eq!(verifier.calls(), vec!["XYZ".to_string()]);
    }

    #[tokio::test]
    async fn unrecognized_payload_never_calls_verifier() {
        let verifier = FakeVerifier::answering(verified("example.gov.pl"));
        let mut scan = ScanLoop::new(verifier.clone());

        assert_eq!(
            scan.handle_payload("hello world".to_string()),
            Accepted::Unrecognized
        );
        assert_eq!(
            scan.outcome(),
            &OutcomeState::Info {
                payload: "hello world".to_string()
            }
        );
        assert!(!scan.settle().await);
        assert!(verifier.calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_emissions_are_ignored_until_continue() {
        let verifier = FakeVerifier::answering(verified("example.gov.pl"));
        let mut scan = ScanLoop::new(verifier.clone());

        scan.handle_payload("verification-code:XYZ".to_string());
        for _ in 0..5 {
            assert_eq!(
                scan.handle_payload("verification-code:XYZ".to_string()),
                Accepted::Ignored
            );
        }
        assert!(scan.settle().await);
        assert_eq!(
            scan.handle_payload("verification-code:OTHER".to_string()),
            Accepted::Ignored
        );
        assert_eq!(verifier.calls().len(), 1);

        scan.handle_continue();
        assert_eq!(scan.outcome(), &OutcomeState::Idle);
        assert!(scan.session().is_scanning);
        assert!(scan.session().last_payload.is_none());

        scan.handle_payload("verification-code:OTHER".to_string());
        assert!(scan.settle().await);
        assert_eq!(verifier.calls(), vec!["XYZ".to_string(), "OTHER".to_string()]);
    }

    #[tokio::test]
    async fn late_result_from_previous_session_is_dropped() {
        let gate = Arc::new(Notify::new());
        let verifier = FakeVerifier::gated(verified("stale.example"), gate.clone());
        let mut scan = ScanLoop::new(verifier.clone());
        let first_session = scan.session().id;

        scan.handle_payload("verification-code:OLD".to_string());
        scan.handle_continue();
        assert_ne!(scan.session().id, first_session);
        assert_eq!(scan.outcome(), &OutcomeState::Idle);

        gate.notify_one();
        assert!(scan.settle().await);
        assert_eq!(scan.outcome(), &OutcomeState::Idle);
        assert!(scan.session().is_scanning);
    }

    #[tokio::test]
    async fn updates_are_published() {
        let verifier = FakeVerifier::answering(verified("example.gov.pl"));
        let mut scan = ScanLoop::new(verifier);
        let updates = scan.subscribe();

        scan.handle_payload("verification-codeXYZ".to_string());
        assert_eq!(*updates.borrow(), OutcomeState::Pending);
        scan.settle().await;
        assert_eq!(updates.borrow().domain(), Some("example.gov.pl"));
        scan.handle_continue();
        assert_eq!(*updates.borrow(), OutcomeState::Idle);
    }

    #[tokio::test]
    async fn spawned_loop_processes_stream() {
        let verifier = FakeVerifier::answering(verified("example.gov.pl"));
        let (camera, payloads) = mpsc::channel(CAMERA_BUFFER);
        let handle = ScanLoop::new(verifier.clone()).spawn(payloads);
        let mut outcome = handle.subscribe();

        camera.send("verification-code:XYZ".to_string()).await.unwrap();
        camera.send("verification-code:XYZ".to_string()).await.unwrap();
        outcome.wait_for(OutcomeState::is_terminal).await.unwrap();
        assert_eq!(handle.outcome().domain(), Some("example.gov.pl"));

        handle.continue_scanning().await;
        outcome.wait_for(|state| *state == OutcomeState::Idle).await.unwrap();

        camera.send("hello world".to_string()).await.unwrap();
        outcome.wait_for(OutcomeState::is_terminal).await.unwrap();
        assert_eq!(handle.outcome().label(), "info");

        handle.stop().await;
        assert_eq!(verifier.calls(), vec!["XYZ".to_string()]);
    }

    #[tokio::test]
    async fn closed_stream_settles_pending_submission() {
        let gate = Arc::new(Notify::new());
        let verifier = FakeVerifier::gated(verified("example.gov.pl"), gate.clone());
        let scan = ScanLoop::new(verifier.clone());
        let mut outcome = scan.subscribe();
        let (camera, payloads) = mpsc::channel(CAMERA_BUFFER);
        let (_commands, command_rx) = mpsc::channel(4);
        let task = tokio::spawn(scan.run(payloads, command_rx));

        camera.send("verification-code:XYZ".to_string()).await.unwrap();
        outcome.wait_for(|state| *state == OutcomeState::Pending).await.unwrap();
        drop(camera);

        gate.notify_one();
        task.await.unwrap();

        assert_eq!(outcome.borrow().domain(), Some("example.gov.pl"));
        assert_eq!(verifier.calls(), vec!["XYZ".to_string()]);
    }

    #[tokio::test]
    async fn scans_and_continue_apply_in_order() {
        let verifier = FakeVerifier::answering(verified("example.gov.pl"));
        let (_camera, payloads) = mpsc::channel::<String>(CAMERA_BUFFER);
        let handle = ScanLoop::new(verifier.clone()).spawn(payloads);
        let outcome = handle.subscribe();

        handle.scan("verification-code:A".to_string()).await;
        handle.continue_scanning().await;
        handle.scan("verification-code:B".to_string()).await;
        handle.finish().await;

        assert_eq!(verifier.calls(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(outcome.borrow().domain(), Some("example.gov.pl"));
    }

    #[tokio::test]
    async fn stop_cancels_pending_submission() {
        let gate = Arc::new(Notify::new());
        let verifier = FakeVerifier::gated(verified("example.gov.pl"), gate);
        let (_camera, payloads) = mpsc::channel::<String>(CAMERA_BUFFER);
        let handle = ScanLoop::new(verifier).spawn(payloads);
        let mut outcome = handle.subscribe();

        handle.scan("verification-code:XYZ".to_string()).await;
        outcome.wait_for(|state| *state == OutcomeState::Pending).await.unwrap();
        handle.stop().await;

        assert_eq!(*outcome.borrow(), OutcomeState::Pending);
    }
}
