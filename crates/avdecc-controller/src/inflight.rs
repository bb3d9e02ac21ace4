//! Per-target AECP transaction state.
//!
//! Responders process AEM commands serially, so the engine keeps at most one
//! command in flight per target entity; later commands wait in a FIFO behind
//! it. AA and MVU commands share the sequence-id space and the same
//! discipline. Sequence ids are allocated monotonically modulo 2^16 and
//! never reuse an id that is still outstanding.

use avdecc_core::aecpdu::AecpMessageType;
use avdecc_core::status::LocalFault;
use std::collections::VecDeque;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AecpKind {
    Aem,
    Aa,
    Mvu,
}

impl AecpKind {
    pub fn command_type(self) -> AecpMessageType {
        match self {
            Self::Aem => AecpMessageType::AemCommand,
            Self::Aa => AecpMessageType::AaCommand,
            Self::Mvu => AecpMessageType::VendorUniqueCommand,
        }
    }

    pub fn response_type(self) -> AecpMessageType {
        self.command_type().response_type()
    }
}

/// How an AECP transaction ended.
#[derive(Debug)]
pub(crate) enum AecpOutcome {
    /// A matched response; `status` is the raw wire status.
    Wire { status: u8, payload: Vec<u8> },
    /// The library gave up on the transaction.
    Fault(LocalFault),
}

/// One issued command, queued or in flight.
pub(crate) struct AecpCommand {
    pub sequence_id: u16,
    pub kind: AecpKind,
    /// The complete Ethernet frame, kept for retransmission.
    pub frame: Vec<u8>,
    pub attempts_remaining: u8,
    /// Identifies the deadline armed for the current transmission; stale
    /// deadlines (already answered, or superseded by IN_PROGRESS) miss.
    pub deadline_token: u64,
    responder: oneshot::Sender<AecpOutcome>,
}

impl AecpCommand {
    pub fn new(
        sequence_id: u16,
        kind: AecpKind,
        frame: Vec<u8>,
        retries: u8,
        responder: oneshot::Sender<AecpOutcome>,
    ) -> Self {
        Self {
            sequence_id,
            kind,
            frame,
            attempts_remaining: retries,
            deadline_token: 0,
            responder,
        }
    }

    pub fn complete(self, outcome: AecpOutcome) {
        // The caller may have stopped waiting; that is not an error.
        let _ = self.responder.send(outcome);
    }
}

/// A transmission the engine must perform once the state lock is released.
pub(crate) struct Transmission {
    pub sequence_id: u16,
    pub token: u64,
    pub frame: Vec<u8>,
}

/// What a fired deadline means for the in-flight command.
pub(crate) enum DeadlineAction {
    /// The deadline no longer refers to the current transmission.
    Stale,
    Retransmit(Transmission),
    /// Retries exhausted. The command is returned for completion along with
    /// the next queued transmission, if any.
    Expired {
        command: AecpCommand,
        next: Option<Transmission>,
    },
}

#[derive(Default)]
pub(crate) struct TargetState {
    next_sequence_id: u16,
    in_flight: Option<AecpCommand>,
    queue: VecDeque<AecpCommand>,
}

impl TargetState {
    /// Post-increments the sequence counter, skipping any id still
    /// outstanding. Wrap-around is legal.
    pub fn allocate_sequence_id(&mut self) -> u16 {
        loop {
            let candidate = self.next_sequence_id;
            self.next_sequence_id = self.next_sequence_id.wrapping_add(1);
            let outstanding = self
                .in_flight
                .iter()
                .chain(self.queue.iter())
                .any(|cmd| cmd.sequence_id == candidate);
            if !outstanding {
                return candidate;
            }
        }
    }

    /// Accepts a command: transmit immediately if the target is idle,
    /// otherwise queue behind the in-flight command.
    pub fn submit(&mut self, mut command: AecpCommand, token: u64) -> Option<Transmission> {
        if self.in_flight.is_some() {
            self.queue.push_back(command);
            return None;
        }
        command.deadline_token = token;
        let transmission = Transmission {
            sequence_id: command.sequence_id,
            token,
            frame: command.frame.clone(),
        };
        self.in_flight = Some(command);
        Some(transmission)
    }

    pub fn matches_response(&self, sequence_id: u16, message_type: AecpMessageType) -> bool {
        self.in_flight.as_ref().is_some_and(|cmd| {
            cmd.sequence_id == sequence_id && cmd.kind.response_type() == message_type
        })
    }

    pub fn in_flight_count(&self) -> usize {
        usize::from(self.in_flight.is_some())
    }

    /// Pops the answered in-flight command and promotes the next queued one.
    pub fn complete_in_flight(&mut self, next_token: u64) -> (AecpCommand, Option<Transmission>) {
        let completed = self.in_flight.take().expect("no command in flight");
        (completed, self.promote(next_token))
    }

    /// IN_PROGRESS arrived: keep the command in flight under a new deadline.
    pub fn extend_in_flight(&mut self, token: u64) -> Option<u16> {
        let cmd = self.in_flight.as_mut()?;
        cmd.deadline_token = token;
        Some(cmd.sequence_id)
    }

    pub fn on_deadline(&mut self, sequence_id: u16, token: u64, next_token: u64) -> DeadlineAction {
        let current = match &mut self.in_flight {
            Some(cmd) if cmd.sequence_id == sequence_id && cmd.deadline_token == token => cmd,
            _ => return DeadlineAction::Stale,
        };
        if current.attempts_remaining > 0 {
            current.attempts_remaining -= 1;
            current.deadline_token = next_token;
            return DeadlineAction::Retransmit(Transmission {
                sequence_id,
                token: next_token,
                frame: current.frame.clone(),
            });
        }
        let (command, next) = self.complete_in_flight(next_token);
        DeadlineAction::Expired { command, next }
    }

    /// Drops the in-flight command after a failed (re)transmission.
    pub fn abort_in_flight(
        &mut self,
        sequence_id: u16,
        next_token: u64,
    ) -> Option<(AecpCommand, Option<Transmission>)> {
        match &self.in_flight {
            Some(cmd) if cmd.sequence_id == sequence_id => {
                Some(self.complete_in_flight(next_token))
            }
            _ => None,
        }
    }

    /// Cancels everything, in issue order.
    pub fn fail_all(&mut self) -> Vec<AecpCommand> {
        let mut cancelled = Vec::with_capacity(self.queue.len() + 1);
        if let Some(cmd) = self.in_flight.take() {
            cancelled.push(cmd);
        }
        cancelled.extend(self.queue.drain(..));
        cancelled
    }

    fn promote(&mut self, token: u64) -> Option<Transmission> {
        let mut next = self.queue.pop_front()?;
        next.deadline_token = token;
        let transmission = Transmission {
            sequence_id: next.sequence_id,
            token,
            frame: next.frame.clone(),
        };
        self.in_flight = Some(next);
        Some(transmission)
    }
}

#[cfg(test)]
mod tests {
    use super::{AecpCommand, AecpKind, DeadlineAction, TargetState};
    use avdecc_core::aecpdu::AecpMessageType;
    use tokio::sync::oneshot;

    fn command(state: &mut TargetState, kind: AecpKind) -> (u16, AecpCommand) {
        let seq = state.allocate_sequence_id();
        let (tx, _rx) = oneshot::channel();
        (seq, AecpCommand::new(seq, kind, vec![seq as u8], 1, tx))
    }

    #[test]
    fn at_most_one_command_in_flight() {
        let mut state = TargetState::default();
        let (_, first) = command(&mut state, AecpKind::Aem);
        let (_, second) = command(&mut state, AecpKind::Aem);

        assert!(state.submit(first, 1).is_some());
        assert!(state.submit(second, 2).is_none());
        assert_eq!(state.in_flight_count(), 1);
    }

    #[test]
    fn completion_promotes_fifo_order() {
        let mut state = TargetState::default();
        let (s0, c0) = command(&mut state, AecpKind::Aem);
        let (s1, c1) = command(&mut state, AecpKind::Aem);
        let (s2, c2) = command(&mut state, AecpKind::Aem);
        state.submit(c0, 1);
        state.submit(c1, 2);
        state.submit(c2, 3);

        let (done, next) = state.complete_in_flight(4);
        assert_eq!(done.sequence_id, s0);
        assert_eq!(next.unwrap().sequence_id, s1);
        let (done, next) = state.complete_in_flight(5);
        assert_eq!(done.sequence_id, s1);
        assert_eq!(next.unwrap().sequence_id, s2);
    }

    #[test]
    fn sequence_ids_are_monotonic_and_skip_outstanding() {
        let mut state = TargetState::default();
        assert_eq!(state.allocate_sequence_id(), 0);
        assert_eq!(state.allocate_sequence_id(), 1);

        // Wrap the counter to just before an outstanding id.
        let (tx, _rx) = oneshot::channel();
        let outstanding = AecpCommand::new(3, AecpKind::Aem, vec![], 1, tx);
        state.submit(outstanding, 1);
        state.next_sequence_id = 3;
        assert_eq!(state.allocate_sequence_id(), 4); // 3 is in flight
    }

    #[test]
    fn deadline_retries_then_expires() {
        let mut state = TargetState::default();
        let (seq, cmd) = command(&mut state, AecpKind::Aem);
        let tx = state.submit(cmd, 1).unwrap();

        match state.on_deadline(seq, tx.token, 2) {
            DeadlineAction::Retransmit(retry) => {
                assert_eq!(retry.sequence_id, seq); // same PDU, same sequence id
                assert_eq!(retry.token, 2);
            }
            _ => panic!("expected retransmit"),
        }
        // The first deadline token is now stale.
        assert!(matches!(
            state.on_deadline(seq, tx.token, 3),
            DeadlineAction::Stale
        ));
        match state.on_deadline(seq, 2, 4) {
            DeadlineAction::Expired { command, next } => {
                assert_eq!(command.sequence_id, seq);
                assert!(next.is_none());
            }
            _ => panic!("expected expiry"),
        }
    }

    #[test]
    fn response_matching_requires_kind_and_sequence() {
        let mut state = TargetState::default();
        let (seq, cmd) = command(&mut state, AecpKind::Aa);
        state.submit(cmd, 1);

        assert!(state.matches_response(seq, AecpMessageType::AaResponse));
        assert!(!state.matches_response(seq, AecpMessageType::AemResponse));
        assert!(!state.matches_response(seq.wrapping_add(1), AecpMessageType::AaResponse));
    }

    #[test]
    fn fail_all_preserves_issue_order() {
        let mut state = TargetState::default();
        let (s0, c0) = command(&mut state, AecpKind::Aem);
        let (s1, c1) = command(&mut state, AecpKind::Aem);
        state.submit(c0, 1);
        state.submit(c1, 2);

        let cancelled = state.fail_all();
        let order: Vec<u16> = cancelled.iter().map(|cmd| cmd.sequence_id).collect();
        assert_eq!(order, vec![s0, s1]);
        assert_eq!(state.in_flight_count(), 0);
    }
}
