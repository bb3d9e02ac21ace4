//! ACMP transaction state.
//!
//! ACMP is multicast: responses are matched purely on
//! `(controller_entity_id, sequence_id)`, because depending on the message
//! type the answer comes from the talker or the listener. One sequence-id
//! space covers the whole controller. No retries; a silent responder
//! surfaces as `TimedOut` after 500 ms.

use avdecc_core::acmpdu::Acmpdu;
use avdecc_core::status::LocalFault;
use avdecc_core::types::UniqueIdentifier;
use tokio::sync::oneshot;

#[derive(Debug)]
pub(crate) enum AcmpOutcome {
    Wire(Acmpdu),
    Fault(LocalFault),
}

pub(crate) struct AcmpCommand {
    pub sequence_id: u16,
    /// The entity expected to answer; its departure cancels the command.
    pub addressed_entity: UniqueIdentifier,
    responder: oneshot::Sender<AcmpOutcome>,
}

impl AcmpCommand {
    pub fn complete(self, outcome: AcmpOutcome) {
        let _ = self.responder.send(outcome);
    }
}

#[derive(Default)]
pub(crate) struct AcmpState {
    next_sequence_id: u16,
    // Issue-ordered; the handful of concurrent connection commands a
    // controller runs does not justify a map.
    in_flight: Vec<AcmpCommand>,
}

impl AcmpState {
    pub fn allocate_sequence_id(&mut self) -> u16 {
        loop {
            let candidate = self.next_sequence_id;
            self.next_sequence_id = self.next_sequence_id.wrapping_add(1);
            if !self
                .in_flight
                .iter()
                .any(|cmd| cmd.sequence_id == candidate)
            {
                return candidate;
            }
        }
    }

    pub fn register(
        &mut self,
        sequence_id: u16,
        addressed_entity: UniqueIdentifier,
        responder: oneshot::Sender<AcmpOutcome>,
    ) {
        self.in_flight.push(AcmpCommand {
            sequence_id,
            addressed_entity,
            responder,
        });
    }

    pub fn complete(&mut self, sequence_id: u16) -> Option<AcmpCommand> {
        let index = self
            .in_flight
            .iter()
            .position(|cmd| cmd.sequence_id == sequence_id)?;
        Some(self.in_flight.remove(index))
    }

    /// Cancels the commands addressed at a vanished entity, in issue order.
    pub fn fail_addressed(&mut self, entity_id: UniqueIdentifier) -> Vec<AcmpCommand> {
        let mut cancelled = Vec::new();
        let mut index = 0;
        while index < self.in_flight.len() {
            if self.in_flight[index].addressed_entity == entity_id {
                cancelled.push(self.in_flight.remove(index));
            } else {
                index += 1;
            }
        }
        cancelled
    }

    pub fn fail_all(&mut self) -> Vec<AcmpCommand> {
        std::mem::take(&mut self.in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::AcmpState;
    use avdecc_core::types::UniqueIdentifier;
    use tokio::sync::oneshot;

    #[test]
    fn sequence_ids_skip_outstanding() {
        let mut state = AcmpState::default();
        let seq = state.allocate_sequence_id();
        let (tx, _rx) = oneshot::channel();
        state.register(seq, UniqueIdentifier::new(1), tx);

        state.next_sequence_id = seq; // force a collision attempt
        assert_ne!(state.allocate_sequence_id(), seq);
    }

    #[test]
    fn completion_is_by_sequence_id() {
        let mut state = AcmpState::default();
        let (tx0, _rx0) = oneshot::channel();
        let (tx1, _rx1) = oneshot::channel();
        let s0 = state.allocate_sequence_id();
        state.register(s0, UniqueIdentifier::new(1), tx0);
        let s1 = state.allocate_sequence_id();
        state.register(s1, UniqueIdentifier::new(2), tx1);

        assert_eq!(state.complete(s1).unwrap().sequence_id, s1);
        assert!(state.complete(s1).is_none());
        assert_eq!(state.complete(s0).unwrap().sequence_id, s0);
    }

    #[test]
    fn departure_cancels_only_the_addressed_entity() {
        let mut state = AcmpState::default();
        for entity in [1u64, 2, 1] {
            let (tx, _rx) = oneshot::channel();
            let seq = state.allocate_sequence_id();
            state.register(seq, UniqueIdentifier::new(entity), tx);
        }

        let cancelled = state.fail_addressed(UniqueIdentifier::new(1));
        assert_eq!(cancelled.len(), 2);
        assert_eq!(state.fail_all().len(), 1);
    }
}
