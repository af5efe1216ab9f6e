//! In-flight spike events and the delivery queue

use crate::synapse::SynapseId;

/// A spike travelling down an axon, created at emission and destroyed at
/// delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeEvent {
    /// Emitting neuron index
    pub source: usize,
    /// Receiving neuron index
    pub target: usize,
    /// Synaptic weight captured at emission time
    pub weight_at_emission: f32,
    /// Absolute delivery time (ms)
    pub arrival_time: f32,
    /// Synapse the spike travelled through
    pub synapse_id: SynapseId,
}

/// Flat queue of in-flight spike events
///
/// A linear scan is adequate at sandbox scale (dozens to low hundreds of
/// neurons, low thousands of in-flight events). Every enqueued event is
/// delivered exactly once, at the first step whose time reaches its arrival
/// time; ordering among same-time events is unspecified.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<SpikeEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an in-flight event.
    pub fn enqueue(&mut self, event: SpikeEvent) {
        self.events.push(event);
    }

    /// Remove and return every event with `arrival_time <= now_ms`.
    pub fn drain_due(&mut self, now_ms: f32) -> Vec<SpikeEvent> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.events.len() {
            if self.events[i].arrival_time <= now_ms {
                due.push(self.events.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due
    }

    /// Number of in-flight events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all in-flight events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Iterate over in-flight events in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &SpikeEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(target: usize, arrival: f32) -> SpikeEvent {
        SpikeEvent {
            source: 0,
            target,
            weight_at_emission: 1.0,
            arrival_time: arrival,
            synapse_id: SynapseId(0),
        }
    }

    #[test]
    fn test_drain_partitions_by_arrival() {
        let mut q = EventQueue::new();
        q.enqueue(ev(1, 5.0));
        q.enqueue(ev(2, 10.0));
        q.enqueue(ev(3, 5.0));

        let due = q.drain_due(5.0);
        assert_eq!(due.len(), 2);
        assert!(due.iter().all(|e| e.arrival_time <= 5.0));
        assert_eq!(q.len(), 1);

        let due = q.drain_due(10.0);
        assert_eq!(due.len(), 1);
        assert!(q.is_empty());
    }

    #[test]
    fn test_exactly_once_delivery() {
        let mut q = EventQueue::new();
        for k in 0..100 {
            q.enqueue(ev(k, (k % 10) as f32));
        }
        let mut delivered = 0;
        for t in 0..10 {
            delivered += q.drain_due(t as f32).len();
        }
        assert_eq!(delivered, 100);
        assert!(q.is_empty());
        // Nothing is delivered twice
        assert_eq!(q.drain_due(100.0).len(), 0);
    }

    #[test]
    fn test_early_drain_delivers_nothing() {
        let mut q = EventQueue::new();
        q.enqueue(ev(0, 3.0));
        assert!(q.drain_due(2.9).is_empty());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut q = EventQueue::new();
        q.enqueue(ev(0, 1.0));
        q.clear();
        assert!(q.is_empty());
    }
}
