//! Serves recorded interactions back in order.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Replays a cassette as independent per `port::method` queues.
///
/// Calls on different ports may interleave differently from the recording;
/// only the order within one `port::method` pair matters.
#[derive(Debug, Default)]
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Creates a replayer over the cassette's interactions.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        Self::from_interactions(cassette.interactions.iter().cloned())
    }

    /// Creates a replayer from interactions in recording order.
    pub fn from_interactions(interactions: impl IntoIterator<Item = Interaction>) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction);
        }
        Self { queues }
    }

    /// Interactions not yet served, across all ports.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Returns the next interaction for `port::method`.
    ///
    /// # Panics
    ///
    /// Panics when the cassette has no (more) interactions for the pair,
    /// listing the pairs that are still available.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Interaction {
        let key = (port.to_string(), method.to_string());
        if let Some(interaction) = self.queues.get_mut(&key).and_then(VecDeque::pop_front) {
            return interaction;
        }
        let mut available: Vec<String> = self
            .queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|((p, m), queue)| format!("{p}::{m} ({})", queue.len()))
            .collect();
        available.sort();
        let state = if self.queues.contains_key(&key) { "all consumed" } else { "none recorded" };
        panic!(
            "Cassette exhausted: no interactions left for port={port:?} method={method:?} ({state}). \
             Remaining: [{}]",
            available.join(", ")
        );
    }
}
