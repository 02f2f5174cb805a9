use std::collections::HashMap;
use tracing::{debug, warn};

/// Topic to sink mapping, built once at startup.
///
/// Lookup is an exact string match. Wildcards are the broker's business; a
/// message on `a/b` never reaches a sink registered as `a/#`. Iteration keeps
/// configuration order, which is also the tab order in the window.
#[derive(Debug)]
pub struct TopicRegistry<S> {
    entries: Vec<(String, S)>,
    index: HashMap<String, usize>,
}

impl<S> TopicRegistry<S> {
    /// Builds a registry with one sink per topic. Duplicate topics are
    /// registered once.
    pub fn from_topics<I, T, F>(topics: I, mut make_sink: F) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
        F: FnMut(&str) -> S,
    {
        let mut registry = TopicRegistry {
            entries: Vec::new(),
            index: HashMap::new(),
        };

        for topic in topics {
            let topic = topic.as_ref();
            if registry.index.contains_key(topic) {
                warn!("Topic {} configured twice, keeping the first entry", topic);
                continue;
            }
            debug!("Registering sink for topic {}", topic);
            let sink = make_sink(topic);
            registry.index.insert(topic.to_string(), registry.entries.len());
            registry.entries.push((topic.to_string(), sink));
        }

        registry
    }

    #[cfg(test)]
    pub fn get(&self, topic: &str) -> Option<&S> {
        self.index.get(topic).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, topic: &str) -> Option<&mut S> {
        match self.index.get(topic) {
            Some(&idx) => Some(&mut self.entries[idx].1),
            None => None,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, topic: &str) -> bool {
        self.index.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(topic, _)| topic.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &S)> {
        self.entries.iter().map(|(topic, sink)| (topic.as_str(), sink))
    }

    /// Entry by position, used by the tab bar.
    pub fn entry_at(&self, idx: usize) -> Option<(&str, &S)> {
        self.entries
            .get(idx)
            .map(|(topic, sink)| (topic.as_str(), sink))
    }
}
