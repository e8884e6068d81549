//! In-memory message source bucketed by tick.

use gossipsim_core::{MessageBatch, MessageSource};
use gossipsim_types::{Message, MessageUuid, Tick};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Messages pre-assigned to the tick at which they originate.
#[derive(Debug, Clone, Default)]
pub struct BucketedSource {
    buckets: BTreeMap<Tick, Vec<Arc<Message>>>,
}

impl BucketedSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a message to originate at `tick`.
    pub fn push(&mut self, tick: Tick, message: Message) {
        self.buckets.entry(tick).or_default().push(Arc::new(message));
    }

    /// The last tick with at least one message.
    pub fn last_bucket(&self) -> Option<Tick> {
        self.buckets
            .iter()
            .rev()
            .find(|(_, messages)| !messages.is_empty())
            .map(|(tick, _)| *tick)
    }

    /// Total number of scheduled messages.
    pub fn message_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.values().filter(|m| !m.is_empty()).count()
    }

    /// The tick each scheduled message originates at.
    pub fn injection_ticks(&self) -> BTreeMap<MessageUuid, Tick> {
        self.buckets
            .iter()
            .flat_map(|(tick, messages)| messages.iter().map(move |m| (m.uuid, *tick)))
            .collect()
    }
}

impl FromIterator<(Tick, Message)> for BucketedSource {
    fn from_iter<I: IntoIterator<Item = (Tick, Message)>>(iter: I) -> Self {
        let mut source = BucketedSource::new();
        for (tick, message) in iter {
            source.push(tick, message);
        }
        source
    }
}

impl MessageSource for BucketedSource {
    fn new_messages(&self, tick: Tick) -> MessageBatch {
        MessageBatch {
            messages: self.buckets.get(&tick).cloned().unwrap_or_default(),
            exhausted: self.last_bucket().map_or(true, |last| last <= tick),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossipsim_types::{MessageUuid, NodeKey, ProtocolId, Timestamp};

    fn message(uuid: i64) -> Message {
        Message::new(
            MessageUuid(uuid),
            ProtocolId::new("chan"),
            NodeKey::new("A"),
            Timestamp(0),
        )
    }

    #[test]
    fn test_exhausted_after_last_bucket() {
        let source: BucketedSource = [(Tick(0), message(1)), (Tick(2), message(2))]
            .into_iter()
            .collect();

        let batch = source.new_messages(Tick(0));
        assert_eq!(batch.messages.len(), 1);
        assert!(!batch.exhausted);

        let gap = source.new_messages(Tick(1));
        assert!(gap.messages.is_empty());
        assert!(!gap.exhausted);

        assert!(source.new_messages(Tick(2)).exhausted);
        assert!(source.new_messages(Tick(3)).exhausted);
        assert_eq!(source.message_count(), 2);
        assert_eq!(source.bucket_count(), 2);
        assert_eq!(
            source.injection_ticks().into_iter().collect::<Vec<_>>(),
            vec![(MessageUuid(1), Tick(0)), (MessageUuid(2), Tick(2))]
        );
    }

    #[test]
    fn test_empty_source_is_exhausted_immediately() {
        let source = BucketedSource::new();
        let batch = source.new_messages(Tick::ZERO);
        assert!(batch.messages.is_empty());
        assert!(batch.exhausted);
    }

    #[test]
    fn test_same_tick_is_deterministic() {
        let source: BucketedSource = [(Tick(0), message(1)), (Tick(0), message(2))]
            .into_iter()
            .collect();
        let first: Vec<_> = source.new_messages(Tick(0)).messages.iter().map(|m| m.uuid).collect();
        let second: Vec<_> = source.new_messages(Tick(0)).messages.iter().map(|m| m.uuid).collect();
        assert_eq!(first, vec![MessageUuid(1), MessageUuid(2)]);
        assert_eq!(first, second);
    }
}
