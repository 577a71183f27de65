//! Match records and the append-only sequence produced by collection runs.

use std::ops::Index;
use std::time::Duration;

/// One evaluated inbound message.
///
/// Created exactly once per message observed during a collector operation
/// and immutable afterwards. The index is the zero-based arrival ordinal of
/// the message within the operation; failed evaluations consume an index
/// too.
#[derive(Clone, Debug)]
pub struct MessageMatch<M> {
    index: usize,
    message: M,
    succeeded: bool,
    elapsed: Duration,
}

impl<M> MessageMatch<M> {
    pub(crate) fn new(index: usize, message: M, succeeded: bool, elapsed: Duration) -> Self {
        Self {
            index,
            message,
            succeeded,
            elapsed,
        }
    }

    /// Zero-based arrival ordinal of this message within the operation.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The message that was evaluated.
    #[must_use]
    pub fn message(&self) -> &M {
        &self.message
    }

    /// Whether the predicate accepted the message.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Timer elapsed time sampled when this record was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Consume the record and return the message.
    #[must_use]
    pub fn into_message(self) -> M {
        self.message
    }

    /// Convert the record through a caller-supplied function.
    pub fn convert<T>(&self, converter: impl FnOnce(&MessageMatch<M>) -> T) -> T {
        converter(self)
    }
}

/// An append-only, arrival-ordered collection of [`MessageMatch`] records.
///
/// Built up by a collection run and handed to the caller when the run ends.
/// Indices recorded in the matches are stable once assigned.
#[derive(Clone, Debug)]
pub struct MatchSequence<M> {
    matches: Vec<MessageMatch<M>>,
}

impl<M> Default for MatchSequence<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> MatchSequence<M> {
    /// Create an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matches: Vec::new(),
        }
    }

    pub(crate) fn append(&mut self, record: MessageMatch<M>) {
        self.matches.push(record);
    }

    /// Number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether no records have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Record at the given position, if any.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&MessageMatch<M>> {
        self.matches.get(position)
    }

    /// The most recently appended record.
    #[must_use]
    pub fn last(&self) -> Option<&MessageMatch<M>> {
        self.matches.last()
    }

    /// Iterate over the records in arrival order.
    pub fn iter(&self) -> std::slice::Iter<'_, MessageMatch<M>> {
        self.matches.iter()
    }

    /// Convert every record through `converter`, preserving order and
    /// length.
    pub fn convert<T>(&self, converter: impl FnMut(&MessageMatch<M>) -> T) -> Vec<T> {
        self.matches.iter().map(converter).collect()
    }
}

impl<M> Index<usize> for MatchSequence<M> {
    type Output = MessageMatch<M>;

    fn index(&self, position: usize) -> &Self::Output {
        &self.matches[position]
    }
}

impl<M> IntoIterator for MatchSequence<M> {
    type Item = MessageMatch<M>;
    type IntoIter = std::vec::IntoIter<MessageMatch<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<'a, M> IntoIterator for &'a MatchSequence<M> {
    type Item = &'a MessageMatch<M>;
    type IntoIter = std::slice::Iter<'a, MessageMatch<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, message: &str, succeeded: bool) -> MessageMatch<String> {
        MessageMatch::new(
            index,
            message.to_string(),
            succeeded,
            Duration::from_millis(index as u64 * 10),
        )
    }

    #[test]
    fn append_preserves_arrival_order() {
        let mut sequence = MatchSequence::new();
        assert!(sequence.is_empty());

        sequence.append(record(0, "first", true));
        sequence.append(record(1, "second", false));
        sequence.append(record(2, "third", true));

        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence[0].message(), "first");
        assert_eq!(sequence[1].index(), 1);
        assert!(!sequence[1].succeeded());
        assert_eq!(sequence.last().unwrap().message(), "third");
        assert!(sequence.get(3).is_none());
    }

    #[test]
    fn convert_maps_every_record_in_order() {
        let mut sequence = MatchSequence::new();
        sequence.append(record(0, "a", true));
        sequence.append(record(1, "b", false));

        let summarized = sequence.convert(|m| format!("{}:{}", m.index(), m.succeeded()));
        assert_eq!(summarized, vec!["0:true", "1:false"]);
    }

    #[test]
    fn record_exposes_elapsed_and_converts() {
        let m = record(2, "payload", true);
        assert_eq!(m.elapsed(), Duration::from_millis(20));
        assert_eq!(m.convert(|m| m.message().len()), 7);
        assert_eq!(m.into_message(), "payload");
    }
}
