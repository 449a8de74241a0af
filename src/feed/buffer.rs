use crate::feed::event::WinEvent;
use std::collections::VecDeque;

/// Bounded newest-first event buffer with a rotating "featured" pointer
#[derive(Debug, Clone)]
pub struct FeedBuffer {
    events: VecDeque<WinEvent>,
    capacity: usize,
    featured_window: usize,
    featured: usize,
}

impl FeedBuffer {
    pub fn new(capacity: usize, featured_window: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity + 1),
            capacity,
            featured_window: featured_window.max(1),
            featured: 0,
        }
    }

    /// Insert at the front, returning the evicted oldest event on overflow
    pub fn push(&mut self, event: WinEvent) -> Option<WinEvent> {
        self.events.push_front(event);
        if self.events.len() > self.capacity {
            self.events.pop_back()
        } else {
            None
        }
    }

    fn window(&self) -> usize {
        self.events.len().min(self.featured_window)
    }

    /// Advance the featured pointer over the most recent entries
    pub fn rotate(&mut self) {
        let window = self.window();
        self.featured = if window == 0 { 0 } else { (self.featured + 1) % window };
    }

    pub fn featured_index(&self) -> usize {
        match self.window() {
            0 => 0,
            window => self.featured % window,
        }
    }

    pub fn featured(&self) -> Option<&WinEvent> {
        self.events.get(self.featured_index())
    }

    /// Newest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &WinEvent> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<WinEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;
    use crate::feed::event::WinEventFactory;
    use crate::rng::SeededRandom;
    use chrono::Utc;

    fn events(count: usize) -> Vec<WinEvent> {
        let factory = WinEventFactory::new(FeedConfig::default());
        let mut rng = SeededRandom::new(3);
        (0..count).map(|_| factory.fabricate(&mut rng, Utc::now())).collect()
    }

    #[test]
    fn test_newest_first_with_eviction() {
        let mut buffer = FeedBuffer::new(10, 3);
        let events = events(25);

        for (i, event) in events.iter().enumerate() {
            let evicted = buffer.push(event.clone());
            assert!(buffer.len() <= 10);
            if i >= 10 {
                assert_eq!(evicted.as_ref(), Some(&events[i - 10]));
            } else {
                assert!(evicted.is_none());
            }
        }

        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.iter().next(), events.last());
        assert_eq!(buffer.iter().last(), Some(&events[15]));
    }

    #[test]
    fn test_rotation_cycles_over_recent_window() {
        let mut buffer = FeedBuffer::new(10, 3);
        let events = events(5);
        for event in &events {
            buffer.push(event.clone());
        }

        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(buffer.featured_index());
            buffer.rotate();
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(buffer.featured(), Some(&events[4]));
    }

    #[test]
    fn test_rotation_with_short_buffer() {
        let mut buffer = FeedBuffer::new(10, 3);
        assert!(buffer.featured().is_none());
        buffer.rotate();
        assert_eq!(buffer.featured_index(), 0);

        let events = events(2);
        buffer.push(events[0].clone());
        buffer.push(events[1].clone());
        buffer.rotate();
        assert_eq!(buffer.featured(), Some(&events[0]));
        buffer.rotate();
        assert_eq!(buffer.featured(), Some(&events[1]));
    }
}
