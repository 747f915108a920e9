use std::collections::VecDeque;

/// Bounded FIFO of recent samples; the oldest falls off once full.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    buf: VecDeque<f64>,
    cap: usize,
}

impl SampleHistory {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            buf: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, v: f64) {
        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(v);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.buf.is_empty() {
            return None;
        }
        Some(self.buf.iter().sum::<f64>() / self.buf.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let mut h = SampleHistory::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            h.push(v);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.mean(), Some(3.0));
    }

    #[test]
    fn empty_has_no_mean() {
        let h = SampleHistory::new(0);
        assert!(h.is_empty());
        assert_eq!(h.mean(), None);
    }
}
