//! Named counters for flow statistics.

/// A fixed set of named counters, registered up front and owned by one
/// controller.
///
/// Unknown names are ignored on write and read as zero.
#[derive(Clone, Debug, Default)]
pub struct StatsCounter {
    counters: Vec<(&'static str, u64)>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            counters: names.iter().map(|&name| (name, 0)).collect(),
        }
    }

    pub fn increment(&mut self, name: &str) {
        if let Some((_, count)) = self.counters.iter_mut().find(|(n, _)| *n == name) {
            *count += 1;
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0, |&(_, count)| count)
    }
}
