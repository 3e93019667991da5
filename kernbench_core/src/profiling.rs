//! Section profiler
//!
//! Records how often named sections of a kernel run and how long they take,
//! then reports each section's share of the total measured time.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Aggregated timing for one named section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionStats {
    pub name: String,
    pub hits: u64,
    pub total: Duration,
    pub per_hit: Duration,
    /// Share of all recorded time, in percent
    pub percent: f64,
}

#[derive(Debug)]
struct SectionRecord {
    name: String,
    hits: u64,
    total: Duration,
}

/// Thread-safe section profiler
#[derive(Debug, Default)]
pub struct Profiler {
    sections: Mutex<Vec<SectionRecord>>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time `f` and record it under `name`
    pub fn section<R, F>(&self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let out = f();
        self.record(name, start.elapsed());
        out
    }

    /// Add one hit of `elapsed` to section `name`
    pub fn record(&self, name: &str, elapsed: Duration) {
        let mut sections = self.sections.lock();
        match sections.iter_mut().find(|s| s.name == name) {
            Some(section) => {
                section.hits += 1;
                section.total += elapsed;
            }
            None => sections.push(SectionRecord {
                name: name.to_string(),
                hits: 1,
                total: elapsed,
            }),
        }
    }

    pub fn reset(&self) {
        self.sections.lock().clear();
    }

    /// Sections in first-recorded order
    pub fn report(&self) -> Vec<SectionStats> {
        let sections = self.sections.lock();
        let grand_total: f64 = sections.iter().map(|s| s.total.as_secs_f64()).sum();

        sections
            .iter()
            .map(|s| SectionStats {
                name: s.name.clone(),
                hits: s.hits,
                total: s.total,
                per_hit: per_hit(s.total, s.hits),
                percent: if grand_total > 0.0 {
                    s.total.as_secs_f64() / grand_total * 100.0
                } else {
                    0.0
                },
            })
            .collect()
    }

    /// Render the report as a fixed-width table
    pub fn format_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<28} {:>8} {:>14} {:>14} {:>8}\n",
            "Section", "Hits", "Total (ms)", "Per hit (us)", "% Time"
        ));
        out.push_str(&"-".repeat(76));
        out.push('\n');
        for s in self.report() {
            out.push_str(&format!(
                "{:<28} {:>8} {:>14.3} {:>14.3} {:>8.1}\n",
                s.name,
                s.hits,
                s.total.as_secs_f64() * 1_000.0,
                s.per_hit.as_secs_f64() * 1_000_000.0,
                s.percent
            ));
        }
        out
    }
}

/// Mean duration per hit, exact to the nanosecond for any hit count
fn per_hit(total: Duration, hits: u64) -> Duration {
    let nanos = total.as_nanos() / u128::from(hits.max(1));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_accumulate_in_order() {
        let profiler = Profiler::new();
        profiler.record("second", Duration::from_millis(3));
        profiler.record("first", Duration::from_millis(1));
        profiler.record("second", Duration::from_millis(1));

        let report = profiler.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "second");
        assert_eq!(report[0].hits, 2);
        assert_eq!(report[0].total, Duration::from_millis(4));
        assert_eq!(report[0].per_hit, Duration::from_millis(2));
        assert!((report[0].percent - 80.0).abs() < 1e-9);
        assert!((report[1].percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_section_returns_value() {
        let profiler = Profiler::new();
        let value = profiler.section("sum", || (1..=10).sum::<u32>());
        assert_eq!(value, 55);
        assert_eq!(profiler.report()[0].hits, 1);
        assert!(profiler.format_table().contains("sum"));

        profiler.reset();
        assert!(profiler.report().is_empty());
    }

    #[test]
    fn test_per_hit_with_large_hit_counts() {
        assert_eq!(per_hit(Duration::from_secs(1), 0), Duration::from_secs(1));
        assert_eq!(per_hit(Duration::from_secs(8), 1 << 32), Duration::from_nanos(1));
        assert_eq!(per_hit(Duration::from_millis(3), 1 << 33), Duration::ZERO);

        let profiler = Profiler::new();
        profiler.sections.lock().push(SectionRecord {
            name: "hot loop".to_string(),
            hits: 1 << 32,
            total: Duration::from_secs(1 << 32),
        });
        let report = profiler.report();
        assert_eq!(report[0].per_hit, Duration::from_secs(1));
    }
}
