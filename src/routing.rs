//! Where outcomes go: broker targets, archive targets and the names derived
//! for them.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Exchange, queue and routing key of one broker destination.
///
/// Shared by all three pipelines: every successful conversion goes to the
/// success target and every failure to the dead-letter target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingTarget {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
    #[serde(default)]
    pub auto_delete: bool,
}

impl RoutingTarget {
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
        auto_delete: bool,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            routing_key: routing_key.into(),
            auto_delete,
        }
    }

    /// `jsonExchange` / `jsonQueue` / `jsonRoutingKey`, durable queue.
    pub fn success() -> Self {
        Self::new("jsonExchange", "jsonQueue", "jsonRoutingKey", false)
    }

    /// `deadLetterExchange` / `deadLetterQueue` / `deadLetterRoutingKey`.
    ///
    /// The queue keeps the transport default `auto_delete = true`.
    pub fn dead_letter() -> Self {
        Self::new(
            "deadLetterExchange",
            "deadLetterQueue",
            "deadLetterRoutingKey",
            true,
        )
    }

    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        if self.exchange.trim().is_empty() {
            Some("exchange")
        } else if self.queue.trim().is_empty() {
            Some("queue")
        } else if self.routing_key.trim().is_empty() {
            Some("routing_key")
        } else {
            None
        }
    }
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.exchange, self.queue, self.routing_key)
    }
}

/// File an archive write lands in: `{directory}/{file_name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    pub directory: PathBuf,
    pub file_name: String,
}

impl ArchiveTarget {
    /// `{directory}/{upload}-{millis}.{extension}`.
    ///
    /// The upload's file name is kept whole, extension included, so
    /// `orders.csv` archives as `orders.csv-<millis>.yaml`.
    pub fn for_upload(
        directory: impl AsRef<Path>,
        upload_file_name: &str,
        millis: u64,
        extension: &str,
    ) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            file_name: format!("{upload_file_name}-{millis}.{extension}"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Name of the error artifact announced on the dead-letter message.
///
/// The upload name loses its final extension and gains a millisecond suffix:
/// `orders.csv` becomes `orders-<millis>-error.txt`. Names without a usable
/// stem (no `.` at all, or a leading `.` only, as in `.csv`) are kept whole,
/// and an empty name falls back to `upload`. Never fails.
pub fn derive_error_file_name(file_name: &str, millis: u64) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    let stem = if stem.is_empty() { "upload" } else { stem };
    format!("{stem}-{millis}-error.txt")
}

/// Source of epoch-millisecond timestamps for derived names.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock that never hands out the same value twice.
///
/// Two uploads with the same file name in the same millisecond would
/// otherwise share an archive name; each call returns
/// `max(now, previous + 1)`.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn error_file_name_strips_final_extension() {
        assert_eq!(
            derive_error_file_name("orders.csv", 1700000000123),
            "orders-1700000000123-error.txt"
        );
        assert_eq!(derive_error_file_name("a.b.json", 5), "a.b-5-error.txt");
    }

    #[test]
    fn error_file_name_fallbacks() {
        assert_eq!(derive_error_file_name("report", 7), "report-7-error.txt");
        assert_eq!(derive_error_file_name(".csv", 7), ".csv-7-error.txt");
        assert_eq!(derive_error_file_name("", 7), "upload-7-error.txt");
        assert_eq!(derive_error_file_name("trailing.", 7), "trailing-7-error.txt");
    }

    #[test]
    fn archive_target_keeps_full_upload_name() {
        let target = ArchiveTarget::for_upload("outputs", "orders.csv", 42, "yaml");
        assert_eq!(target.file_name, "orders.csv-42.yaml");
        assert_eq!(target.path(), PathBuf::from("outputs/orders.csv-42.yaml"));
    }

    #[test]
    fn default_targets() {
        let ok = RoutingTarget::success();
        assert!(!ok.auto_delete);
        assert_eq!(ok.to_string(), "jsonExchange/jsonQueue#jsonRoutingKey");

        let dead = RoutingTarget::dead_letter();
        assert!(dead.auto_delete);
        assert_eq!(dead.queue, "deadLetterQueue");
        assert_eq!(dead.missing_field(), None);
    }

    #[test]
    fn blank_target_fields_are_reported() {
        let target = RoutingTarget::new("ex", " ", "rk", false);
        assert_eq!(target.missing_field(), Some("queue"));
    }

    #[test]
    fn monotonic_clock_never_repeats_across_threads() {
        let clock = Arc::new(MonotonicClock::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || (0..500).map(|_| clock.now_millis()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate timestamp {value}");
            }
        }
        assert_eq!(seen.len(), 8 * 500);
    }
}
