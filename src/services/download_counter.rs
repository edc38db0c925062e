use crate::database::DatabaseService;
use crate::error::RegistryResult;
use crate::models::TOTAL_DOWNLOADS_ID;
use crate::version::split_fullname;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Mutex;

const TOTAL_KEY: &str = "*";
const ROLLUP_VERSION: &str = "*";

type Counters = HashMap<String, HashMap<String, i64>>;

/// In-memory download tally, flushed to daily rows periodically.
/// Counts accumulated since the last flush are lost on crash.
#[derive(Debug, Default)]
pub struct DownloadCounter {
    counters: Mutex<Counters>,
}

impl DownloadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one download of `fullname@version`, plus the global and scope rollups
    pub fn plus(&self, fullname: &str, version: &str) {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        *counters
            .entry(fullname.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default() += 1;
        *counters
            .entry(TOTAL_KEY.to_string())
            .or_default()
            .entry(ROLLUP_VERSION.to_string())
            .or_default() += 1;

        let (scope, _) = split_fullname(fullname);
        if !scope.is_empty() {
            *counters
                .entry(format!("{scope}/{TOTAL_KEY}"))
                .or_default()
                .entry(ROLLUP_VERSION.to_string())
                .or_default() += 1;
        }
    }

    /// Swaps the tally for an empty one and returns what was collected
    pub fn take(&self) -> Counters {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *counters)
    }

    /// Persists the current tally under `date`, returning the number of rows
    /// written. Unknown packages are dropped.
    pub fn flush(&self, database: &DatabaseService, date: NaiveDate) -> RegistryResult<usize> {
        let snapshot = self.take();
        if snapshot.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        for (key, versions) in snapshot {
            let package_id = if key == TOTAL_KEY {
                TOTAL_DOWNLOADS_ID.to_string()
            } else if let Some(scope) = key.strip_suffix(&format!("/{TOTAL_KEY}")) {
                scope.to_string()
            } else {
                let (scope, name) = split_fullname(&key);
                match database.find_package(&scope, &name)? {
                    Some(package) => package.package_id,
                    None => {
                        debug!("Dropping downloads of unknown package {key}");
                        continue;
                    }
                }
            };

            for (version, count) in versions {
                if let Err(e) = database.plus_downloads(&package_id, &version, date, count) {
                    warn!("Failed to save {count} downloads of {key}@{version}: {e}");
                    continue;
                }
                written += 1;
            }
        }

        info!("Flushed {written} download counters for {date}");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_rolls_up_total_and_scope() {
        let counter = DownloadCounter::new();
        counter.plus("@cnpm/foo", "1.0.0");
        counter.plus("@cnpm/foo", "1.0.0");
        counter.plus("@cnpm/bar", "2.0.0");
        counter.plus("lodash", "4.17.21");

        let snapshot = counter.take();
        assert_eq!(snapshot["@cnpm/foo"]["1.0.0"], 2);
        assert_eq!(snapshot["@cnpm/bar"]["2.0.0"], 1);
        assert_eq!(snapshot["lodash"]["4.17.21"], 1);
        assert_eq!(snapshot["*"]["*"], 4);
        assert_eq!(snapshot["@cnpm/*"]["*"], 3);

        // the swap leaves an empty tally behind
        assert!(counter.take().is_empty());
    }
}
