//! Heavy-workload detection - Process table sampling and name matching

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{trace, warn};

/// Case-insensitive substring patterns that mark a process as heavy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeavyWorkloadSet {
    patterns: Vec<String>,
}

impl HeavyWorkloadSet {
    /// Build the set, lowercasing every pattern and dropping blank ones
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check a single process name against every pattern
    pub fn matches(&self, process_name: &str) -> bool {
        let name = process_name.to_lowercase();
        self.patterns.iter().any(|p| name.contains(p.as_str()))
    }

    /// Return the first process name that matches, if any
    pub fn first_match<I, S>(&self, process_names: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.is_empty() {
            return None;
        }
        process_names
            .into_iter()
            .find(|name| self.matches(name.as_ref()))
            .map(|name| name.as_ref().to_string())
    }
}

/// Decides whether a heavy workload is currently running
pub trait Detector: Send {
    /// Name of a running heavy process, or `None` when the system is free.
    ///
    /// Must fail open: enumeration problems yield `None`.
    fn find_heavy(&mut self) -> Option<String>;

    /// Bare verdict; the controller uses [`Detector::find_heavy`] to keep the name
    #[cfg(test)]
    fn detect(&mut self) -> bool {
        self.find_heavy().is_some()
    }
}

/// Detector backed by the OS process table
pub struct ProcessDetector {
    /// Cached process table, refreshed on every sample
    system: System,
    workloads: HeavyWorkloadSet,
}

impl ProcessDetector {
    pub fn new(workloads: HeavyWorkloadSet) -> Self {
        Self {
            system: System::new(),
            workloads,
        }
    }

    pub fn workloads(&self) -> &HeavyWorkloadSet {
        &self.workloads
    }

    /// Refresh the process list; only names are needed, so no per-process
    /// CPU, memory or disk data is collected
    fn refresh(&mut self) -> usize {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new(),
        )
    }
}

impl Detector for ProcessDetector {
    fn find_heavy(&mut self) -> Option<String> {
        self.refresh();

        let processes = self.system.processes();
        if processes.is_empty() {
            warn!("Process table is empty, treating system as free");
            return None;
        }
        trace!("Sampled {} processes", processes.len());

        // Names come from the refreshed snapshot, so processes that exited
        // since the refresh cannot fail the scan.
        self.workloads.first_match(
            processes
                .values()
                .map(|process| process.name().to_string_lossy()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively() {
        let set = HeavyWorkloadSet::new(["blender"]);
        let found = set.first_match(["explorer.exe", "Blender.exe"]);
        assert_eq!(found.as_deref(), Some("Blender.exe"));
    }

    #[test]
    fn pattern_case_is_ignored_too() {
        let set = HeavyWorkloadSet::new(["Cyberpunk2077"]);
        assert!(set.matches("cyberpunk2077.exe"));
        assert!(set.matches("CYBERPUNK2077"));
        assert!(!set.matches("cyberpunk"));
    }

    #[test]
    fn substring_anywhere_in_name() {
        let set = HeavyWorkloadSet::new(["premiere"]);
        assert!(set.matches("Adobe Premiere Pro.exe"));
    }

    #[test]
    fn empty_process_list_is_free() {
        let set = HeavyWorkloadSet::new(["blender"]);
        assert_eq!(set.first_match(Vec::<String>::new()), None);
    }

    #[test]
    fn no_match_is_free() {
        let set = HeavyWorkloadSet::new(["GTA5", "RDR2"]);
        assert_eq!(set.first_match(["explorer.exe", "svchost.exe", "code"]), None);
    }

    #[test]
    fn blank_patterns_never_match_everything() {
        let set = HeavyWorkloadSet::new(["", "   "]);
        assert!(set.is_empty());
        assert_eq!(set.first_match(["anything"]), None);
    }

    #[test]
    fn first_matching_process_short_circuits() {
        let set = HeavyWorkloadSet::new(["gta5", "rdr2"]);
        let found = set.first_match(["RDR2.exe", "GTA5.exe"]);
        assert_eq!(found.as_deref(), Some("RDR2.exe"));
    }

    #[test]
    fn live_process_table_does_not_panic() {
        let mut detector = ProcessDetector::new(HeavyWorkloadSet::new([
            "a-process-name-that-should-never-exist-0xdeadbeef",
        ]));
        assert!(!detector.detect());
    }
}
