use std::str::FromStr;

use serde::Deserialize;

/// Which execution backend a job should use, as written in config files and
/// on the command line.
///
/// - `Thread`: mapping runs on a pool of OS threads inside this process.
/// - `Process`: every unit of work runs in its own worker process.
///
/// No `Default`: every job names its backend explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Thread,
    Process,
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "thread" | "threads" => Ok(BackendType::Thread),
            "process" | "processes" => Ok(BackendType::Process),
            other => Err(format!(
                "invalid backend: {other} (expected \"thread\" or \"process\")"
            )),
        }
    }
}

/// Where progress bars are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressDisplay {
    /// Draw on stderr (indicatif hides the bars when stderr is not a tty).
    #[default]
    Stderr,
    /// Count only; nothing is drawn.
    Hidden,
}

impl FromStr for ProgressDisplay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stderr" => Ok(ProgressDisplay::Stderr),
            "hidden" | "none" => Ok(ProgressDisplay::Hidden),
            other => Err(format!(
                "invalid progress display: {other} (expected \"stderr\" or \"hidden\")"
            )),
        }
    }
}
