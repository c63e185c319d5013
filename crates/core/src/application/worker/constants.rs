// Worker and recovery timing constants
use std::time::Duration;

/// Sleep duration when no job is due (500ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(500);

/// Sleep duration after a queue error before polling again (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default recovery window for orphaned RUNNING jobs (5 minutes)
pub const DEFAULT_RECOVERY_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Failure reason recorded for jobs whose task name has no handler
pub const UNKNOWN_TASK_REASON: &str = "no handler registered";
