//! Session orchestrator: fan-out of independent conversations
//!
//! Each conversation runs as its own OS process (the binary re-invokes its
//! `run` subcommand), so a crash in one session can never corrupt another's
//! in-memory state. Start times are staggered by a uniform random warm-up
//! delay; the orchestrator waits on every child, counting completions as
//! they finish, and never cancels the remaining sessions when one fails.

use rand::Rng;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::session::SessionReport;
use crate::types::TEST_CONVERSATION_PREFIX;

/// Default random start-delay range, in seconds
pub const DEFAULT_START_DELAY_RANGE: (u64, u64) = (10, 40);

/// Parameters for a fan-out run
#[derive(Debug, Clone)]
pub struct FanOutOptions {
    /// Number of conversations to launch
    pub num_conversations: u32,
    /// Tag used to namespace every generated id
    pub tag: String,
    /// Turns per conversation
    pub turns: u32,
    /// Base pacing delay, in seconds, passed through to each session
    pub delay_secs: f64,
    /// Backend address
    pub address: String,
    /// Inclusive range for the random per-session start delay, seconds
    pub start_delay_range: (u64, u64),
}

/// Completion counts for a fan-out run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Sessions that reached DONE
    pub succeeded: u32,
    /// Sessions that aborted with an error
    pub failed: u32,
}

impl FanOutReport {
    /// Total sessions accounted for
    pub fn total(&self) -> u32 {
        self.succeeded + self.failed
    }
}

/// Deterministic, namespaced conversation id for session `n` of a tagged run
pub fn conversation_id(tag: &str, n: u32) -> String {
    format!("{TEST_CONVERSATION_PREFIX}_{tag}_{n}")
}

/// Deterministic end-user id for session `n` of a tagged run
pub fn chat_user_id(tag: &str, n: u32) -> String {
    format!("test_user_{tag}_{n}")
}

/// Deterministic operator id for session `n` of a tagged run
pub fn woz_user_id(tag: &str, n: u32) -> String {
    format!("test_agent_{tag}_{n}")
}

/// Launch `num_conversations` sessions as child processes and block until
/// every one completes.
///
/// # Errors
/// Returns an error only when a child cannot be spawned or waited on;
/// per-session failures are counted in the report, not propagated.
pub async fn run_fan_out(options: &FanOutOptions) -> Result<FanOutReport> {
    let exe = std::env::current_exe()?;
    let (lo, hi) = options.start_delay_range;

    let mut children = Vec::with_capacity(options.num_conversations as usize);
    for n in 0..options.num_conversations {
        let start_delay = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        let cid = conversation_id(&options.tag, n);
        log::info!("conversation {cid} is waiting for {start_delay} seconds");

        let child = Command::new(&exe)
            .arg("run")
            .args(["--address", &options.address])
            .args(["--conversation-id", &cid])
            .args(["--turns", &options.turns.to_string()])
            .args(["--user", &chat_user_id(&options.tag, n)])
            .args(["--woz", &woz_user_id(&options.tag, n)])
            .args(["--delay", &options.delay_secs.to_string()])
            .args(["--start-delay", &start_delay.to_string()])
            .arg("--randomize")
            .spawn()?;
        children.push((cid, child));
    }

    log::info!(
        "started {} session processes, waiting for completion",
        children.len()
    );

    let mut report = FanOutReport::default();
    for (cid, mut child) in children {
        let status = child.wait().await?;
        if status.success() {
            report.succeeded += 1;
            log::info!("conversation {cid} is complete");
        } else {
            report.failed += 1;
            log::error!("conversation {cid} failed ({status})");
        }
        log::info!("# finished = {}", report.total());
    }
    Ok(report)
}

/// Await already-spawned in-process session tasks, counting outcomes as
/// they finish.
///
/// The task-level counterpart of [`run_fan_out`] for embedders and tests;
/// a failing session never cancels its siblings.
pub async fn await_sessions(handles: Vec<JoinHandle<Result<SessionReport>>>) -> FanOutReport {
    let mut report = FanOutReport::default();
    for handle in handles {
        match handle.await {
            Ok(Ok(session)) => {
                report.succeeded += 1;
                log::info!("conversation {} completed", session.conversation_id);
            }
            Ok(Err(e)) => {
                report.failed += 1;
                log::error!("session failed: {e}");
            }
            Err(e) => {
                report.failed += 1;
                log::error!("session task panicked: {e}");
            }
        }
        log::info!("# finished = {}", report.total());
    }
    report
}
