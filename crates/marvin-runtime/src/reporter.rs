//! Logs the outcome of every hook invocation.

use marvin_core::ReportReceiver;
use tracing::{trace, warn};

/// Counts of the reports seen by [`run_reporter`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReporterStats {
    /// Hooks that returned `Ok`.
    pub succeeded: u64,
    /// Hooks that returned an error or panicked.
    pub failed: u64,
}

/// Drains the report channel until every sender is gone.
///
/// Failed hooks are logged at `warn`; they never affect the connection.
pub async fn run_reporter(mut reports: ReportReceiver) -> ReporterStats {
    let mut stats = ReporterStats::default();

    while let Some(report) = reports.recv().await {
        match report.outcome {
            Ok(()) => {
                stats.succeeded += 1;
                trace!(command = %report.command, "Hook finished");
            }
            Err(e) => {
                stats.failed += 1;
                warn!(command = %report.command, error = %e, "Hook failed");
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use marvin_core::{HookReport, HookResult};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_counts_outcomes_until_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = tokio::spawn(run_reporter(rx));

        let outcomes: [HookResult; 3] = [Ok(()), Err("boom".into()), Ok(())];
        for outcome in outcomes {
            tx.send(HookReport {
                command: "privmsg".into(),
                outcome,
            })
            .unwrap();
        }
        drop(tx);

        let stats = reporter.await.unwrap();
        assert_eq!(
            stats,
            ReporterStats {
                succeeded: 2,
                failed: 1
            }
        );
    }
}
