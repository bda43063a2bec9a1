//! Batch orchestration: every fixture account gets its run, one failure
//! never stops the rest, and the browser session is wiped between accounts.

use std::sync::Arc;

use tracing::{error, info, warn};

use inviteflow_core::types::InvitedAccount;
use inviteflow_core::FlowError;

use crate::executor::{AccountOutcome, FlowExecutor};
use crate::page::PageDriver;

#[derive(Debug)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// One outcome per input account, same order.
    pub outcomes: Vec<AccountOutcome>,
}

impl BatchReport {
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.processed as f64 * 100.0
    }

    pub fn log_summary(&self) {
        info!(
            processed = self.processed,
            succeeded = self.succeeded,
            failed = self.failed,
            success_rate = format!("{:.0}%", self.success_rate()),
            "batch finished"
        );
        for outcome in &self.outcomes {
            if outcome.succeeded() {
                info!(email = %outcome.email, reason = %outcome.reason, "ok");
            } else {
                warn!(email = %outcome.email, reason = %outcome.reason, "failed");
            }
        }
    }
}

pub struct BatchRunner {
    driver: Arc<dyn PageDriver>,
    executor: FlowExecutor,
}

impl BatchRunner {
    pub fn new(driver: Arc<dyn PageDriver>, executor: FlowExecutor) -> Self {
        Self { driver, executor }
    }

    /// Process every account in fixture order. Each account starts from a
    /// fresh browser session; any failure is recorded and the batch moves
    /// on to the next account.
    pub async fn process_all(&self, accounts: &[InvitedAccount]) -> BatchReport {
        let mut outcomes = Vec::with_capacity(accounts.len());

        for (index, account) in accounts.iter().enumerate() {
            info!(
                email = %account.email,
                position = index + 1,
                total = accounts.len(),
                "starting account"
            );

            if let Err(e) = self.driver.reset_session().await {
                error!(email = %account.email, error = %e, "session reset failed");
                outcomes.push(AccountOutcome::failure(
                    &account.email,
                    format!("session reset failed: {}", e),
                ));
                continue;
            }

            match self.executor.run(account).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(email = %account.email, error = %e, "account run errored");
                    outcomes.push(AccountOutcome::failure(&account.email, e.to_string()));
                }
            }
        }

        if let Err(e) = self.driver.reset_session().await {
            warn!(error = %e, "final session reset failed");
        }

        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        let report = BatchReport {
            processed: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        };
        report.log_summary();
        report
    }
}
