pub mod batch;
pub mod chrome;
pub mod classifier;
pub mod dom;
pub mod executor;
pub mod names;
pub mod page;

#[cfg(test)]
pub(crate) mod testutil;

pub use batch::{BatchReport, BatchRunner};
pub use chrome::ChromeSession;
pub use classifier::{classify, PageVariant};
pub use dom::PageEvidence;
pub use executor::{AccountOutcome, FlowConfig, FlowExecutor, FlowState, OutcomeStatus};
pub use page::PageDriver;
