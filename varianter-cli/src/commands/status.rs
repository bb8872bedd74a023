//! Status command - print one task.
//!
//! Reads the store directly without starting the queue, so querying never
//! triggers recovery of pending work.

use varianter::app::open_store;
use varianter::service::{parse_task_id, view_task};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the status command.
pub fn run(runner: &CliRunner, id: &str) -> Result<(), CliError> {
    let id = parse_task_id(id)?;
    runner.block_on(async {
        let store = open_store(&runner.config().storage).await?;
        let view = view_task(store.as_ref(), id).await?;
        println!("{}", serde_json::to_string_pretty(&view)?);
        Ok::<(), CliError>(())
    })
}
