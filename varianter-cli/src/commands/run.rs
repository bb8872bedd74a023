//! Run command - resume pending work and exit when it is done.

use serde_json::json;
use varianter::app::App;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the run command.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("run");

    runner.block_on(async {
        let app = App::start(runner.config().clone()).await?;
        let recovery = app.recovery_report();
        if recovery.found == 0 {
            println!("No pending tasks.");
        } else {
            println!("Resuming {} pending task(s)...", recovery.accepted);
        }

        let queue = app.shutdown().await?;
        let summary = json!({ "recovery": recovery, "queue": queue });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok::<(), CliError>(())
    })
}
