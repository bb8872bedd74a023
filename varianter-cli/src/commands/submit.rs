//! Submit command - create a task and optionally wait for it.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use varianter::app::App;
use varianter::service::TaskView;

use crate::error::CliError;
use crate::runner::CliRunner;

/// How often `--wait` polls the task.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Arguments for the submit command.
pub struct SubmitArgs {
    pub source: String,
    pub wait: bool,
    pub timeout_secs: u64,
}

/// Run the submit command.
///
/// Without `--wait` the pending task is printed at once; processing still
/// finishes before the process exits because shutdown drains the queue.
pub fn run(runner: &CliRunner, args: SubmitArgs) -> Result<(), CliError> {
    runner.log_startup("submit");

    runner.block_on(async {
        let app = App::start(runner.config().clone()).await?;
        let submitted = app.service().submit_task(&args.source).await?;

        if !args.wait {
            println!("{}", serde_json::to_string_pretty(&submitted)?);
            app.shutdown().await?;
            return Ok(());
        }

        let view = wait_for_terminal(&app, &submitted.id.to_string(), args.timeout_secs).await;
        app.shutdown().await?;
        println!("{}", serde_json::to_string_pretty(&view?)?);
        Ok::<(), CliError>(())
    })
}

/// Polls until the task leaves `Pending` or the timeout passes.
async fn wait_for_terminal(app: &App, id: &str, timeout_secs: u64) -> Result<TaskView, CliError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Processing task {}", id));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        let view = app.service().query_task(id).await?;
        if view.status.is_terminal() {
            spinner.finish_with_message(format!("Task {} {}", id, view.status));
            return Ok(view);
        }
        if Instant::now() >= deadline {
            spinner.abandon_with_message(format!("Task {} still pending", id));
            return Err(CliError::WaitTimeout {
                task_id: id.to_string(),
                seconds: timeout_secs,
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
