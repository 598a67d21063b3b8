//! Command dispatch shared by both runner modes.

use crate::backend::WorksBackend;
use crate::cli::Command;
use crate::error::WorkflowResult;
use crate::import::ImportOptions;
use crate::prompt::Prompter;
use crate::{export, import};

/// Run `command` against `backend`. The environment must already be up.
pub async fn dispatch<B, P>(backend: &B, command: Command, prompter: &P) -> WorkflowResult<()>
where
    B: WorksBackend,
    P: Prompter + ?Sized,
{
    match command {
        Command::Up => Ok(()),
        Command::Import(args) => {
            import::run(
                backend,
                ImportOptions {
                    skip_verify: args.skip_verify,
                },
            )
            .await?;
            Ok(())
        }
        Command::Verify(_) => {
            backend.prepare().await?;
            backend.install_report_dependencies().await;
            backend.verify().await
        }
        Command::Count => {
            backend.prepare().await?;
            println!("{}", backend.count().await?);
            Ok(())
        }
        Command::Export(args) => {
            export::run(backend, args.remote(), prompter).await?;
            Ok(())
        }
    }
}
