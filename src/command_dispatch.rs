//! Purpose: Hold top-level CLI command dispatch for `tractorbeam`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `publish` validates its destination base before reading stdin or any I/O.
//! Invariants: Staging goes through `api::stage`, which writes stdout only on success.

use super::*;
use tractorbeam::api::{Context, Operation, S3_PREFIX, S3Location, S3Storage, stage};

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tractorbeam", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Fetch { strip_components } => run_stage(Operation::Fetch, strip_components),
        Command::Publish {
            dest_s3_base_url,
            strip_components,
        } => {
            let dest_base = parse_destination_base(&dest_s3_base_url)?;
            run_stage(Operation::Publish { dest_base }, strip_components)
        }
    }
}

fn parse_destination_base(input: &str) -> Result<S3Location, Error> {
    if !input.starts_with(S3_PREFIX) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!(
                "Expected S3 destination URL \"{input}\" to start with \"{S3_PREFIX}\""
            ))
            .with_hint("Pass a destination base like s3://bucket/prefix."));
    }
    S3Location::parse(input)
        .map_err(|err| err.with_hint("Pass a destination base like s3://bucket/prefix."))
}

fn run_stage(operation: Operation, strip: usize) -> Result<RunOutcome, Error> {
    let storage = S3Storage::new()?;
    let ctx = Context::new(&storage, strip)?;
    stage(&ctx, &operation, io::stdin().lock(), io::stdout().lock())?;
    Ok(RunOutcome::ok())
}
