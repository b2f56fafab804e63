use std::error::Error;
use std::process::ExitCode;

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let report = shard_tasks::cli::run_assign_tasks(std::env::args().skip(1))?;
    match report {
        Some(report) if !report.is_success() => Ok(ExitCode::FAILURE),
        _ => Ok(ExitCode::SUCCESS),
    }
}
