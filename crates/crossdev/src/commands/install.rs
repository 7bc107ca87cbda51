//! SDK install command
//!
//! Starts the install job and prints its progress events until the terminal
//! one arrives. Ctrl-C aborts the job.

use anyhow::{bail, Result};
use camino::Utf8Path;
use console::style;
use crossdev_core::types::SdkManagementMsg;
use crossdev_core::Error;
use crossdev_sdk::InstallRequest;
use indicatif::ProgressBar;
use std::time::Duration;

use super::common::load_manager;
use crate::cli::InstallArgs;
use crate::output;
use crate::terminal::{TerminalSessions, CLI_SESSION};

/// How long an aborted job may take to exit
const ABORT_WAIT: Duration = Duration::from_secs(10);

fn request(args: &InstallArgs) -> InstallRequest {
    let mut request = InstallRequest::new(CLI_SESSION).force(args.force);
    if let Some(file) = &args.file {
        request = request.with_file(file.as_str());
    } else if let Some(url) = &args.url {
        request = request.with_url(url.as_str());
    }
    if let Some(secs) = args.timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }
    request
}

fn print_output(spinner: &ProgressBar, msg: &SdkManagementMsg) {
    for line in msg.stdout.lines() {
        spinner.println(line);
    }
    for line in msg.stderr.lines() {
        spinner.println(format!("{}", style(line).yellow()));
    }
}

pub async fn run(args: InstallArgs, config: Option<&Utf8Path>) -> Result<()> {
    let (sessions, mut events) = TerminalSessions::channel();
    let (_, manager) = load_manager(config, sessions).await?;
    let sdk = manager.resolve(&args.id)?;
    let name = sdk.get().name;

    let cmd_id = match sdk.install(request(&args)).await {
        Ok(cmd_id) => cmd_id,
        Err(e) if e.is_precondition() => {
            output::warning(&e.to_string());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    output::info(&format!("Installing SDK {} ({})", name, cmd_id));
    let spinner = output::spinner(&format!("Installing {}", name));

    let mut aborted = false;
    let exit = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(msg) if msg.cmd_id != cmd_id => continue,
                Some(msg) => {
                    print_output(&spinner, &msg);
                    if msg.exited {
                        break Some(msg);
                    }
                }
                None => break None,
            },
            _ = tokio::signal::ctrl_c(), if !aborted => {
                aborted = true;
                spinner.set_message(format!("Aborting install of {}", name));
                sdk.abort_install_remove(Some(ABORT_WAIT)).await?;
            }
        }
    };
    spinner.finish_and_clear();

    let Some(exit) = exit else {
        bail!("Install of {} ended without a result", name);
    };
    if exit.code != Some(0) || !exit.error.is_empty() {
        return Err(Error::job_failure(format!("Install of {} failed: {}", name, exit.error)).into());
    }

    output::success(&format!("SDK {} installed in {}", name, exit.sdk.path));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossdev_sdk::InstallSource;

    fn args(file: Option<&str>, url: Option<&str>) -> InstallArgs {
        InstallArgs {
            id: "0123".to_string(),
            file: file.map(Into::into),
            url: url.map(String::from),
            force: false,
            timeout: None,
        }
    }

    #[test]
    fn test_request_defaults_to_catalog_url() {
        let request = request(&args(None, None));
        assert_eq!(request.source, InstallSource::Catalog);
        assert_eq!(request.session_id, CLI_SESSION);
        assert!(request.timeout.is_none());
    }

    #[test]
    fn test_request_from_file() {
        let mut install = args(Some("/tmp/sdk.sh"), None);
        install.force = true;
        install.timeout = Some(60);

        let request = request(&install);
        assert_eq!(request.source, InstallSource::File("/tmp/sdk.sh".to_string()));
        assert!(request.force);
        assert_eq!(request.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_request_from_url() {
        let request = request(&args(None, Some("https://example.org/sdk.sh")));
        assert_eq!(
            request.source,
            InstallSource::Url("https://example.org/sdk.sh".to_string())
        );
    }
}
