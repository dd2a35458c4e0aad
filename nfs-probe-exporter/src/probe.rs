//! NFS export probing.
//!
//! Two strategies are available, selected by [`ProbeStrategy`]:
//!
//! - [`ProbeStrategy::Direct`] lists every target with `nfs-ls` over NFSv4,
//!   one invocation per target, in the order given.
//! - [`ProbeStrategy::ExportList`] asks each host for its export list with
//!   `showmount -e`, one invocation per host, and checks that every required
//!   path is exported.
//!
//! Both stop at the first failure. Tool errors, non-zero exits and timeouts
//! all count as a failed probe; nothing is propagated to the caller.

use std::collections::HashSet;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{ProbeConfig, ProbeStrategy};
use crate::error::ProbeError;
use crate::runner::{CommandOutput, CommandRunner};
use crate::target::{Target, TargetSet};

/// Checks NFS targets using external tools.
pub struct Prober<R> {
    runner: R,
    config: ProbeConfig,
}

impl<R: CommandRunner> Prober<R> {
    /// Create a prober around a command runner.
    pub fn new(runner: R, config: ProbeConfig) -> Self {
        Self { runner, config }
    }

    /// The configured strategy.
    pub fn strategy(&self) -> ProbeStrategy {
        self.config.strategy
    }

    /// Probe all targets; `true` only if every one of them is available.
    pub async fn probe(&self, targets: &[Target]) -> bool {
        match self.config.strategy {
            ProbeStrategy::Direct => self.probe_direct(targets).await,
            ProbeStrategy::ExportList => self.probe_export_list(targets).await,
        }
    }

    async fn probe_direct(&self, targets: &[Target]) -> bool {
        for target in targets {
            let args = [target.nfs_uri()];
            if let Err(e) = self.invoke(&self.config.nfs_ls_command, &args).await {
                warn!(target = %target, error = %e, "NFS export not reachable");
                return false;
            }
            debug!(target = %target, "NFS export reachable");
        }
        true
    }

    async fn probe_export_list(&self, targets: &[Target]) -> bool {
        let set = TargetSet::from_targets(targets);

        for (host, required) in set.iter() {
            let args = [
                "--no-header".to_string(),
                "-e".to_string(),
                "--".to_string(),
                host.to_string(),
            ];

            let output = match self.invoke(&self.config.showmount_command, &args).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(host, error = %e, "Failed to list NFS exports");
                    return false;
                }
            };

            let exported = parse_export_list(&output.stdout);
            let missing: Vec<&str> = required
                .iter()
                .filter(|p| !exported.contains(p.as_str()))
                .map(String::as_str)
                .collect();

            if !missing.is_empty() {
                warn!(host, ?missing, "Required NFS exports not exported");
                return false;
            }
            debug!(host, paths = required.len(), "All required NFS exports present");
        }
        true
    }

    /// Run one tool invocation under the configured timeout.
    async fn invoke(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProbeError> {
        let limit = self.config.timeout();

        let output = timeout(limit, self.runner.run(program, args))
            .await
            .map_err(|_| ProbeError::Timeout {
                program: program.to_string(),
                timeout: limit,
            })?
            .map_err(|source| ProbeError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.success() {
            return Err(ProbeError::ExitStatus {
                program: program.to_string(),
                status: output.status,
            });
        }

        Ok(output)
    }
}

/// Extract exported paths from `showmount --no-header -e` output.
///
/// Each line is `<path> <clients...>`; only the path is kept.
pub fn parse_export_list(stdout: &str) -> HashSet<&str> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect()
}
