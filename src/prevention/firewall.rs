use std::net::IpAddr;
use std::process::{Command, Output};

use log::info;

use crate::utils::error::AppError;

/// Result of applying a block to the packet filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The address was freshly added to the filter set
    Added,
    /// The filter already held this exact entry
    AlreadyPresent,
}

/// The packet-filter surface the pipeline depends on. One implementation
/// shells out to ipset/iptables; tests substitute an in-process double.
pub trait FilterClient: Send + 'static {
    /// Verify the filter tooling is installed and usable.
    fn ensure_available(&self) -> Result<(), AppError>;

    /// Create the named address set, tolerating one that already exists.
    fn ensure_set(&self) -> Result<(), AppError>;

    /// Install the rule dropping traffic matching the address set,
    /// tolerating a rule that already exists.
    fn ensure_rule(&self) -> Result<(), AppError>;

    /// Add one address to the set. An entry the filter already holds is
    /// reported as `AlreadyPresent`, not an error.
    fn block_ip(&mut self, addr: IpAddr) -> Result<BlockOutcome, AppError>;
}

/// Filter client backed by `ipset` and `iptables`. Blocked addresses go
/// into an iphash set matched by a single DROP rule in the raw table.
pub struct IpsetClient {
    set_name: String,
}

impl IpsetClient {
    pub fn new(set_name: impl Into<String>) -> Self {
        Self {
            set_name: set_name.into(),
        }
    }

    fn run(program: &str, args: &[&str]) -> Result<Output, AppError> {
        Command::new(program)
            .args(args)
            .output()
            .map_err(AppError::from)
    }
}

impl FilterClient for IpsetClient {
    fn ensure_available(&self) -> Result<(), AppError> {
        info!("checking that iptables is installed...");
        let output = Self::run("iptables", &["--version"])?;
        if !output.status.success() {
            return Err(AppError::StartupError(format!(
                "iptables is not usable: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("checking that ipset is installed...");
        let output = Self::run("ipset", &["--version"])?;
        if !output.status.success() {
            return Err(AppError::StartupError(format!(
                "ipset is not usable: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    fn ensure_set(&self) -> Result<(), AppError> {
        info!("creating ipset {} ...", self.set_name);
        let output = Self::run("ipset", &["create", &self.set_name, "iphash"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("already exists") {
                return Err(AppError::StartupError(format!(
                    "failed to create ipset {}: {}",
                    self.set_name,
                    stderr.trim()
                )));
            }
        }
        Ok(())
    }

    fn ensure_rule(&self) -> Result<(), AppError> {
        info!("installing iptables drop rule for set {} ...", self.set_name);
        let output = Self::run(
            "iptables",
            &[
                "-t",
                "raw",
                "-I",
                "PREROUTING",
                "-m",
                "set",
                "--match-set",
                &self.set_name,
                "src",
                "-j",
                "DROP",
            ],
        )?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("already exists") {
                return Err(AppError::StartupError(format!(
                    "failed to install drop rule for set {}: {}",
                    self.set_name,
                    stderr.trim()
                )));
            }
        }
        Ok(())
    }

    fn block_ip(&mut self, addr: IpAddr) -> Result<BlockOutcome, AppError> {
        let addr = addr.to_string();
        let output = Self::run("ipset", &["add", &self.set_name, &addr])?;
        if output.status.success() {
            return Ok(BlockOutcome::Added);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("already added") {
            return Ok(BlockOutcome::AlreadyPresent);
        }

        Err(AppError::BlockActionError(format!(
            "failed to add {} to ipset {}: {}",
            addr,
            self.set_name,
            stderr.trim()
        )))
    }
}
