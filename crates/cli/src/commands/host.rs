use anyhow::{Context, Result};
use thinner_core::config::ThinConfig;
use tracing::debug;

/// Print the architecture binaries will be thinned to.
pub fn host_command(arch: Option<&str>) -> Result<()> {
    let config = ThinConfig { arch: arch.map(str::to_string), ..ThinConfig::default() };
    let host = config.host_arch().context("Failed to resolve host architecture")?;
    debug!(host = %host, "resolved host architecture");
    println!("Host architecture: {} (cpu type {:#x})", host, host.cpu_type.0);
    Ok(())
}
