use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Logs go to stderr so the PNG can be written to stdout.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .with_level(true)
        .try_init();
    Ok(())
}
