use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("diskwatch version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
