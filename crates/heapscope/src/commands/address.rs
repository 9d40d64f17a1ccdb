use anyhow::{Context, Result};
use heap_dump::address;

pub fn run(address: &str) -> Result<()> {
    let value = address::parse(address)
        .with_context(|| format!("Failed to parse address: {address}"))?;
    println!("{value}");
    Ok(())
}
