//! Output formatting utilities

use anyhow::Result;
use serde::Serialize;

/// Print `data` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}
