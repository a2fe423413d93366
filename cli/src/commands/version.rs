//! `agora version` — version information.

use anyhow::Result;

pub fn run(json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::json!({"version": env!("CARGO_PKG_VERSION")}));
    } else {
        println!("agora {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}
