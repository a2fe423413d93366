//! `agora list` — installed packages, grouped by kind.

use anyhow::Result;
use owo_colors::OwoColorize;

use agora_common::{InstallSource, PackageKind};

use crate::application::services::install::list_installed;
use crate::infra::paths::AgoraPaths;
use crate::output::{json, OutputContext};

pub fn run(ctx: &OutputContext, json_output: bool) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    let installed = list_installed(&paths)?;

    if json_output {
        return json::render(&serde_json::json!({"installed": installed}));
    }

    if installed.is_empty() {
        ctx.line("No packages installed. Try: agora search <query>");
        return Ok(());
    }

    for kind in PackageKind::ALL {
        let of_kind: Vec<_> = installed.iter().filter(|m| m.kind == kind).collect();
        if of_kind.is_empty() {
            continue;
        }
        ctx.line(&format!("{}", kind.plural().style(ctx.styles.header)));
        for manifest in of_kind {
            let marker = if manifest.source == InstallSource::Placeholder {
                " (broken: download failed)"
            } else {
                ""
            };
            ctx.line(&format!(
                "  {} {}{}",
                manifest.name.style(ctx.styles.bold),
                manifest.version.style(ctx.styles.dim),
                marker.style(ctx.styles.warning),
            ));
        }
    }
    Ok(())
}
