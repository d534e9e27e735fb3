//! Patch extraction — `jules extract <ID>...`.

use anyhow::{Result, bail};
use console::style;

use jules_tools::config::JulesConfig;
use jules_tools::extract::PatchExtractor;

pub async fn cmd_extract(config: &JulesConfig, session_ids: &[String]) -> Result<()> {
    let extractor = PatchExtractor::from_config(config);
    let report = extractor.extract_all(session_ids).await;

    println!();
    println!(
        "Extracted {} of {} session(s) into {}",
        style(report.extracted()).bold(),
        report.total(),
        extractor.output_dir().display()
    );

    if report.all_failed() {
        bail!("No patches extracted");
    }
    Ok(())
}
