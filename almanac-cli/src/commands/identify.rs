//! Identify command: show how file names map onto diary dates.

use almanac_core::parse_identifier;
use anyhow::Result;

pub fn identify(ids: &[String], json: bool) -> Result<()> {
    let metas: Vec<_> = ids.iter().map(|id| parse_identifier(id)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&metas)?);
        return Ok(());
    }

    for meta in &metas {
        let span = if meta.is_range {
            format!("{} .. {}", meta.start_date, meta.end_date)
        } else {
            meta.start_date.clone()
        };
        println!("{}\t{}\t{}", meta.raw_id, span, meta.quarter_key);
    }
    Ok(())
}
