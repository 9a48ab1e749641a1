//! ---
//! rra_section: "05-networking-external-interfaces"
//! rra_subsection: "binary"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Control CLI for driving the editor bridge offline."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use anyhow::{bail, Context, Result};
use clap::Args;
use rra_common::config::AppConfig;
use rra_common::geo::{bounds_to_map_location, editor_url, Bbox};

#[derive(Debug, Args)]
pub struct UrlCommand {
    /// Project extent as west,south,east,north in degrees.
    #[arg(long, value_name = "W,S,E,N", allow_hyphen_values = true)]
    bbox: String,

    /// Editor map width in pixels.
    #[arg(long, default_value_t = 0)]
    width: u32,

    /// Editor map height in pixels.
    #[arg(long, default_value_t = 0)]
    height: u32,
}

impl UrlCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let bbox = parse_bbox(&self.bbox)?;
        let location = bounds_to_map_location(&bbox, self.width, self.height);
        println!("{}", editor_url(&config.editor.url, &location));
        Ok(())
    }
}

fn parse_bbox(raw: &str) -> Result<Bbox> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid bbox coordinate '{}'", part.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    let bbox: Bbox = match values.as_slice() {
        [west, south, east, north] => [*west, *south, *east, *north],
        other => bail!("expected 4 bbox values, got {}", other.len()),
    };
    if bbox[0] > bbox[2] || bbox[1] > bbox[3] {
        bail!("bbox must be ordered west,south,east,north");
    }
    Ok(bbox)
}
