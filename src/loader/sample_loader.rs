use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::audio::SampleBuffer;
use crate::shared::TrackId;

/// Decoded samples of one kit folder, ready to hand to the sound device.
#[derive(Clone, Debug, Default)]
pub struct Kit {
    pub name: String,
    pub samples: Vec<(TrackId, SampleBuffer)>,
}

/// Load `<dir>/<stem>.wav` for every track. Missing files leave that track
/// silent; a file that exists but fails to decode is an error.
pub fn load_kit(dir: &Path, target_rate: u32) -> anyhow::Result<Kit> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut samples = Vec::new();
    for track in TrackId::ALL {
        let Some(stem) = track.sample_stem() else {
            continue;
        };
        let path = dir.join(format!("{stem}.wav"));
        if !path.is_file() {
            log::debug!(target: "loader", "kit {name}: no sample for {track}");
            continue;
        }
        let buffer = SampleBuffer::load_wav(&path, target_rate)
            .with_context(|| format!("loading {track} sample for kit {name}"))?;
        samples.push((track, buffer));
    }
    log::info!(target: "loader", "kit {name}: {} samples", samples.len());
    Ok(Kit { name, samples })
}

/// Kit folders directly under `root`, sorted by name.
pub fn list_kits(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut kits: Vec<PathBuf> = std::fs::read_dir(root)
        .with_context(|| format!("reading kit folder {}", root.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    kits.sort();
    Ok(kits)
}
