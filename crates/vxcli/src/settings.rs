//! Effective run settings: loaded config with command line overrides on top.

use anyhow::{Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::info;
use voxconf::VoxConfig;
use voxgrid::{CheckParams, GridStep, SegmentBounds, VoiceTable};

/// Flags that override config values for a single run.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Grid step in seconds
    #[arg(long, global = true)]
    pub step: Option<f64>,

    /// Number of voices per frame
    #[arg(long, global = true)]
    pub voices: Option<usize>,

    /// Voice recognition threshold (0..=1)
    #[arg(long, global = true)]
    pub threshold: Option<f64>,

    /// Minimum excerpt length in seconds
    #[arg(long, global = true)]
    pub min_len: Option<f64>,

    /// Maximum excerpt length in seconds
    #[arg(long, global = true)]
    pub max_len: Option<f64>,

    /// Preferred number of excerpts per piece
    #[arg(long, global = true)]
    pub part_count: Option<usize>,

    /// Shuffle seed for the train/test/valid split
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

impl Overrides {
    /// Copy every flag that was given into `config`.
    pub fn apply(&self, config: &mut VoxConfig) {
        if let Some(v) = self.step {
            config.grid.step = v;
        }
        if let Some(v) = self.voices {
            config.grid.voices = v;
        }
        if let Some(v) = self.threshold {
            config.classify.threshold = v;
        }
        if let Some(v) = self.min_len {
            config.segment.min_len = v;
        }
        if let Some(v) = self.max_len {
            config.segment.max_len = v;
        }
        if let Some(v) = self.part_count {
            config.segment.part_count = v;
        }
        if let Some(v) = self.seed {
            config.dataset.seed = Some(v);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub step: GridStep,
    pub voices: usize,
    pub check: CheckParams,
    pub bounds: SegmentBounds,
    pub seed: Option<u64>,
    pub no_color: bool,
}

impl Settings {
    pub fn resolve(config: &VoxConfig, no_color: bool) -> Result<Self> {
        config.validate().context("Invalid settings")?;
        let step = GridStep::new(config.grid.step)?;
        let voices = config.grid.voices;
        let bounds = SegmentBounds {
            min_len: config.segment.min_len,
            max_len: config.segment.max_len,
            part_count: config.segment.part_count,
        };
        bounds.validate()?;

        Ok(Self {
            step,
            voices,
            check: CheckParams {
                step,
                voices,
                threshold: config.classify.threshold,
                table: VoiceTable::satb(),
            },
            bounds,
            seed: config.dataset.seed,
            no_color,
        })
    }

    /// Seeded generator for shuffling. Without a configured seed a fresh
    /// one is drawn and logged so the run can be repeated.
    pub fn rng(&self) -> Pcg64 {
        let seed = self.seed.unwrap_or_else(rand::random);
        info!(seed, "shuffle seed");
        Pcg64::seed_from_u64(seed)
    }
}
