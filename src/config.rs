use crate::error::{EngineError, Result};

/// One of the five representation-test variants — a tagged variant,
/// not a trait object, mirroring `StatisticalTest` in the
/// enrichment-analysis module this crate is descended from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TestKind {
    Mannwhitneyu,
    Welch,
    Ttest,
    Ks,
    Kruskal,
}

impl Default for TestKind {
    fn default() -> Self {
        TestKind::Mannwhitneyu
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlotFormat {
    Png,
    Pdf,
    Svg,
}

impl Default for PlotFormat {
    fn default() -> Self {
        PlotFormat::Svg
    }
}

impl PlotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Pdf => "pdf",
            PlotFormat::Svg => "svg",
        }
    }
}

/// The single immutable configuration object threaded by reference
/// through every component.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub fuzzy_count: u32,
    pub fuzzy_fraction: f64,
    pub fuzzy_min: u32,
    pub fuzzy_max: u32,
    pub min_proteomes: usize,
    pub test: TestKind,
    pub repetitions: u32,
    pub seed: u64,
    pub taxranks: Vec<String>,
    pub infer_singletons: bool,
    pub plot_format: PlotFormat,
    pub threads: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            fuzzy_count: 1,
            fuzzy_fraction: 0.75,
            fuzzy_min: 0,
            fuzzy_max: 20,
            min_proteomes: 2,
            test: TestKind::Mannwhitneyu,
            repetitions: 30,
            seed: 0,
            taxranks: vec!["phylum".into(), "order".into(), "genus".into()],
            infer_singletons: true,
            plot_format: PlotFormat::Svg,
            threads: num_cpus::get(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fuzzy_min > self.fuzzy_max {
            return Err(EngineError::config(format!(
                "fuzzy_min ({}) must be <= fuzzy_max ({})",
                self.fuzzy_min, self.fuzzy_max
            )));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_fraction) {
            return Err(EngineError::config(format!(
                "fuzzy_fraction ({}) must be in [0,1]",
                self.fuzzy_fraction
            )));
        }
        if self.fuzzy_count < 1 {
            return Err(EngineError::config("fuzzy_count must be >= 1"));
        }
        if self.min_proteomes < 1 {
            return Err(EngineError::config("min_proteomes must be >= 1"));
        }
        if self.repetitions < 1 {
            return Err(EngineError::config("repetitions must be >= 1 (non-positive)"));
        }
        Ok(())
    }

    /// Is `count` within the fuzzy-exception range, excluding the
    /// "on-target" `fuzzy_count` value itself?
    pub fn in_fuzzy_range(&self, count: u32) -> bool {
        count != self.fuzzy_count && count >= self.fuzzy_min && count <= self.fuzzy_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn fuzzy_min_gt_max_rejected() {
        let mut cfg = RunConfig::default();
        cfg.fuzzy_min = 10;
        cfg.fuzzy_max = 5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_repetitions_rejected() {
        let mut cfg = RunConfig::default();
        cfg.repetitions = 0;
        assert!(cfg.validate().is_err());
    }
}
