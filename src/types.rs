//! Shared types and enums used across GEOTHERM.
//! Includes `Reducer`, `ResampleMethod`, `AnomalyTier` and `OutputLayer`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Named regional reducers, mirroring the reductions the pipeline synchronizes on.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Reducer {
    Mean,
    StdDev,
    MinMax,
    Median,
    LinearFit,
}

impl std::fmt::Display for Reducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Reducer::Mean => "mean",
            Reducer::StdDev => "stdDev",
            Reducer::MinMax => "minMax",
            Reducer::Median => "median",
            Reducer::LinearFit => "linearFit",
        };
        write!(f, "{}", s)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum ResampleMethod {
    Nearest,
    Bilinear,
}

impl std::fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleMethod::Nearest => write!(f, "Nearest"),
            ResampleMethod::Bilinear => write!(f, "Bilinear"),
        }
    }
}

/// Anomaly tiers in increasing order of strength.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum AnomalyTier {
    Main,
    Weak,
    Medium,
    Strong,
}

impl AnomalyTier {
    pub const ALL: [AnomalyTier; 4] = [
        AnomalyTier::Main,
        AnomalyTier::Weak,
        AnomalyTier::Medium,
        AnomalyTier::Strong,
    ];

    /// Value written to the tier class raster (0 is reserved for "no anomaly").
    pub fn class_code(self) -> u8 {
        match self {
            AnomalyTier::Main => 1,
            AnomalyTier::Weak => 2,
            AnomalyTier::Medium => 3,
            AnomalyTier::Strong => 4,
        }
    }
}

impl std::fmt::Display for AnomalyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyTier::Main => write!(f, "Main"),
            AnomalyTier::Weak => write!(f, "Weak"),
            AnomalyTier::Medium => write!(f, "Medium"),
            AnomalyTier::Strong => write!(f, "Strong"),
        }
    }
}

/// Raster products that can be written to disk.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum OutputLayer {
    MeanLst,
    MainAnomaly,
    WeakAnomaly,
    MediumAnomaly,
    StrongAnomaly,
    TierClass,
    NearFault,
    Score1,
    Score2,
    Annual,
}

impl OutputLayer {
    pub const ALL: [OutputLayer; 10] = [
        OutputLayer::MeanLst,
        OutputLayer::MainAnomaly,
        OutputLayer::WeakAnomaly,
        OutputLayer::MediumAnomaly,
        OutputLayer::StrongAnomaly,
        OutputLayer::TierClass,
        OutputLayer::NearFault,
        OutputLayer::Score1,
        OutputLayer::Score2,
        OutputLayer::Annual,
    ];

    /// File stem used for the layer's GeoTIFF.
    pub fn file_stem(self) -> &'static str {
        match self {
            OutputLayer::MeanLst => "mean_lst",
            OutputLayer::MainAnomaly => "anomaly_main",
            OutputLayer::WeakAnomaly => "anomaly_weak",
            OutputLayer::MediumAnomaly => "anomaly_medium",
            OutputLayer::StrongAnomaly => "anomaly_strong",
            OutputLayer::TierClass => "anomaly_tier_class",
            OutputLayer::NearFault => "near_fault",
            OutputLayer::Score1 => "score1_hotspot",
            OutputLayer::Score2 => "score2_hotspot_fault",
            OutputLayer::Annual => "annual_lst",
        }
    }
}

impl std::fmt::Display for OutputLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}
