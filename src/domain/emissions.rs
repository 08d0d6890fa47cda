// Emissions factor tables per utility
use super::error::IntensityError;
use super::generation::GenerationSource;
use super::utility::Utility;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Thermal technologies metered together under the single fossil meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FossilFuel {
    Lng,
    Oil,
    Coal,
}

impl FossilFuel {
    pub const ALL: [FossilFuel; 3] = [FossilFuel::Lng, FossilFuel::Oil, FossilFuel::Coal];

    /// Name of the matching row in the published lifecycle factor table
    fn published_name(&self) -> &'static str {
        match self {
            FossilFuel::Lng => "Gas (Open Cycle)",
            FossilFuel::Oil => "Oil",
            FossilFuel::Coal => "Coal",
        }
    }
}

/// Published constants a factor table is resolved from.
#[derive(Debug)]
pub struct UtilityProfile {
    pub utility: Utility,
    /// Lifecycle factors in gCO2e/kWh, keyed by the published row name
    pub published: &'static [(&'static str, f64)],
    /// Relative thermal fleet proportions; need not sum to 1
    pub fossil_shares: &'static [(FossilFuel, f64)],
    /// Approximation: storage is mostly charged from low-carbon surplus
    pub pumped_storage_estimate: f64,
    /// Approximation: stands in for the intensity of neighbouring areas
    pub interconnector_estimate: f64,
}

// Lifecycle factors "for Japan" from CEPCO's environmental report; biomass from UK figures.
const JAPAN_LIFECYCLE_FACTORS: &[(&str, f64)] = &[
    ("Nuclear", 19.0),
    ("Hydro", 11.0),
    ("Wind", 26.0),
    ("Solar", 38.0),
    ("Gas (Open Cycle)", 599.0),
    ("Gas (Combined Cycle)", 474.0),
    ("Oil", 738.0),
    ("Coal", 943.0),
    ("Geothermal", 13.0),
    ("Biomass", 120.0),
];

const PUMPED_STORAGE_ESTIMATE: f64 = 19.75;
const INTERCONNECTOR_ESTIMATE: f64 = 500.0;

static TEPCO_PROFILE: UtilityProfile = UtilityProfile {
    utility: Utility::Tepco,
    published: JAPAN_LIFECYCLE_FACTORS,
    fossil_shares: &[
        (FossilFuel::Lng, 0.72),
        (FossilFuel::Oil, 0.04),
        (FossilFuel::Coal, 0.24),
    ],
    pumped_storage_estimate: PUMPED_STORAGE_ESTIMATE,
    interconnector_estimate: INTERCONNECTOR_ESTIMATE,
};

static KEPCO_PROFILE: UtilityProfile = UtilityProfile {
    utility: Utility::Kepco,
    published: JAPAN_LIFECYCLE_FACTORS,
    fossil_shares: &[
        (FossilFuel::Lng, 0.60),
        (FossilFuel::Oil, 0.12),
        (FossilFuel::Coal, 0.28),
    ],
    pumped_storage_estimate: PUMPED_STORAGE_ESTIMATE,
    interconnector_estimate: INTERCONNECTOR_ESTIMATE,
};

// Station proportions from the 2019 CSR report
static CEPCO_PROFILE: UtilityProfile = UtilityProfile {
    utility: Utility::Cepco,
    published: JAPAN_LIFECYCLE_FACTORS,
    fossil_shares: &[
        (FossilFuel::Lng, 0.285 + 1.4),
        (FossilFuel::Oil, 0.35 + 0.35 + 0.50 + 0.35 + 0.5 + 0.7 + 0.4),
        (FossilFuel::Coal, 1.0 + 0.156 + 0.259 + 0.5 + 0.5 + 0.175),
    ],
    pumped_storage_estimate: PUMPED_STORAGE_ESTIMATE,
    interconnector_estimate: INTERCONNECTOR_ESTIMATE,
};

impl Utility {
    pub fn profile(&self) -> &'static UtilityProfile {
        match self {
            Utility::Tepco => &TEPCO_PROFILE,
            Utility::Kepco => &KEPCO_PROFILE,
            Utility::Cepco => &CEPCO_PROFILE,
        }
    }
}

impl UtilityProfile {
    fn published_factor(&self, name: &str) -> Result<f64, IntensityError> {
        self.published
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| {
                IntensityError::Configuration(format!(
                    "{}: missing published factor `{}`",
                    self.utility, name
                ))
            })
    }

    fn fossil_share(&self, fuel: FossilFuel) -> Result<f64, IntensityError> {
        self.fossil_shares
            .iter()
            .find(|(f, _)| *f == fuel)
            .map(|(_, share)| *share)
            .ok_or_else(|| {
                IntensityError::Configuration(format!(
                    "{}: missing fossil share for {:?}",
                    self.utility, fuel
                ))
            })
    }

    /// Share-weighted mean of the LNG, oil and coal factors.
    pub fn fossil_factor(&self) -> Result<f64, IntensityError> {
        let mut weighted = 0.0;
        let mut total_share = 0.0;
        for fuel in FossilFuel::ALL {
            let share = self.fossil_share(fuel)?;
            weighted += self.published_factor(fuel.published_name())? * share;
            total_share += share;
        }

        if total_share <= 0.0 {
            return Err(IntensityError::Configuration(format!(
                "{}: fossil shares sum to {}",
                self.utility, total_share
            )));
        }

        Ok(weighted / total_share)
    }
}

/// Carbon intensity coefficient (gCO2e/kWh) per generation source for one utility.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsFactorTable {
    utility: Utility,
    factors: [f64; 9],
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorEntry {
    pub g_co2e_per_kwh: f64,
    pub approximation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorSummary {
    pub utility: Utility,
    pub factors: IndexMap<&'static str, FactorEntry>,
}

impl EmissionsFactorTable {
    /// Sources missing from `entries` get a zero coefficient.
    pub fn from_entries(
        utility: Utility,
        entries: impl IntoIterator<Item = (GenerationSource, f64)>,
    ) -> Self {
        let mut factors = [0.0; 9];
        for (source, factor) in entries {
            factors[source.index()] = factor;
        }
        Self { utility, factors }
    }

    pub fn resolve(profile: &UtilityProfile) -> Result<Self, IntensityError> {
        tracing::info!("Resolving carbon intensity factors for {}", profile.utility);

        let table = Self::from_entries(
            profile.utility,
            [
                (GenerationSource::Nuclear, profile.published_factor("Nuclear")?),
                (GenerationSource::Fossil, profile.fossil_factor()?),
                (GenerationSource::Hydro, profile.published_factor("Hydro")?),
                (GenerationSource::Geothermal, profile.published_factor("Geothermal")?),
                (GenerationSource::Biomass, profile.published_factor("Biomass")?),
                (GenerationSource::SolarOutput, profile.published_factor("Solar")?),
                (GenerationSource::WindOutput, profile.published_factor("Wind")?),
                (GenerationSource::PumpedStorage, profile.pumped_storage_estimate),
                (GenerationSource::Interconnectors, profile.interconnector_estimate),
            ],
        );

        if let Some(source) = GenerationSource::ALL
            .into_iter()
            .find(|s| !table.get(*s).is_finite() || table.get(*s) < 0.0)
        {
            return Err(IntensityError::Configuration(format!(
                "{}: factor for {} is {}",
                profile.utility,
                source.key(),
                table.get(source)
            )));
        }

        Ok(table)
    }

    pub fn utility(&self) -> Utility {
        self.utility
    }

    pub fn get(&self, source: GenerationSource) -> f64 {
        self.factors[source.index()]
    }

    /// Pumped storage and interconnector factors are estimates, not derived values.
    pub fn is_approximation(source: GenerationSource) -> bool {
        source.is_bidirectional()
    }

    pub fn summary(&self) -> FactorSummary {
        let factors = GenerationSource::ALL
            .into_iter()
            .map(|s| {
                (
                    s.key(),
                    FactorEntry {
                        g_co2e_per_kwh: self.get(s),
                        approximation: Self::is_approximation(s),
                    },
                )
            })
            .collect();

        FactorSummary {
            utility: self.utility,
            factors,
        }
    }
}

/// Factor tables for every utility, resolved once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct FactorRegistry {
    tables: HashMap<Utility, EmissionsFactorTable>,
}

impl FactorRegistry {
    pub fn resolve_all() -> Result<Self, IntensityError> {
        Self::from_profiles(Utility::ALL.iter().map(|u| u.profile()))
    }

    pub fn from_profiles<'a>(
        profiles: impl IntoIterator<Item = &'a UtilityProfile>,
    ) -> Result<Self, IntensityError> {
        let mut tables = HashMap::new();
        for profile in profiles {
            tables.insert(profile.utility, EmissionsFactorTable::resolve(profile)?);
        }
        Ok(Self { tables })
    }

    pub fn get(&self, utility: Utility) -> Result<&EmissionsFactorTable, IntensityError> {
        self.tables.get(&utility).ok_or_else(|| {
            IntensityError::Configuration(format!("no emissions factors resolved for {}", utility))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fossil_factor_is_bounded_weighted_mean() {
        for utility in Utility::ALL {
            let profile = utility.profile();
            let share_sum: f64 = profile.fossil_shares.iter().map(|(_, s)| s).sum();
            assert!(share_sum > 0.0, "{} shares sum to {}", utility, share_sum);

            let subs: Vec<f64> = FossilFuel::ALL
                .iter()
                .map(|f| profile.published_factor(f.published_name()).unwrap())
                .collect();
            let min = subs.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = subs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            let fossil = profile.fossil_factor().unwrap();
            assert!(fossil >= min && fossil <= max, "{}: {} not in [{}, {}]", utility, fossil, min, max);
        }
    }

    #[test]
    fn test_cepco_fossil_factor() {
        let lng = 0.285 + 1.4;
        let oil = 0.35 + 0.35 + 0.50 + 0.35 + 0.5 + 0.7 + 0.4;
        let coal = 1.0 + 0.156 + 0.259 + 0.5 + 0.5 + 0.175;
        let expected = (599.0 * lng + 738.0 * oil + 943.0 * coal) / (lng + oil + coal);

        let table = EmissionsFactorTable::resolve(Utility::Cepco.profile()).unwrap();
        assert!((table.get(GenerationSource::Fossil) - expected).abs() < 1e-9);
        assert_eq!(table.get(GenerationSource::Nuclear), 19.0);
        assert_eq!(table.get(GenerationSource::SolarOutput), 38.0);
        assert_eq!(table.get(GenerationSource::WindOutput), 26.0);
        assert_eq!(table.get(GenerationSource::PumpedStorage), 19.75);
        assert_eq!(table.get(GenerationSource::Interconnectors), 500.0);
    }

    #[test]
    fn test_missing_published_factor_is_configuration_error() {
        static NO_COAL: UtilityProfile = UtilityProfile {
            utility: Utility::Kepco,
            published: &[("Nuclear", 19.0), ("Gas (Open Cycle)", 599.0), ("Oil", 738.0)],
            fossil_shares: &[
                (FossilFuel::Lng, 1.0),
                (FossilFuel::Oil, 1.0),
                (FossilFuel::Coal, 1.0),
            ],
            pumped_storage_estimate: 19.75,
            interconnector_estimate: 500.0,
        };

        let err = EmissionsFactorTable::resolve(&NO_COAL).unwrap_err();
        assert!(matches!(err, IntensityError::Configuration(ref msg) if msg.contains("Coal")));
    }

    #[test]
    fn test_missing_or_zero_shares_are_configuration_errors() {
        static NO_OIL_SHARE: UtilityProfile = UtilityProfile {
            utility: Utility::Tepco,
            published: JAPAN_LIFECYCLE_FACTORS,
            fossil_shares: &[(FossilFuel::Lng, 1.0), (FossilFuel::Coal, 1.0)],
            pumped_storage_estimate: 19.75,
            interconnector_estimate: 500.0,
        };
        static ZERO_SHARES: UtilityProfile = UtilityProfile {
            utility: Utility::Tepco,
            published: JAPAN_LIFECYCLE_FACTORS,
            fossil_shares: &[
                (FossilFuel::Lng, 0.0),
                (FossilFuel::Oil, 0.0),
                (FossilFuel::Coal, 0.0),
            ],
            pumped_storage_estimate: 19.75,
            interconnector_estimate: 500.0,
        };

        assert!(matches!(
            NO_OIL_SHARE.fossil_factor(),
            Err(IntensityError::Configuration(_))
        ));
        assert!(matches!(
            ZERO_SHARES.fossil_factor(),
            Err(IntensityError::Configuration(_))
        ));
    }

    #[test]
    fn test_registry_resolves_every_utility() {
        let registry = FactorRegistry::resolve_all().unwrap();
        for utility in Utility::ALL {
            assert_eq!(registry.get(utility).unwrap().utility(), utility);
        }
    }

    #[test]
    fn test_registry_without_utility_is_configuration_error() {
        let registry = FactorRegistry::from_profiles([Utility::Tepco.profile()]).unwrap();
        assert!(registry.get(Utility::Tepco).is_ok());
        assert!(matches!(
            registry.get(Utility::Kepco),
            Err(IntensityError::Configuration(_))
        ));
    }

    #[test]
    fn test_summary_labels_approximations() {
        let table = EmissionsFactorTable::resolve(Utility::Tepco.profile()).unwrap();
        let summary = table.summary();

        assert_eq!(summary.factors.len(), GenerationSource::ALL.len());
        assert!(summary.factors["pumped_storage"].approximation);
        assert!(summary.factors["interconnectors"].approximation);
        assert!(!summary.factors["nuclear"].approximation);
        assert_eq!(summary.factors.get_index(0).map(|(k, _)| *k), Some("nuclear"));
    }
}
