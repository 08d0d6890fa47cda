// Generation mix domain models
use chrono::NaiveDateTime;

/// Metered generation sources in the normalized dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationSource {
    Nuclear,
    Fossil,
    Hydro,
    Geothermal,
    Biomass,
    SolarOutput,
    WindOutput,
    PumpedStorage,
    Interconnectors,
}

impl GenerationSource {
    pub const ALL: [GenerationSource; 9] = [
        GenerationSource::Nuclear,
        GenerationSource::Fossil,
        GenerationSource::Hydro,
        GenerationSource::Geothermal,
        GenerationSource::Biomass,
        GenerationSource::SolarOutput,
        GenerationSource::WindOutput,
        GenerationSource::PumpedStorage,
        GenerationSource::Interconnectors,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn key(&self) -> &'static str {
        match self {
            GenerationSource::Nuclear => "nuclear",
            GenerationSource::Fossil => "fossil",
            GenerationSource::Hydro => "hydro",
            GenerationSource::Geothermal => "geothermal",
            GenerationSource::Biomass => "biomass",
            GenerationSource::SolarOutput => "solar_output",
            GenerationSource::WindOutput => "wind_output",
            GenerationSource::PumpedStorage => "pumped_storage",
            GenerationSource::Interconnectors => "interconnectors",
        }
    }

    /// Column name in the normalized dataset
    pub fn column(&self) -> &'static str {
        match self {
            GenerationSource::Nuclear => "MWh_nuclear",
            GenerationSource::Fossil => "MWh_fossil",
            GenerationSource::Hydro => "MWh_hydro",
            GenerationSource::Geothermal => "MWh_geothermal",
            GenerationSource::Biomass => "MWh_biomass",
            GenerationSource::SolarOutput => "MWh_solar_output",
            GenerationSource::WindOutput => "MWh_wind_output",
            GenerationSource::PumpedStorage => "MWh_pumped_storage",
            GenerationSource::Interconnectors => "MWh_interconnectors",
        }
    }

    /// Net flows that go negative while pumping or exporting.
    pub fn is_bidirectional(&self) -> bool {
        matches!(self, GenerationSource::PumpedStorage | GenerationSource::Interconnectors)
    }
}

pub fn clamp_nonnegative(value: f64) -> f64 {
    if value > 0.0 { value } else { 0.0 }
}

/// One timestamped observation of a utility's generation mix, in MWh.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationMixRow {
    pub datetime: NaiveDateTime,
    quantities: [f64; 9],
}

impl GenerationMixRow {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            quantities: [0.0; 9],
        }
    }

    #[cfg(test)]
    pub fn with(mut self, source: GenerationSource, mwh: f64) -> Self {
        self.set(source, mwh);
        self
    }

    pub fn set(&mut self, source: GenerationSource, mwh: f64) {
        self.quantities[source.index()] = mwh;
    }

    /// Raw metered quantity, negative for net pumping/export
    pub fn get(&self, source: GenerationSource) -> f64 {
        self.quantities[source.index()]
    }

    /// Quantity counted towards generation: bidirectional flows are clamped at zero.
    pub fn contribution(&self, source: GenerationSource) -> f64 {
        let value = self.get(source);
        if source.is_bidirectional() {
            clamp_nonnegative(value)
        } else {
            value
        }
    }

    pub fn total_generation(&self) -> f64 {
        GenerationSource::ALL
            .iter()
            .map(|s| self.contribution(*s))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at_midnight() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_clamp_nonnegative() {
        assert_eq!(clamp_nonnegative(4.5), 4.5);
        assert_eq!(clamp_nonnegative(0.0), 0.0);
        assert_eq!(clamp_nonnegative(-3.0), 0.0);
    }

    #[test]
    fn test_negative_pumped_storage_does_not_reduce_total() {
        let row = GenerationMixRow::new(at_midnight())
            .with(GenerationSource::PumpedStorage, -3.0)
            .with(GenerationSource::Fossil, 5.0);

        assert_eq!(row.get(GenerationSource::PumpedStorage), -3.0);
        assert_eq!(row.contribution(GenerationSource::PumpedStorage), 0.0);
        assert_eq!(row.total_generation(), 5.0);
    }

    #[test]
    fn test_total_at_least_sum_of_positive_sources() {
        let row = GenerationMixRow::new(at_midnight())
            .with(GenerationSource::Nuclear, 10.0)
            .with(GenerationSource::SolarOutput, 2.5)
            .with(GenerationSource::PumpedStorage, -40.0)
            .with(GenerationSource::Interconnectors, -12.0);

        let positive: f64 = GenerationSource::ALL
            .iter()
            .map(|s| row.get(*s))
            .filter(|v| *v > 0.0)
            .sum();

        assert!(row.total_generation() >= positive);
        assert_eq!(row.total_generation(), 12.5);
    }

    #[test]
    fn test_positive_interconnector_import_counts() {
        let row = GenerationMixRow::new(at_midnight())
            .with(GenerationSource::Hydro, 1.0)
            .with(GenerationSource::Interconnectors, 4.0);

        assert_eq!(row.total_generation(), 5.0);
    }

    #[test]
    fn test_columns_are_distinct() {
        let mut columns: Vec<_> = GenerationSource::ALL.iter().map(|s| s.column()).collect();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), GenerationSource::ALL.len());
    }
}
