// Carbon intensity expression tree
use super::emissions::EmissionsFactorTable;
use super::error::IntensityError;
use super::generation::{clamp_nonnegative, GenerationMixRow, GenerationSource};

/// Arithmetic over the generation columns of one row.
///
/// Rendered to SQL for the datastore, or evaluated in-process for local datasets.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(GenerationSource),
    Constant(f64),
    Sum(Vec<Expr>),
    Product(Box<Expr>, Box<Expr>),
    Ratio(Box<Expr>, Box<Expr>),
    ClampNonNegative(Box<Expr>),
    /// Evaluates to null when the inner value is zero
    NullIfZero(Box<Expr>),
}

impl Expr {
    /// `None` is a null value; nulls propagate through arithmetic.
    pub fn evaluate(&self, row: &GenerationMixRow) -> Option<f64> {
        match self {
            Expr::Column(source) => Some(row.get(*source)),
            Expr::Constant(value) => Some(*value),
            Expr::Sum(terms) => terms.iter().map(|t| t.evaluate(row)).sum(),
            Expr::Product(a, b) => Some(a.evaluate(row)? * b.evaluate(row)?),
            Expr::Ratio(a, b) => Some(a.evaluate(row)? / b.evaluate(row)?),
            Expr::ClampNonNegative(inner) => inner.evaluate(row).map(clamp_nonnegative),
            Expr::NullIfZero(inner) => inner.evaluate(row).filter(|v| *v != 0.0),
        }
    }

    /// Constants must be finite and sums non-empty before the tree is rendered.
    pub fn validate(&self) -> Result<(), IntensityError> {
        match self {
            Expr::Column(_) => Ok(()),
            Expr::Constant(value) if value.is_finite() => Ok(()),
            Expr::Constant(value) => Err(IntensityError::Configuration(format!(
                "non-finite constant {} in intensity expression",
                value
            ))),
            Expr::Sum(terms) if terms.is_empty() => Err(IntensityError::Configuration(
                "empty sum in intensity expression".to_string(),
            )),
            Expr::Sum(terms) => terms.iter().try_for_each(Expr::validate),
            Expr::Product(a, b) | Expr::Ratio(a, b) => {
                a.validate()?;
                b.validate()
            }
            Expr::ClampNonNegative(inner) | Expr::NullIfZero(inner) => inner.validate(),
        }
    }
}

/// Weighted-sum-over-total-generation for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityExpression {
    pub numerator: Expr,
    pub total_generation: Expr,
}

impl IntensityExpression {
    /// `numerator / NULLIF(total_generation, 0)`
    pub fn to_expr(&self) -> Expr {
        Expr::Ratio(
            Box::new(self.numerator.clone()),
            Box::new(Expr::NullIfZero(Box::new(self.total_generation.clone()))),
        )
    }

    pub fn validate(&self) -> Result<(), IntensityError> {
        self.numerator.validate()?;
        self.total_generation.validate()
    }

    /// Intensity of a single row in gCO2e/kWh.
    pub fn evaluate(&self, row: &GenerationMixRow) -> Result<f64, IntensityError> {
        match self.to_expr().evaluate(row) {
            Some(value) => Ok(value),
            None => Err(IntensityError::DivisionEdgeCase(format!(
                "row at {} has zero total generation",
                row.datetime
            ))),
        }
    }
}

fn contribution(source: GenerationSource) -> Expr {
    let column = Expr::Column(source);
    if source.is_bidirectional() {
        Expr::ClampNonNegative(Box::new(column))
    } else {
        column
    }
}

pub fn build_intensity_expression(factors: &EmissionsFactorTable) -> IntensityExpression {
    let numerator = GenerationSource::ALL
        .into_iter()
        .map(|s| {
            Expr::Product(
                Box::new(contribution(s)),
                Box::new(Expr::Constant(factors.get(s))),
            )
        })
        .collect();
    let total_generation = GenerationSource::ALL.into_iter().map(contribution).collect();

    IntensityExpression {
        numerator: Expr::Sum(numerator),
        total_generation: Expr::Sum(total_generation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::utility::Utility;
    use chrono::NaiveDate;

    fn row() -> GenerationMixRow {
        GenerationMixRow::new(
            NaiveDate::from_ymd_opt(2020, 4, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    fn simple_factors() -> EmissionsFactorTable {
        EmissionsFactorTable::from_entries(
            Utility::Tepco,
            [
                (GenerationSource::Nuclear, 19.0),
                (GenerationSource::Fossil, 600.0),
                (GenerationSource::Hydro, 11.0),
            ],
        )
    }

    #[test]
    fn test_weighted_intensity() {
        let expression = build_intensity_expression(&simple_factors());
        let row = row()
            .with(GenerationSource::Nuclear, 10.0)
            .with(GenerationSource::Fossil, 5.0)
            .with(GenerationSource::Hydro, 0.0);

        assert_eq!(expression.total_generation.evaluate(&row), Some(15.0));
        let intensity = expression.evaluate(&row).unwrap();
        assert!((intensity - 3190.0 / 15.0).abs() < 1e-9, "got {}", intensity);
    }

    #[test]
    fn test_negative_pumped_storage_contributes_nothing() {
        let factors = EmissionsFactorTable::from_entries(
            Utility::Tepco,
            [
                (GenerationSource::Fossil, 600.0),
                (GenerationSource::PumpedStorage, 19.75),
            ],
        );
        let expression = build_intensity_expression(&factors);
        let row = row()
            .with(GenerationSource::PumpedStorage, -3.0)
            .with(GenerationSource::Fossil, 5.0);

        assert_eq!(expression.total_generation.evaluate(&row), Some(5.0));
        assert_eq!(expression.numerator.evaluate(&row), Some(3000.0));
        assert_eq!(expression.evaluate(&row).unwrap(), 600.0);
    }

    #[test]
    fn test_zero_total_generation_is_division_edge_case() {
        let expression = build_intensity_expression(&simple_factors());
        let row = row().with(GenerationSource::Interconnectors, -20.0);

        let err = expression.evaluate(&row).unwrap_err();
        assert!(matches!(err, IntensityError::DivisionEdgeCase(_)));
    }

    #[test]
    fn test_structure_is_independent_of_factors() {
        let a = build_intensity_expression(&simple_factors());
        let b = build_intensity_expression(
            &EmissionsFactorTable::resolve(Utility::Cepco.profile()).unwrap(),
        );

        assert_eq!(a.total_generation, b.total_generation);
        assert_ne!(a.numerator, b.numerator);
        match (&a.numerator, &b.numerator) {
            (Expr::Sum(x), Expr::Sum(y)) => assert_eq!(x.len(), y.len()),
            _ => panic!("numerator should be a sum"),
        }
    }

    #[test]
    fn test_validate_rejects_non_finite_constants() {
        let expression = build_intensity_expression(&EmissionsFactorTable::from_entries(
            Utility::Kepco,
            [(GenerationSource::Fossil, f64::NAN)],
        ));

        assert!(matches!(
            expression.validate(),
            Err(IntensityError::Configuration(_))
        ));
        assert!(build_intensity_expression(&simple_factors()).validate().is_ok());
    }
}
