// SQL rendering for aggregate requests
use crate::application::query_planner::AggregateRequest;
use crate::domain::granularity::GroupKey;
use crate::domain::intensity::Expr;

const TIMESTAMP_COLUMN: &str = "\"datetime\"";

pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Column(source) => format!("\"{}\"", source.column()),
        // Debug formatting keeps a decimal point so integer columns are not divided as integers
        Expr::Constant(value) => format!("{:?}", value),
        Expr::Sum(terms) => format!(
            "({})",
            terms.iter().map(render_expr).collect::<Vec<_>>().join(" + ")
        ),
        Expr::Product(a, b) => format!("({} * {})", render_expr(a), render_expr(b)),
        Expr::Ratio(a, b) => format!("({} / {})", render_expr(a), render_expr(b)),
        Expr::ClampNonNegative(inner) => {
            let inner = render_expr(inner);
            format!("(CASE WHEN {0} > 0 THEN {0} ELSE 0 END)", inner)
        }
        Expr::NullIfZero(inner) => format!("NULLIF({}, 0)", render_expr(inner)),
    }
}

pub fn render_group_key(key: GroupKey) -> String {
    match key {
        GroupKey::Month => format!("EXTRACT(MONTH FROM {})", TIMESTAMP_COLUMN),
        // DOW counts from 0 = Sunday
        GroupKey::DayOfWeek => format!("(EXTRACT(DOW FROM {}) + 1)", TIMESTAMP_COLUMN),
        GroupKey::Hour => format!("EXTRACT(HOUR FROM {})", TIMESTAMP_COLUMN),
    }
}

/// `SELECT <keys>, AVG(<intensity>) ... GROUP BY <keys> ORDER BY <keys> ASC`
pub fn render_aggregate(request: &AggregateRequest, table: &str) -> String {
    let selected: Vec<String> = request
        .group_by
        .iter()
        .map(|key| format!("{} AS {}", render_group_key(*key), key.column_name()))
        .collect();
    let grouped: Vec<String> = request.group_by.iter().map(|key| render_group_key(*key)).collect();
    let ordered: Vec<String> = request
        .order_by
        .iter()
        .map(|key| format!("{} ASC", key.column_name()))
        .collect();

    format!(
        "SELECT {}, AVG({}) AS carbon_intensity FROM \"{}\" GROUP BY {} ORDER BY {}",
        selected.join(", "),
        render_expr(&request.intensity.to_expr()),
        table,
        grouped.join(", "),
        ordered.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::query_planner::QueryPlanner;
    use crate::domain::emissions::FactorRegistry;
    use crate::domain::generation::GenerationSource;
    use crate::domain::granularity::Granularity;
    use crate::domain::utility::Utility;
    use std::sync::Arc;

    #[test]
    fn test_render_clamp_and_constants() {
        let expr = Expr::Product(
            Box::new(Expr::ClampNonNegative(Box::new(Expr::Column(
                GenerationSource::PumpedStorage,
            )))),
            Box::new(Expr::Constant(19.75)),
        );

        assert_eq!(
            render_expr(&expr),
            "((CASE WHEN \"MWh_pumped_storage\" > 0 THEN \"MWh_pumped_storage\" ELSE 0 END) * 19.75)"
        );
        assert_eq!(render_expr(&Expr::Constant(19.0)), "19.0");
    }

    #[test]
    fn test_render_null_if_zero() {
        let expr = Expr::NullIfZero(Box::new(Expr::Sum(vec![
            Expr::Column(GenerationSource::Nuclear),
            Expr::Column(GenerationSource::Hydro),
        ])));

        assert_eq!(render_expr(&expr), "NULLIF((\"MWh_nuclear\" + \"MWh_hydro\"), 0)");
    }

    #[test]
    fn test_render_monthly_weekday_aggregate() {
        let planner = QueryPlanner::new(Arc::new(FactorRegistry::resolve_all().unwrap()));
        let request = planner
            .plan(Utility::Kepco, Granularity::MonthlyWeekdayHourly)
            .unwrap();

        let sql = render_aggregate(&request, "kepco_historical_data_by_generation_type");

        assert!(sql.starts_with(
            "SELECT EXTRACT(MONTH FROM \"datetime\") AS month, (EXTRACT(DOW FROM \"datetime\") + 1) AS dayofweek, EXTRACT(HOUR FROM \"datetime\") AS hour, AVG(("
        ));
        assert!(sql.contains("FROM \"kepco_historical_data_by_generation_type\""));
        assert!(sql.contains("/ NULLIF("));
        assert!(sql.ends_with("ORDER BY month ASC, dayofweek ASC, hour ASC"));
    }

    #[test]
    fn test_render_hourly_groups_by_expression() {
        let planner = QueryPlanner::new(Arc::new(FactorRegistry::resolve_all().unwrap()));
        let request = planner.plan(Utility::Tepco, Granularity::Hourly).unwrap();

        let sql = render_aggregate(&request, "tepco_data");

        assert!(sql.contains("GROUP BY EXTRACT(HOUR FROM \"datetime\") ORDER BY hour ASC"));
        assert!(!sql.contains("month"));
    }
}
