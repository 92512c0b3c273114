//! Renders a [`ResultObject`](crate::ResultObject) as the set of CSV
//! rollup tables §6 describes as the alternative to the JSON document:
//! one table each for task criticality, sensitivity, and categories.

use std::io::Write;

use thiserror::Error;

use crate::ResultObject;

#[derive(Debug, Error)]
pub enum CsvRenderError {
    #[error("failed writing CSV table: {0}")]
    Csv(#[from] csv::Error),
}

pub fn write_task_criticality<W: Write>(writer: W, result: &ResultObject) -> Result<(), CsvRenderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["id", "name", "category", "criticality_pct", "priority_level", "resource_allocation_hint"])?;
    for t in &result.task_criticality {
        wtr.write_record(&[
            t.id.clone(),
            t.name.clone(),
            t.category.clone(),
            t.criticality_pct.to_string(),
            t.priority_level.to_string(),
            t.resource_allocation_hint.to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| CsvRenderError::Csv(e.into()))?;
    Ok(())
}

pub fn write_sensitivity<W: Write>(writer: W, result: &ResultObject) -> Result<(), CsvRenderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["id", "name", "category", "impact_score", "correlation", "variance", "risk_level"])?;
    for s in &result.sensitivity {
        wtr.write_record(&[
            s.id.clone(),
            s.name.clone(),
            s.category.clone(),
            s.impact_score.to_string(),
            s.correlation.to_string(),
            s.variance.to_string(),
            s.risk_level.to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| CsvRenderError::Csv(e.into()))?;
    Ok(())
}

pub fn write_categories<W: Write>(writer: W, result: &ResultObject) -> Result<(), CsvRenderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["name", "task_count", "mean_duration", "std_duration", "risk_contribution", "avg_criticality_pct"])?;
    for c in &result.categories {
        wtr.write_record(&[
            c.name.clone(),
            c.task_count.to_string(),
            c.mean_duration.to_string(),
            c.std_duration.to_string(),
            c.risk_contribution.to_string(),
            c.avg_criticality_pct.to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| CsvRenderError::Csv(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferEntry, CategoryEntry, DurationBlock, Meta, ResultObject, ScenarioEntry, SensitivityEntry, TaskCriticalityEntry};

    fn sample_result() -> ResultObject {
        ResultObject {
            duration: DurationBlock { mean: 10.0, std_dev: 1.0, min: 8.0, max: 14.0, n: 100 },
            percentiles: vec![(50, 10.0), (90, 12.0)],
            buffers: vec![BufferEntry { percentile: 90, days: 12.0, buffer_days: 2.0, buffer_pct: 20.0, use_case_label: "External commitments" }],
            task_criticality: vec![TaskCriticalityEntry {
                id: "a".to_string(),
                name: "Design".to_string(),
                category: "planning".to_string(),
                criticality_pct: 87.5,
                priority_level: "Critical",
                resource_allocation_hint: "Best resources",
            }],
            sensitivity: vec![SensitivityEntry {
                id: "a".to_string(),
                name: "Design".to_string(),
                category: "planning".to_string(),
                impact_score: 1.2,
                correlation: 0.9,
                variance: 0.5,
                risk_level: "High",
            }],
            categories: vec![CategoryEntry {
                name: "planning".to_string(),
                task_count: 1,
                mean_duration: 2.0,
                std_duration: 0.3,
                risk_contribution: 1.2,
                avg_criticality_pct: 87.5,
            }],
            scenarios: vec![ScenarioEntry { name: "Aggressive", target: 10.0, success_probability: 0.5, buffer: 0.0, recommended_for: "x" }],
            duration_distribution: vec![8.0, 9.0, 10.0, 11.0, 14.0],
            meta: Meta { n_trials_completed: 100, seed_used: 1, partial: false },
        }
    }

    #[test]
    fn task_criticality_table_has_header_and_one_row_per_task() {
        let result = sample_result();
        let mut buf = Vec::new();
        write_task_criticality(&mut buf, &result).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,name,category"));
        assert!(lines[1].contains("Critical"));
    }

    #[test]
    fn categories_table_renders_expected_columns() {
        let result = sample_result();
        let mut buf = Vec::new();
        write_categories(&mut buf, &result).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("planning"));
        assert!(text.contains("risk_contribution"));
    }
}
