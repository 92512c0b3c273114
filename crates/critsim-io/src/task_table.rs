//! Task table loading: one row per task, header required. Columns, in
//! order: `Task_ID, Task_Name, Category, Predecessors, Optimistic,
//! Most_Likely, Pessimistic, Resources`.

use std::io::Read;
use std::path::Path;

use critsim_core::{Estimate, TaskRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskTableError {
    #[error("failed to read task table: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: malformed field '{field}': {reason}")]
    MalformedField {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("failed to write task table: {0}")]
    Write(#[from] csv::Error),
}

const EXPECTED_HEADER: [&str; 8] = [
    "Task_ID",
    "Task_Name",
    "Category",
    "Predecessors",
    "Optimistic",
    "Most_Likely",
    "Pessimistic",
    "Resources",
];

/// Parse a task table from a reader. `row` in any resulting error is
/// 1-based and counts the header as row 0, matching how a spreadsheet
/// user would refer to the line.
pub fn parse_task_table<R: Read>(reader: R) -> Result<Vec<TaskRecord>, TaskTableError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 2; // +1 for 1-based, +1 for the header line
        let csv_record = result.map_err(|source| TaskTableError::Row { row, source })?;
        records.push(parse_row(row, &csv_record)?);
    }
    Ok(records)
}

/// Load and parse a task table from a filesystem path.
pub fn load_task_table(path: &Path) -> Result<Vec<TaskRecord>, TaskTableError> {
    let file = std::fs::File::open(path)?;
    parse_task_table(file)
}

fn parse_row(row: usize, record: &csv::StringRecord) -> Result<TaskRecord, TaskTableError> {
    let get = |idx: usize, field: &'static str| -> Result<&str, TaskTableError> {
        record.get(idx).ok_or(TaskTableError::MalformedField {
            row,
            field,
            reason: "missing column".to_string(),
        })
    };

    let id = get(0, "Task_ID")?.trim().to_string();
    let name = get(1, "Task_Name")?.trim().to_string();
    let category = get(2, "Category")?.trim().to_string();
    let predecessors: Vec<String> = get(3, "Predecessors")?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let optimistic = parse_number(row, "Optimistic", get(4, "Optimistic")?)?;
    let most_likely = parse_number(row, "Most_Likely", get(5, "Most_Likely")?)?;
    let pessimistic = parse_number(row, "Pessimistic", get(6, "Pessimistic")?)?;

    let resources = record
        .get(7)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(TaskRecord {
        id,
        name,
        category,
        predecessors,
        estimate: Estimate::new(optimistic, most_likely, pessimistic),
        resources,
    })
}

fn parse_number(row: usize, field: &'static str, raw: &str) -> Result<f64, TaskTableError> {
    raw.trim().parse::<f64>().map_err(|e| TaskTableError::MalformedField {
        row,
        field,
        reason: e.to_string(),
    })
}

/// Serialize task records back into the task-table CSV shape, matching
/// `EXPECTED_HEADER`'s column order exactly.
pub fn write_task_table<W: std::io::Write>(
    writer: W,
    tasks: &[TaskRecord],
) -> Result<(), TaskTableError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(EXPECTED_HEADER)?;
    for task in tasks {
        wtr.write_record(&[
            task.id.as_str(),
            task.name.as_str(),
            task.category.as_str(),
            task.predecessors.join(",").as_str(),
            &task.estimate.optimistic.to_string(),
            &task.estimate.most_likely.to_string(),
            &task.estimate.pessimistic.to_string(),
            task.resources.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Task_ID,Task_Name,Category,Predecessors,Optimistic,Most_Likely,Pessimistic,Resources\n\
         a,Design,planning,,1,2,3,alice\n\
         b,Build,build,a,3,5,10,bob\n";

    #[test]
    fn parses_well_formed_table() {
        let records = parse_task_table(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[0].predecessors, Vec::<String>::new());
        assert_eq!(records[1].predecessors, vec!["a".to_string()]);
        assert_eq!(records[1].resources.as_deref(), Some("bob"));
    }

    #[test]
    fn multiple_predecessors_split_on_comma() {
        let csv = "Task_ID,Task_Name,Category,Predecessors,Optimistic,Most_Likely,Pessimistic,Resources\n\
             c,Integrate,build,\"a,b\",1,2,3,\n";
        let records = parse_task_table(csv.as_bytes()).unwrap();
        assert_eq!(records[0].predecessors, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn malformed_numeric_field_reports_row_number() {
        let csv = "Task_ID,Task_Name,Category,Predecessors,Optimistic,Most_Likely,Pessimistic,Resources\n\
             a,Design,planning,,1,2,3,\n\
             b,Build,build,a,notanumber,5,10,\n";
        let err = parse_task_table(csv.as_bytes()).unwrap_err();
        match err {
            TaskTableError::MalformedField { row, field, .. } => {
                assert_eq!(row, 3);
                assert_eq!(field, "Optimistic");
            }
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn empty_resources_field_is_none() {
        let records = parse_task_table(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records[0].resources, None);
    }

    #[test]
    fn round_trips_through_write_and_parse() {
        let records = parse_task_table(SAMPLE.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_task_table(&mut buf, &records).unwrap();
        let reparsed = parse_task_table(buf.as_slice()).unwrap();
        assert_eq!(reparsed.len(), records.len());
        for (a, b) in records.iter().zip(reparsed.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.predecessors, b.predecessors);
            assert_eq!(a.estimate, b.estimate);
        }
    }
}
