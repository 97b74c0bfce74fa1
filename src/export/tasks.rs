use chrono::{DateTime, NaiveDate, Utc};

use super::csv::{self, CsvError};
use crate::database::models::{NewTask, Task, TaskPriority, TaskStatus};

pub const EXPORT_HEADER: [&str; 8] = [
    "id",
    "title",
    "priority",
    "status",
    "assignee",
    "dueAt",
    "createdAt",
    "updatedAt",
];

pub fn tasks_to_csv(tasks: &[Task]) -> String {
    let mut out = String::new();
    csv::write_record(&mut out, &EXPORT_HEADER);
    for task in tasks {
        csv::write_record(
            &mut out,
            &[
                task.id.clone(),
                task.title.clone(),
                task.priority.to_string(),
                task.status.to_string(),
                task.assignee_id.clone().unwrap_or_default(),
                task.due_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        );
    }
    out
}

/// One data row of an import file. `row_number` counts the header as row 1.
#[derive(Debug)]
pub struct ImportRow {
    pub row_number: usize,
    pub task: Result<NewTask, String>,
}

#[derive(Debug, Default)]
struct HeaderMap {
    title: Option<usize>,
    description: Option<usize>,
    priority: Option<usize>,
    status: Option<usize>,
    assignee: Option<usize>,
    due_at: Option<usize>,
}

impl HeaderMap {
    fn from_header(header: &[String]) -> Self {
        let mut map = HeaderMap::default();
        for (index, name) in header.iter().enumerate() {
            let slot = match name.trim().to_ascii_lowercase().replace(['_', ' '], "").as_str() {
                "title" => &mut map.title,
                "description" => &mut map.description,
                "priority" => &mut map.priority,
                "status" => &mut map.status,
                "assignee" | "assigneeid" => &mut map.assignee,
                "dueat" | "duedate" => &mut map.due_at,
                _ => continue,
            };
            slot.get_or_insert(index);
        }
        map
    }
}

/// Parses an uploaded file into rows. An empty file yields no rows; a file
/// whose header lacks `title` fails every row.
pub fn parse_import(input: &str) -> Result<Vec<ImportRow>, CsvError> {
    let mut records = csv::parse(input)?.into_iter();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let columns = HeaderMap::from_header(&header);

    Ok(records
        .enumerate()
        .map(|(i, record)| ImportRow {
            row_number: i + 2,
            task: row_to_task(&columns, &record),
        })
        .collect())
}

fn row_to_task(columns: &HeaderMap, record: &[String]) -> Result<NewTask, String> {
    let cell = |index: Option<usize>| -> Option<&str> {
        index
            .and_then(|i| record.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    };

    let title = cell(columns.title).ok_or_else(|| "Title is required".to_string())?;
    if title.chars().count() > 200 {
        return Err("Title must be at most 200 characters".to_string());
    }

    let priority = match cell(columns.priority) {
        Some(raw) => Some(TaskPriority::parse(raw).ok_or_else(|| format!("Invalid priority '{}'", raw))?),
        None => None,
    };
    let status = match cell(columns.status) {
        Some(raw) => Some(TaskStatus::parse(raw).ok_or_else(|| format!("Invalid status '{}'", raw))?),
        None => None,
    };
    let due_at = match cell(columns.due_at) {
        Some(raw) => Some(parse_date(raw).ok_or_else(|| format!("Invalid due date '{}'", raw))?),
        None => None,
    };

    Ok(NewTask {
        title: title.to_string(),
        description: cell(columns.description).map(str::to_string),
        priority,
        status,
        assignee_id: cell(columns.assignee).map(str::to_string),
        due_at,
    })
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
