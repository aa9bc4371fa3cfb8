use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::AttendanceRecord;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_records: usize,
    pub by_date: BTreeMap<String, u64>,
    pub by_student: BTreeMap<String, u64>,
    pub by_method: BTreeMap<String, u64>,
}

pub fn compute_stats(records: &[AttendanceRecord]) -> Stats {
    let mut by_date = BTreeMap::new();
    let mut by_student = BTreeMap::new();
    let mut by_method = BTreeMap::new();

    for record in records {
        *by_date.entry(record.date.to_string()).or_insert(0) += 1;
        *by_student.entry(record.student_id.to_string()).or_insert(0) += 1;
        *by_method.entry(record.method.clone()).or_insert(0) += 1;
    }

    Stats {
        total_records: records.len(),
        by_date,
        by_student,
        by_method,
    }
}

pub const CSV_HEADER: &str = "Student Name,Roll Number,Date,Time,Method";

// Rows come out in the order the records are given (callers fetch them in
// descending timestamp order). Times are the UTC time-of-day of the mark.
pub fn render_csv(records: &[AttendanceRecord]) -> String {
    let rows: Vec<String> = records.iter().map(csv_row).collect();
    format!("{}\n{}", CSV_HEADER, rows.join("\n"))
}

fn csv_row(record: &AttendanceRecord) -> String {
    [
        record.student_name.as_str(),
        record.roll_number.as_str(),
        &record.date.to_string(),
        &record.timestamp.format("%H:%M:%S").to_string(),
        record.method.as_str(),
    ]
    .map(quote)
    .join(",")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn record(
        student_id: Uuid,
        name: &str,
        roll: &str,
        timestamp: DateTime<Utc>,
        method: &str,
    ) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            student_id,
            roll_number: roll.to_string(),
            student_name: name.to_string(),
            date: timestamp.date_naive(),
            timestamp,
            method: method.to_string(),
            marked_at: timestamp,
        }
    }

    #[test]
    fn stats_tallies_sum_to_total() {
        let ada = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let records = vec![
            record(ada, "Ada", "R1", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), "manual"),
            record(bob, "Bob", "R2", Utc.with_ymd_and_hms(2024, 3, 4, 9, 5, 0).unwrap(), "qr"),
            record(ada, "Ada", "R1", Utc.with_ymd_and_hms(2024, 3, 5, 9, 1, 0).unwrap(), "qr"),
        ];

        let stats = compute_stats(&records);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.by_date.values().sum::<u64>(), 3);
        assert_eq!(stats.by_student.values().sum::<u64>(), 3);
        assert_eq!(stats.by_method.values().sum::<u64>(), 3);
        assert_eq!(stats.by_date["2024-03-04"], 2);
        assert_eq!(stats.by_student[&ada.to_string()], 2);
        assert_eq!(stats.by_method["qr"], 2);
    }

    #[test]
    fn stats_of_empty_set_is_empty() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_records, 0);
        assert!(stats.by_date.is_empty());
        assert!(stats.by_student.is_empty());
        assert!(stats.by_method.is_empty());
    }

    #[test]
    fn stats_serializes_with_wire_names() {
        let value = serde_json::to_value(compute_stats(&[])).unwrap();
        assert!(value.get("totalRecords").is_some());
        assert!(value.get("byDate").is_some());
        assert!(value.get("byStudent").is_some());
        assert!(value.get("byMethod").is_some());
    }

    #[test]
    fn csv_has_header_and_one_quoted_row_per_record() {
        let later = Utc.with_ymd_and_hms(2024, 3, 4, 10, 15, 30).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let records = vec![
            record(Uuid::new_v4(), "Ada Lovelace", "R1", later, "qr"),
            record(Uuid::new_v4(), "Bob", "R2", earlier, "manual"),
        ];

        let csv = render_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Student Name,Roll Number,Date,Time,Method");
        assert_eq!(
            lines[1],
            "\"Ada Lovelace\",\"R1\",\"2024-03-04\",\"10:15:30\",\"qr\""
        );
        assert_eq!(
            lines[2],
            "\"Bob\",\"R2\",\"2024-03-04\",\"09:00:00\",\"manual\""
        );
    }

    #[test]
    fn csv_escapes_embedded_quotes_and_keeps_commas() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let records = vec![record(
            Uuid::new_v4(),
            "O'Brien, \"Paddy\"",
            "R3",
            instant,
            "manual",
        )];

        let csv = render_csv(&records);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("\"O'Brien, \"\"Paddy\"\"\","));
    }

    #[test]
    fn csv_of_empty_set_is_just_the_header() {
        assert_eq!(render_csv(&[]), "Student Name,Roll Number,Date,Time,Method\n");
    }
}
