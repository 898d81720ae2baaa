use std::path::Path;

use anyhow::Context;

use crate::models::RosterEntry;

/// Registrar CSV export: one roster entry per record, header row required.
pub fn parse_csv(path: &Path) -> anyhow::Result<Vec<RosterEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut entries = Vec::new();
    for result in reader.deserialize::<RosterEntry>() {
        entries.push(result.context("malformed roster row")?);
    }
    Ok(entries)
}

/// Alternate roster source: the registrar's JSON export (camelCase keys).
pub fn parse_json(path: &Path) -> anyhow::Result<Vec<RosterEntry>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let entries: Vec<RosterEntry> =
        serde_json::from_reader(std::io::BufReader::new(file)).context("malformed roster JSON")?;
    Ok(entries)
}

/// Case-insensitive substring search over student names.
pub fn search<'a>(entries: &'a [RosterEntry], query: &str) -> Vec<&'a RosterEntry> {
    let needle = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| entry.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(name: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            id_number: "2021-00123".to_string(),
            course_year: "BSIT-3".to_string(),
            school_year: "2025-2026".to_string(),
            semester: "1st".to_string(),
        }
    }

    #[test]
    fn search_matches_substrings_case_insensitively() {
        let entries = vec![entry("Avery Lee"), entry("Jules Moreno")];
        assert_eq!(search(&entries, "lee").len(), 1);
        assert_eq!(search(&entries, "  MORENO").len(), 1);
        assert_eq!(search(&entries, "").len(), 2);
        assert!(search(&entries, "patel").is_empty());
    }

    #[test]
    fn csv_rows_deserialize_with_snake_case_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,id_number,course_year,school_year,semester").unwrap();
        writeln!(file, "Avery Lee,2021-00123,BSIT-3,2025-2026,1st").unwrap();

        let entries = parse_csv(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Avery Lee");
        assert_eq!(entries[0].course_year, "BSIT-3");
    }

    #[test]
    fn json_rows_deserialize_with_camel_case_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"Avery Lee","idNumber":"2021-00123","courseYear":"BSIT-3","schoolYear":"2025-2026","semester":"1st"}}]"#
        )
        .unwrap();

        let entries = parse_json(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id_number, "2021-00123");
    }

    #[test]
    fn malformed_csv_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,id_number").unwrap();
        writeln!(file, "Avery Lee,2021-00123").unwrap();
        assert!(parse_csv(file.path()).is_err());
    }
}
