use crate::models::FetchResult;
use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save a fetch result as pretty JSON: `{"rows": [...], "last_updated": "YYYY-MM-DD" | null}`.
pub fn save_json<P: AsRef<Path>>(result: &FetchResult, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(result)?;
    f.write_all(s.as_bytes())?;
    f.write_all(b"\n")?;
    Ok(())
}

/// Load a result previously written by [`save_json`].
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<FetchResult> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn write_and_read_json() {
        let dir = tempdir().unwrap();
        let jsonp = dir.path().join("x.json");
        let result = FetchResult {
            rows: vec![
                serde_json::from_value(json!({"id": "DEU", "date": "2020", "value": 1.23}))
                    .unwrap(),
            ],
            last_updated: NaiveDate::from_ymd_opt(2023, 2, 1),
        };
        save_json(&result, &jsonp).unwrap();
        let text = std::fs::read_to_string(&jsonp).unwrap();
        assert!(text.contains("\"last_updated\": \"2023-02-01\""));
        assert_eq!(load_json(&jsonp).unwrap(), result);
    }
}
