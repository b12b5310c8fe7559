use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::{Result, ResultRow, CATEGORY_CODES, FALLBACK_TITLE};

static ILLEGAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid filename pattern"));

/// Turns a competition title into a file stem: a trailing category short-code is dropped,
/// characters not allowed in file names and whitespace become `_`.
pub fn sanitize_file_stem(title: &str) -> String {
    let mut parts: Vec<&str> = title.split_whitespace().collect();
    if let Some(last) = parts.last() {
        if CATEGORY_CODES.contains(&last.to_lowercase().as_str()) {
            parts.pop();
        }
    }
    let clean = parts.join(" ");
    let safe = ILLEGAL_CHARS.replace_all(&clean, "_").replace(' ', "_");
    if safe.is_empty() {
        FALLBACK_TITLE.to_owned()
    } else {
        safe
    }
}

pub fn output_file_name(title: &str) -> String {
    format!("{}.csv", sanitize_file_stem(title))
}

/// Renders rows as CSV with a `name,category` header and CRLF line endings.
pub fn to_csv(rows: &[ResultRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    // Written explicitly so an empty run still gets a header.
    writer.write_record(["name", "category"])?;
    for row in rows {
        writer.write_record([&row.name, &row.category])?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Writes rows to `path`, replacing any existing file.
pub async fn write_csv(path: &Path, rows: &[ResultRow]) -> Result<()> {
    let bytes = to_csv(rows)?;
    let mut file = File::create(path).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_category_code() {
        assert_eq!(sanitize_file_stem("City Open H1"), "City_Open");
        assert_eq!(sanitize_file_stem("City Open n2.2"), "City_Open");
        assert_eq!(sanitize_file_stem("h1 City Open"), "h1_City_Open");
    }

    #[test]
    fn replaces_illegal_characters() {
        assert_eq!(
            sanitize_file_stem("Cup: 2025/26 \"Kyiv\" <final>?"),
            "Cup__2025_26__Kyiv___final__"
        );
    }

    #[test]
    fn empty_title_falls_back() {
        assert_eq!(sanitize_file_stem(""), "competition");
        assert_eq!(sanitize_file_stem("   "), "competition");
        assert_eq!(sanitize_file_stem("w1"), "competition");
        assert_eq!(output_file_name(""), "competition.csv");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        for title in ["City Open h1", "A h1 h2", "Cup: 2025/26", "  spaced   out  ", "r0"] {
            let once = sanitize_file_stem(title);
            assert_eq!(sanitize_file_stem(&once), once);
        }
    }

    #[test]
    fn csv_has_header_and_quotes() {
        let rows = vec![
            ResultRow::new("Ann Lee", "h1"),
            ResultRow::new("Lee, Bob", "n2.2"),
        ];
        let text = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
        assert_eq!(text, "name,category\r\nAnn Lee,h1\r\n\"Lee, Bob\",n2.2\r\n");
    }

    #[tokio::test]
    async fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale content that is longer than the new one\n").unwrap();

        write_csv(&path, &[ResultRow::new("Олена Коваль", "w0")])
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "name,category\r\nОлена Коваль,w0\r\n");
    }
}
