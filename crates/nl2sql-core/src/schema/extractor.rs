use super::{Column, Schema, SchemaSource, TableSchema};
use crate::errors::SchemaError;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub const DESCRIPTION_DIR: &str = "database_description";

const COL_NAME: &str = "original_column_name";
const COL_TYPE: &str = "data_format";
const COL_DESCRIPTION: &str = "column_description";

/// Reads `<root>/<db_id>/database_description/*.csv`.
#[derive(Debug, Clone)]
pub struct CsvSchemaSource {
    root: PathBuf,
}

impl CsvSchemaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SchemaSource for CsvSchemaSource {
    fn load(&self, db_id: &str) -> Result<Schema, SchemaError> {
        extract_schema(&self.root.join(db_id))
    }
}

/// Builds the schema of one database directory, one table per CSV file,
/// tables ordered by file name.
pub fn extract_schema(database_dir: &Path) -> Result<Schema, SchemaError> {
    let desc_dir = database_dir.join(DESCRIPTION_DIR);
    if !desc_dir.is_dir() {
        return Err(SchemaError::NotFound {
            dir: database_dir.to_path_buf(),
        });
    }

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SchemaError::Io { path, source }
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&desc_dir).map_err(io_err(&desc_dir))? {
        let entry = entry.map_err(io_err(&desc_dir))?;
        let path = entry.path();
        let is_csv = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut tables = Vec::with_capacity(files.len());
    for path in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let table_name = file_name.trim_end_matches(".csv").to_string();

        let bytes = std::fs::read(&path).map_err(io_err(&path))?;
        let (text, encoding) = decode_description(&bytes);
        tracing::debug!(file = %file_name, encoding, "reading table description");

        let columns = parse_columns(&text, &file_name)?;
        tables.push(TableSchema {
            name: table_name,
            columns,
        });
    }

    Ok(Schema { tables })
}

/// UTF-8 (BOM stripped) first, Windows-1252 when the bytes are not UTF-8.
fn decode_description(bytes: &[u8]) -> (Cow<'_, str>, &'static str) {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(s) => (Cow::Borrowed(s), "utf-8"),
        Err(_) => {
            let (text, _had_errors) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(body);
            (text, "windows-1252")
        }
    }
}

fn parse_columns(text: &str, file_name: &str) -> Result<Vec<Column>, SchemaError> {
    let csv_err = |source| SchemaError::Csv {
        file: file_name.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(csv_err)?.clone();
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);
    let name_idx = find(COL_NAME).ok_or_else(|| SchemaError::MissingHeader {
        file: file_name.to_string(),
    })?;
    let type_idx = find(COL_TYPE);
    let desc_idx = find(COL_DESCRIPTION);

    let field = |record: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mut columns = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let name = field(&record, Some(name_idx));
        if name.is_empty() {
            return Err(SchemaError::Malformed {
                file: file_name.to_string(),
                row: i + 1,
            });
        }
        columns.push(Column {
            name,
            data_type: field(&record, type_idx),
            description: field(&record, desc_idx),
        });
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_desc(root: &Path, db_id: &str, file: &str, bytes: &[u8]) {
        let dir = root.join(db_id).join(DESCRIPTION_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file), bytes).unwrap();
    }

    #[test]
    fn missing_description_dir_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("financial")).unwrap();
        let err = CsvSchemaSource::new(tmp.path()).load("financial").unwrap_err();
        assert!(matches!(err, SchemaError::NotFound { .. }));
    }

    #[test]
    fn reads_tables_in_file_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_desc(
            tmp.path(),
            "financial",
            "loan.csv",
            b"original_column_name,column_name,column_description,data_format\nloan_id,,the id of the loan,integer\n",
        );
        write_desc(
            tmp.path(),
            "financial",
            "account.csv",
            b"\xEF\xBB\xBForiginal_column_name,column_description,data_format\naccount_id, the id ,integer\ndistrict_id,,\n",
        );
        write_desc(tmp.path(), "financial", "notes.txt", b"ignored");

        let schema = CsvSchemaSource::new(tmp.path()).load("financial").unwrap();
        assert_eq!(schema.table_names(), vec!["account", "loan"]);
        assert_eq!(schema.tables[0].columns[0].description, "the id");
        assert_eq!(schema.tables[0].columns[1].data_type, "");
        assert!(schema
            .render()
            .contains("Columns: account_id (integer): the id, district_id"));
    }

    #[test]
    fn blank_column_name_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        write_desc(
            tmp.path(),
            "card_games",
            "cards.csv",
            b"original_column_name,column_description\nid,row id\n  ,oops\n",
        );
        let err = CsvSchemaSource::new(tmp.path())
            .load("card_games")
            .unwrap_err();
        match err {
            SchemaError::Malformed { file, row } => {
                assert_eq!(file, "cards.csv");
                assert_eq!(row, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_name_header_is_reported_as_such() {
        let tmp = tempfile::tempdir().unwrap();
        write_desc(
            tmp.path(),
            "card_games",
            "cards.csv",
            b"column_name,column_description
id,row id
",
        );
        let err = CsvSchemaSource::new(tmp.path())
            .load("card_games")
            .unwrap_err();
        assert!(matches!(&err, SchemaError::MissingHeader { file } if file == "cards.csv"));
        assert_eq!(err.to_string(), "cards.csv has no original_column_name header");
    }

    #[test]
    fn falls_back_to_windows_1252() {
        let tmp = tempfile::tempdir().unwrap();
        // 0xE9 is 'é' in Windows-1252 and invalid as standalone UTF-8
        write_desc(
            tmp.path(),
            "european_football_2",
            "Player.csv",
            b"original_column_name,column_description\nplayer_name,name of the joueur \xE9toile\n",
        );
        let schema = CsvSchemaSource::new(tmp.path())
            .load("european_football_2")
            .unwrap();
        assert_eq!(
            schema.tables[0].columns[0].description,
            "name of the joueur \u{e9}toile"
        );
    }
}
