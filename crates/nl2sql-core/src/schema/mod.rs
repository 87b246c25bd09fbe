//! Schema descriptions rendered into agent prompts.

use crate::errors::SchemaError;
use serde::{Deserialize, Serialize};

pub mod extractor;

pub use extractor::CsvSchemaSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<TableSchema>,
}

impl Schema {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Text form handed to the agents.
    ///
    /// ```text
    /// Allowed Tables: account, district
    ///
    /// Table: account
    /// Columns: account_id (integer): the id of the account, district_id
    /// ```
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.tables.len() * 3 + 1);
        lines.push(format!("Allowed Tables: {}\n", self.table_names().join(", ")));

        for table in &self.tables {
            lines.push(format!("Table: {}", table.name));
            let cols: Vec<String> = table.columns.iter().map(render_column).collect();
            if !cols.is_empty() {
                lines.push(format!("Columns: {}", cols.join(", ")));
            }
            lines.push(String::new());
        }

        lines.join("\n").trim().to_string()
    }

    /// Keeps only the named tables (case-insensitive), in schema order.
    /// Returns `None` when no name matches a known table.
    pub fn narrowed_to(&self, names: &[String]) -> Option<Schema> {
        let tables: Vec<TableSchema> = self
            .tables
            .iter()
            .filter(|t| names.iter().any(|n| n.eq_ignore_ascii_case(&t.name)))
            .cloned()
            .collect();
        if tables.is_empty() {
            None
        } else {
            Some(Schema { tables })
        }
    }
}

fn render_column(col: &Column) -> String {
    let mut s = col.name.clone();
    if !col.data_type.is_empty() {
        s.push_str(&format!(" ({})", col.data_type));
    }
    if !col.description.is_empty() {
        s.push_str(&format!(": {}", col.description));
    }
    s
}

/// Produces the schema description of one database.
pub trait SchemaSource: Send + Sync {
    fn load(&self, db_id: &str) -> Result<Schema, SchemaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: &str, desc: &str) -> Column {
        Column {
            name: name.into(),
            data_type: ty.into(),
            description: desc.into(),
        }
    }

    fn sample() -> Schema {
        Schema {
            tables: vec![
                TableSchema {
                    name: "account".into(),
                    columns: vec![
                        col("account_id", "integer", "the id of the account"),
                        col("district_id", "", ""),
                    ],
                },
                TableSchema {
                    name: "loan".into(),
                    columns: vec![col("amount", "", "approved amount")],
                },
            ],
        }
    }

    #[test]
    fn render_matches_prompt_layout() {
        let expected = "Allowed Tables: account, loan\n\n\
                        Table: account\n\
                        Columns: account_id (integer): the id of the account, district_id\n\n\
                        Table: loan\n\
                        Columns: amount: approved amount";
        assert_eq!(sample().render(), expected);
    }

    #[test]
    fn table_without_columns_has_no_columns_line() {
        let s = Schema {
            tables: vec![TableSchema {
                name: "empty".into(),
                columns: vec![],
            }],
        };
        assert_eq!(s.render(), "Allowed Tables: empty\n\nTable: empty");
    }

    #[test]
    fn narrowing_ignores_unknown_names() {
        let s = sample();
        let n = s.narrowed_to(&["LOAN".into(), "card".into()]).unwrap();
        assert_eq!(n.table_names(), vec!["loan"]);
        assert!(s.narrowed_to(&["card".into()]).is_none());
    }
}
