use serde::{Deserialize, Serialize};
use std::path::Path;

/// Warehouse schema description used to ground SQL generation prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDoc {
    pub tables: Vec<TableDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDoc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub columns: Vec<ColumnDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub description: String,
}

impl SchemaDoc {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let raw = std::fs::read_to_string(path)?;
        let doc: SchemaDoc = serde_yaml::from_str(&raw)?;
        Ok(doc)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Markdown block describing every table and column, inlined into
    /// generation prompts.
    pub fn render_context(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            out.push_str(&format!("### {}\n", table.name));
            if !table.description.is_empty() {
                out.push_str(&format!("{}\n", table.description));
            }
            for column in &table.columns {
                if column.description.is_empty() {
                    out.push_str(&format!("- {} ({})\n", column.name, column.column_type));
                } else {
                    out.push_str(&format!(
                        "- {} ({}): {}\n",
                        column.name, column.column_type, column.description
                    ));
                }
            }
            out.push('\n');
        }
        out
    }
}
