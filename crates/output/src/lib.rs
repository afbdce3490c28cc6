use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Number, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render `value` to stdout.
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.render_to(value, &mut out)
    }

    /// Render a list to stdout. An empty list in table format prints
    /// `empty_message` to stderr instead. JSON and YAML still emit the list.
    pub fn render_list<T: Serialize>(&self, rows: &[T], empty_message: &str) -> Result<()> {
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.render_list_to(rows, empty_message, &mut stdout.lock(), &mut stderr.lock())
    }

    pub fn render_list_to<T: Serialize, W: Write, E: Write>(
        &self,
        rows: &[T],
        empty_message: &str,
        out: &mut W,
        err: &mut E,
    ) -> Result<()> {
        if rows.is_empty() && self.format == OutputFormat::Table {
            writeln!(err, "{empty_message}")?;
            return Ok(());
        }
        self.render_to(rows, out)
    }

    pub fn render_to<T: Serialize + ?Sized, W: Write>(&self, value: &T, out: &mut W) -> Result<()> {
        let json_value = serde_json::to_value(value)?;

        match self.format {
            OutputFormat::Table => match Self::table(&json_value) {
                Some(table) => writeln!(out, "{table}")?,
                None => writeln!(out, "{}", serde_json::to_string_pretty(&json_value)?)?,
            },
            OutputFormat::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(&json_value)?)?;
            }
            OutputFormat::Yaml => {
                write!(out, "{}", serde_yaml::to_string(&Self::yaml_value(&json_value))?)?;
            }
        }

        Ok(())
    }

    /// Lists of objects become one row per object, a single object becomes
    /// a field/value listing. Anything else has no table form.
    fn table(value: &Value) -> Option<String> {
        let mut builder = Builder::default();

        match value {
            Value::Object(obj) if !obj.is_empty() => {
                builder.push_record(["field".to_string(), "value".to_string()]);
                for (key, val) in obj {
                    builder.push_record([key.clone(), Self::value_to_string(val)]);
                }
            }
            _ => {
                let (headers, rows) = Self::coerce_rows(value)?;
                builder.push_record(headers);
                for row in rows {
                    builder.push_record(row);
                }
            }
        }

        Some(builder.build().with(Style::rounded()).to_string())
    }

    fn coerce_rows(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let rows = match value {
            Value::Array(rows) if !rows.is_empty() => rows,
            _ => return None,
        };

        let headers: BTreeSet<&String> = rows
            .iter()
            .filter_map(Value::as_object)
            .flat_map(|obj| obj.keys())
            .collect();
        if headers.is_empty() {
            return None;
        }

        let data = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|header| {
                        row.get(header.as_str())
                            .map(Self::value_to_string)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Some((headers.into_iter().cloned().collect(), data))
    }

    /// Rebuild `value` as YAML. Numbers are converted by hand because a
    /// precision-preserving JSON number has no YAML serialization of its own.
    fn yaml_value(value: &Value) -> serde_yaml::Value {
        match value {
            Value::Null => serde_yaml::Value::Null,
            Value::Bool(b) => serde_yaml::Value::Bool(*b),
            Value::Number(n) => Self::yaml_number(n),
            Value::String(s) => serde_yaml::Value::String(s.clone()),
            Value::Array(items) => {
                serde_yaml::Value::Sequence(items.iter().map(Self::yaml_value).collect())
            }
            Value::Object(obj) => serde_yaml::Value::Mapping(
                obj.iter()
                    .map(|(key, val)| (serde_yaml::Value::String(key.clone()), Self::yaml_value(val)))
                    .collect(),
            ),
        }
    }

    // Numbers that don't fit i64, u64 or an exact f64 keep their digits as a string.
    fn yaml_number(n: &Number) -> serde_yaml::Value {
        if let Some(i) = n.as_i64() {
            return serde_yaml::Value::Number(i.into());
        }
        if let Some(u) = n.as_u64() {
            return serde_yaml::Value::Number(u.into());
        }
        let text = n.to_string();
        match n.as_f64() {
            Some(f) if Number::from_f64(f).map(|exact| exact.to_string()) == Some(text.clone()) => {
                serde_yaml::Value::Number(f.into())
            }
            _ => serde_yaml::Value::String(text),
        }
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}
