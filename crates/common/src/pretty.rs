use tabled::{builder::Builder, settings};
use types::Value;

/// Predefined output styles that map to `tabled` styles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TableStyleKind {
    #[default]
    Modern,
    Ascii,
    Plain,
}

impl TableStyleKind {
    fn apply(self, table: &mut tabled::Table) {
        match self {
            Self::Modern => table.with(settings::Style::modern()),
            Self::Ascii => table.with(settings::Style::ascii()),
            Self::Plain => table.with(settings::Style::empty()),
        };
    }
}

/// Render a header row plus value rows into a human-friendly table string.
pub fn render_rows(headers: &[String], rows: &[Vec<Value>], style: TableStyleKind) -> String {
    if headers.is_empty() && rows.is_empty() {
        return "<empty>".into();
    }

    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());

    for row in rows {
        builder.push_record(row.iter().map(format_value));
    }

    let mut table = builder.build();
    style.apply(&mut table);
    table.to_string()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        other => other.to_string(),
    }
}
