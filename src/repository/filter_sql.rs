// ==========================================
// Transformer Dispatch - DispatchFilter -> SQL predicate
// ==========================================
// Turns the typed filter into a parameterised WHERE clause over the
// `dispatch d` alias. Values are bound, never interpolated.
// ==========================================

use rusqlite::types::Value;

use crate::domain::dispatch::DispatchFilter;
use crate::domain::types::TeamScope;

/// WHERE clause (without the keyword) plus its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPredicate {
    pub clause: String,
    pub values: Vec<Value>,
}

impl SqlPredicate {
    /// Append an extra condition with its values
    pub fn and(mut self, condition: &str, values: Vec<Value>) -> Self {
        self.clause = format!("{} AND {}", self.clause, condition);
        self.values.extend(values);
        self
    }
}

/// Build the predicate for a dispatch filter
///
/// An empty id list matches nothing rather than everything.
pub fn build_dispatch_predicate(filter: &DispatchFilter) -> SqlPredicate {
    let mut conditions: Vec<String> = vec!["1 = 1".to_string()];
    let mut values: Vec<Value> = Vec::new();

    if let Some(direction) = filter.direction {
        conditions.push("d.direction = ?".to_string());
        values.push(Value::Text(direction.to_db_str().to_string()));
    }

    if let Some(kind) = filter.document_kind {
        conditions.push("d.document_kind = ?".to_string());
        values.push(Value::Text(kind.to_db_str().to_string()));
    }

    if let Some(flag) = filter.is_lab_round_trip {
        conditions.push("d.is_lab_round_trip = ?".to_string());
        values.push(Value::Integer(flag as i64));
    }

    if let TeamScope::Team(team_id) = &filter.team {
        conditions.push("d.team_id = ?".to_string());
        values.push(Value::Text(team_id.clone()));
    }

    if let Some(ids) = &filter.ids {
        conditions.push(in_list("d.id", ids.len()));
        values.extend(ids.iter().cloned().map(Value::Text));
    }

    match filter.has_source {
        Some(true) => conditions.push("d.source_dispatch_id IS NOT NULL".to_string()),
        Some(false) => conditions.push("d.source_dispatch_id IS NULL".to_string()),
        None => {}
    }

    if let Some(ids) = &filter.source_dispatch_ids {
        conditions.push(in_list("d.source_dispatch_id", ids.len()));
        values.extend(ids.iter().cloned().map(Value::Text));
    }

    match filter.has_linked_official {
        Some(true) => conditions.push("d.linked_official_id IS NOT NULL".to_string()),
        Some(false) => conditions.push("d.linked_official_id IS NULL".to_string()),
        None => {}
    }

    if let Some(official_id) = &filter.linked_official_id {
        conditions.push("d.linked_official_id = ?".to_string());
        values.push(Value::Text(official_id.clone()));
    }

    if let Some((start, end)) = filter.date_range {
        conditions.push("d.date BETWEEN ? AND ?".to_string());
        values.push(Value::Text(start.format("%Y-%m-%d").to_string()));
        values.push(Value::Text(end.format("%Y-%m-%d").to_string()));
    }

    if let Some(query) = &filter.number_contains {
        conditions.push("d.document_number LIKE ? ESCAPE '\\'".to_string());
        values.push(Value::Text(format!("%{}%", escape_like(query))));
    }

    SqlPredicate {
        clause: conditions.join(" AND "),
        values,
    }
}

/// `column IN (?, ?, ...)`, or a false literal for an empty list
pub fn in_list(column: &str, len: usize) -> String {
    if len == 0 {
        return "0 = 1".to_string();
    }
    let placeholders = vec!["?"; len].join(", ");
    format!("{} IN ({})", column, placeholders)
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
