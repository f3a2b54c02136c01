//! In-process [`RecordClient`] backed by plain maps.
//!
//! Mirrors the backend conventions the gateway relies on: unset fields read
//! back as `false`, domains are evaluated in prefix notation, and
//! `[0, 0, values]` commands in registered x2many fields create child rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::client::{FindOptions, Record, RecordClient, RecordId};
use crate::command::Command;
use crate::domain::{Condition, Domain, Operator, Term};
use crate::error::{RpcError, RpcResult};

/// A recorded `invoke` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub model: String,
    pub action: String,
    pub ids: Vec<RecordId>,
}

#[derive(Default)]
struct Store {
    tables: HashMap<String, BTreeMap<RecordId, Record>>,
    next_id: RecordId,
    invocations: Vec<Invocation>,
}

impl Store {
    fn allocate(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory backend used by tests and local runs without an ERP.
#[derive(Default)]
pub struct InMemoryRecordClient {
    store: Mutex<Store>,
    /// `(parent model, field) -> child model`
    relations: HashMap<(String, String), String>,
    failing_actions: HashSet<String>,
    unavailable: bool,
}

impl InMemoryRecordClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize create commands written to `model.field` as rows of `child`.
    #[must_use]
    pub fn with_relation(mut self, model: &str, field: &str, child: &str) -> Self {
        self.relations
            .insert((model.to_owned(), field.to_owned()), child.to_owned());
        self
    }

    /// Make every `invoke` of `action` fail with a remote error.
    #[must_use]
    pub fn with_failing_action(mut self, action: &str) -> Self {
        self.failing_actions.insert(action.to_owned());
        self
    }

    /// Fail every call as if the backend could not be reached.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Seed a row under an explicit id.
    pub fn insert(&self, model: &str, id: RecordId, mut values: Record) {
        let mut store = self.store.lock();
        values.insert("id".to_owned(), json!(id));
        store.next_id = store.next_id.max(id);
        store
            .tables
            .entry(model.to_owned())
            .or_default()
            .insert(id, values);
    }

    /// Raw stored row, without `false` padding.
    #[must_use]
    pub fn get(&self, model: &str, id: RecordId) -> Option<Record> {
        self.store
            .lock()
            .tables
            .get(model)
            .and_then(|t| t.get(&id))
            .cloned()
    }

    #[must_use]
    pub fn count(&self, model: &str) -> usize {
        self.store.lock().tables.get(model).map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.store.lock().invocations.clone()
    }

    fn check_available(&self) -> RpcResult<()> {
        if self.unavailable {
            return Err(RpcError::Remote {
                code: 0,
                message: "connection refused".to_owned(),
            });
        }
        Ok(())
    }

    fn materialize(&self, store: &mut Store, model: &str, values: &mut Record) -> RpcResult<()> {
        for (field, value) in values.iter_mut() {
            let Some(child) = self.relations.get(&(model.to_owned(), field.clone())) else {
                continue;
            };
            let Value::Array(commands) = value else {
                continue;
            };
            let mut ids = Vec::with_capacity(commands.len());
            for command in commands.iter() {
                match command.as_array().map(Vec::as_slice) {
                    Some([code, _, Value::Object(child_values)])
                        if code.as_i64() == Some(Command::CREATE) =>
                    {
                        let id = store.allocate();
                        let mut row = child_values.clone();
                        row.insert("id".to_owned(), json!(id));
                        store.tables.entry(child.clone()).or_default().insert(id, row);
                        ids.push(id);
                    }
                    Some([code, id, _]) if code.as_i64() == Some(Command::LINK) => {
                        ids.push(id.as_i64().ok_or_else(|| remote("link command without id"))?);
                    }
                    _ => return Err(remote(format!("unsupported command on {model}.{field}"))),
                }
            }
            *value = json!(ids);
        }
        Ok(())
    }
}

fn remote(message: impl Into<String>) -> RpcError {
    RpcError::Remote {
        code: 200,
        message: message.into(),
    }
}

/// Scalar view of a stored value: many2one pairs compare by their id.
fn scalar(value: &Value) -> &Value {
    match value {
        Value::Array(pair) if pair.len() == 2 && pair[0].is_i64() && pair[1].is_string() => {
            &pair[0]
        }
        other => other,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (scalar(left), scalar(right)) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    compare(left, right).map_or_else(|| scalar(left) == scalar(right), Ordering::is_eq)
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    haystack
        .as_array()
        .is_some_and(|items| items.iter().any(|item| values_equal(item, needle)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glob {
    Any,
    One,
    Char(char),
}

/// `like` semantics: the pattern matches anywhere in `text`, `%` and `_` are
/// wildcards and a backslash makes the next character literal.
fn like_matches(text: &str, pattern: &str) -> bool {
    let mut tokens = vec![Glob::Any];
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => Glob::Char(chars.next().unwrap_or('\\')),
            '%' => Glob::Any,
            '_' => Glob::One,
            other => Glob::Char(other),
        });
    }
    tokens.push(Glob::Any);

    let text: Vec<char> = text.chars().collect();
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Glob::Any => {
                let mut seen = false;
                for (slot, &here) in next.iter_mut().zip(&reachable) {
                    seen |= here;
                    *slot = seen;
                }
            }
            Glob::One => {
                for i in (0..text.len()).filter(|&i| reachable[i]) {
                    next[i + 1] = true;
                }
            }
            Glob::Char(c) => {
                for (i, &ch) in text.iter().enumerate() {
                    if reachable[i] && ch == c {
                        next[i + 1] = true;
                    }
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

fn evaluate(condition: &Condition, record: &Record) -> bool {
    let field = record.get(&condition.field).unwrap_or(&Value::Bool(false));
    let expected = &condition.value;
    match condition.operator {
        Operator::Eq => values_equal(field, expected),
        Operator::NotEq => !values_equal(field, expected),
        Operator::In => contains(expected, field),
        Operator::NotIn => !contains(expected, field),
        Operator::Like | Operator::ILike => {
            let (Some(text), Some(pattern)) = (field.as_str(), expected.as_str()) else {
                return false;
            };
            if condition.operator == Operator::ILike {
                like_matches(&text.to_lowercase(), &pattern.to_lowercase())
            } else {
                like_matches(text, pattern)
            }
        }
        Operator::Gt => compare(field, expected) == Some(Ordering::Greater),
        Operator::Ge => matches!(
            compare(field, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare(field, expected) == Some(Ordering::Less),
        Operator::Le => matches!(compare(field, expected), Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Evaluate a prefix-notation domain against one record.
fn matches(domain: &Domain, record: &Record) -> RpcResult<bool> {
    let mut stack: Vec<bool> = Vec::new();
    for term in domain.terms().iter().rev() {
        let value = match term {
            Term::Condition(c) => evaluate(c, record),
            Term::Not => !stack.pop().ok_or_else(|| remote("dangling '!' in domain"))?,
            Term::And | Term::Or => {
                let (Some(a), Some(b)) = (stack.pop(), stack.pop()) else {
                    return Err(remote("logical operator is missing operands"));
                };
                if matches!(term, Term::And) { a && b } else { a || b }
            }
        };
        stack.push(value);
    }
    Ok(stack.into_iter().all(|v| v))
}

fn sort_rows(rows: &mut [Record], order: &str) {
    let keys: Vec<(&str, bool)> = order
        .split(',')
        .filter_map(|part| {
            let mut it = part.split_whitespace();
            let field = it.next()?;
            let descending = it.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
            Some((field, descending))
        })
        .collect();

    rows.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = a.get(*field).unwrap_or(&Value::Null);
            let right = b.get(*field).unwrap_or(&Value::Null);
            let ord = compare(left, right).unwrap_or(Ordering::Equal);
            let ord = if *descending { ord.reverse() } else { ord };
            if ord.is_ne() {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl RecordClient for InMemoryRecordClient {
    async fn create(&self, model: &str, mut values: Record) -> RpcResult<RecordId> {
        self.check_available()?;
        let mut store = self.store.lock();
        self.materialize(&mut store, model, &mut values)?;
        let id = store.allocate();
        values.insert("id".to_owned(), json!(id));
        store
            .tables
            .entry(model.to_owned())
            .or_default()
            .insert(id, values);
        Ok(id)
    }

    async fn find(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        options: FindOptions,
    ) -> RpcResult<Vec<Record>> {
        self.check_available()?;
        let store = self.store.lock();
        let Some(table) = store.tables.get(model) else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        for row in table.values() {
            if matches(domain, row)? {
                rows.push(row.clone());
            }
        }
        if let Some(order) = options.order.as_deref() {
            sort_rows(&mut rows, order);
        }

        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(options.offset)
            .take(limit)
            .map(|row| {
                let mut out = Record::new();
                out.insert("id".to_owned(), row.get("id").cloned().unwrap_or(Value::Bool(false)));
                for field in fields {
                    let value = row.get(*field).cloned().unwrap_or(Value::Bool(false));
                    out.insert((*field).to_owned(), value);
                }
                out
            })
            .collect())
    }

    async fn update(&self, model: &str, ids: &[RecordId], mut values: Record) -> RpcResult<bool> {
        self.check_available()?;
        let mut store = self.store.lock();
        self.materialize(&mut store, model, &mut values)?;
        let table = store.tables.entry(model.to_owned()).or_default();
        for id in ids {
            let row = table
                .get_mut(id)
                .ok_or_else(|| remote(format!("record {model}({id}) does not exist")))?;
            for (field, value) in &values {
                row.insert(field.clone(), value.clone());
            }
        }
        Ok(true)
    }

    async fn invoke(&self, model: &str, action: &str, ids: &[RecordId]) -> RpcResult<Value> {
        self.check_available()?;
        let mut store = self.store.lock();
        store.invocations.push(Invocation {
            model: model.to_owned(),
            action: action.to_owned(),
            ids: ids.to_vec(),
        });
        if self.failing_actions.contains(action) {
            return Err(remote(format!("{model} has no method {action}")));
        }
        Ok(Value::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RecordClientExt;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test records are objects"),
        }
    }

    #[tokio::test]
    async fn create_then_read_pads_missing_fields() {
        let client = InMemoryRecordClient::new();
        let id = client
            .create("res.partner", record(json!({"name": "Ana"})))
            .await
            .unwrap();

        let row = client
            .find_by_id("res.partner", id, &["name", "email"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row["name"], "Ana");
        assert_eq!(row["email"], json!(false));
    }

    #[tokio::test]
    async fn evaluates_disjunction_and_ilike() {
        let client = InMemoryRecordClient::new();
        let rows = [
            (1, "Camisa", "CAM-1"),
            (2, "Pantalon", "PAN-1"),
            (3, "Gorra", "cam-2"),
        ];
        for (id, name, code) in rows {
            client.insert(
                "product.product",
                id,
                record(json!({"name": name, "default_code": code})),
            );
        }

        let domain = Domain::all().with_any(vec![
            Condition::new("name", Operator::ILike, "cam"),
            Condition::new("default_code", Operator::ILike, "cam"),
        ]);
        let rows = client
            .find("product.product", &domain, &["name"], FindOptions::default())
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn like_follows_backend_wildcards() {
        assert!(like_matches("camisa roja", "isa"));
        assert!(like_matches("50% off", "50%off"));
        assert!(like_matches("a_b", "a_b"));
        assert!(like_matches("axb", "a_b"));
        assert!(!like_matches("axb", r"a\_b"));
        assert!(like_matches("a_b", r"a\_b"));
        assert!(!like_matches("50 off", r"50\%"));
        assert!(like_matches("50% off", r"50\%"));
        assert!(like_matches(r"c:\tmp", r"c:\\tmp"));
        assert!(!like_matches("ab", "abc"));
    }

    #[tokio::test]
    async fn many2one_pairs_compare_by_id() {
        let client = InMemoryRecordClient::new();
        client.insert("account.move", 5, record(json!({"partner_id": [12, "Ana"]})));

        let rows = client
            .find(
                "account.move",
                &Domain::all().with("partner_id", Operator::Eq, 12),
                &["partner_id"],
                FindOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn create_commands_materialize_children() {
        let client = InMemoryRecordClient::new().with_relation(
            "sale.order",
            "order_line",
            "sale.order.line",
        );
        let line = record(json!({"product_id": 4, "product_uom_qty": 2.0}));
        let id = client
            .create(
                "sale.order",
                record(json!({"partner_id": 1, "order_line": [Command::create(line)]})),
            )
            .await
            .unwrap();

        let order = client.get("sale.order", id).unwrap();
        let line_ids = order["order_line"].as_array().unwrap();
        assert_eq!(line_ids.len(), 1);
        assert_eq!(client.count("sale.order.line"), 1);
    }

    #[tokio::test]
    async fn order_offset_and_limit() {
        let client = InMemoryRecordClient::new();
        for (id, name) in [(1, "c"), (2, "a"), (3, "b")] {
            client.insert("res.partner", id, record(json!({"name": name})));
        }
        let rows = client
            .find(
                "res.partner",
                &Domain::all(),
                &["name"],
                FindOptions::default().order("name desc").offset(1).limit(1),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], "b");
    }

    #[tokio::test]
    async fn failing_action_is_recorded() {
        let client = InMemoryRecordClient::new().with_failing_action("action_post");
        let err = client.invoke("account.payment", "action_post", &[3]).await;
        assert!(matches!(err, Err(RpcError::Remote { .. })));
        assert_eq!(client.invocations()[0].ids, vec![3]);
    }

    #[tokio::test]
    async fn update_missing_record_fails() {
        let client = InMemoryRecordClient::new();
        let err = client.update("sale.order", &[99], Record::new()).await;
        assert!(err.is_err());
    }
}
