//! Write commands for one2many / many2many fields.

use serde_json::{Map, Value, json};

use crate::client::RecordId;

/// Builders for the `[code, id, payload]` triples the backend expects in
/// x2many fields.
pub struct Command;

impl Command {
    pub const CREATE: i64 = 0;
    pub const LINK: i64 = 4;

    /// Create a new child record with `values` and attach it.
    #[must_use]
    pub fn create(values: Map<String, Value>) -> Value {
        json!([Self::CREATE, 0, values])
    }

    /// Attach an existing record.
    #[must_use]
    pub fn link(id: RecordId) -> Value {
        json!([Self::LINK, id, 0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_shapes() {
        let mut values = Map::new();
        values.insert("product_id".to_owned(), json!(3));
        assert_eq!(Command::create(values), json!([0, 0, {"product_id": 3}]));
        assert_eq!(Command::link(9), json!([4, 9, 0]));
    }
}
