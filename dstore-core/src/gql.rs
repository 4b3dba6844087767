use crate::cursor::Cursor;
use crate::types::Value;
use std::collections::BTreeMap;

/// Value bound to a GQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum GqlBinding {
    Value(Value),
    Cursor(Cursor),
}

/// Literal GQL query string, passed through to the service unvalidated
#[derive(Debug, Clone, PartialEq)]
pub struct GqlQuery {
    query_string: String,
    allow_literals: bool,
    named_bindings: BTreeMap<String, GqlBinding>,
    positional_bindings: Vec<GqlBinding>,
}

impl GqlQuery {
    pub fn new(query_string: impl Into<String>) -> Self {
        Self {
            query_string: query_string.into(),
            allow_literals: false,
            named_bindings: BTreeMap::new(),
            positional_bindings: Vec::new(),
        }
    }

    /// Allow literal values inside the query string
    pub fn allow_literals(mut self, allow: bool) -> Self {
        self.allow_literals = allow;
        self
    }

    /// Bind `@name` to a value
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named_bindings
            .insert(name.into(), GqlBinding::Value(value.into()));
        self
    }

    /// Bind `@name` to a cursor
    pub fn bind_cursor(mut self, name: impl Into<String>, cursor: Cursor) -> Self {
        self.named_bindings.insert(name.into(), GqlBinding::Cursor(cursor));
        self
    }

    /// Bind the next positional parameter (`@1`, `@2`, ...)
    pub fn bind_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional_bindings.push(GqlBinding::Value(value.into()));
        self
    }

    pub fn bind_positional_cursor(mut self, cursor: Cursor) -> Self {
        self.positional_bindings.push(GqlBinding::Cursor(cursor));
        self
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn literals_allowed(&self) -> bool {
        self.allow_literals
    }

    pub fn named_bindings(&self) -> &BTreeMap<String, GqlBinding> {
        &self.named_bindings
    }

    pub fn positional_bindings(&self) -> &[GqlBinding] {
        &self.positional_bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gql_bindings() {
        let cursor = Cursor::from_bytes(&b"start"[..]);
        let gql = GqlQuery::new("SELECT * FROM Task WHERE done = @done AND __key__ > @1")
            .bind("done", false)
            .bind_cursor("after", cursor.clone())
            .bind_positional(5i64)
            .allow_literals(true);

        assert!(gql.literals_allowed());
        assert_eq!(gql.named_bindings()["done"], GqlBinding::Value(Value::Boolean(false)));
        assert_eq!(gql.named_bindings()["after"], GqlBinding::Cursor(cursor));
        assert_eq!(gql.positional_bindings(), [GqlBinding::Value(Value::Integer(5))]);
    }
}
