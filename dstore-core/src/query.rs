/// Structured query builder
///
/// Builders are plain values: every method consumes the builder and returns
/// it, so a clone taken before further chaining is an independent snapshot.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::key::Key;
use crate::types::Value;
use std::str::FromStr;

/// Comparison operator of a property filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    HasAncestor,
}

impl FromStr for FilterOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "<" | "lt" => Ok(FilterOp::LessThan),
            "<=" | "lte" => Ok(FilterOp::LessThanOrEqual),
            ">" | "gt" => Ok(FilterOp::GreaterThan),
            ">=" | "gte" => Ok(FilterOp::GreaterThanOrEqual),
            "=" | "==" | "eq" | "eql" => Ok(FilterOp::Equal),
            "~" | "~>" | "ancestor" | "has_ancestor" => Ok(FilterOp::HasAncestor),
            _ => Err(Error::InvalidArgument(format!(
                "Unknown filter operator {:?}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub property: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyOrder {
    pub property: String,
    pub direction: Direction,
}

/// Query over one or more kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    kinds: Vec<String>,
    filters: Vec<PropertyFilter>,
    orders: Vec<PropertyOrder>,
    projection: Vec<String>,
    distinct_on: Vec<String>,
    limit: Option<i32>,
    offset: i32,
    start_cursor: Option<Cursor>,
    end_cursor: Option<Cursor>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kind to query. Repeated calls query the union of kinds.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    /// Add a property filter; multiple filters are combined with AND
    pub fn filter(mut self, property: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(PropertyFilter {
            property: property.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add a property filter with a textual operator such as `"="` or `">="`
    ///
    /// # Example
    /// ```
    /// # use dstore_core::Query;
    /// let query = Query::new()
    ///     .kind("Task")
    ///     .where_op("done", "=", false)
    ///     .unwrap()
    ///     .limit(10);
    /// assert_eq!(query.filters().len(), 1);
    /// ```
    pub fn where_op(self, property: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self> {
        let op = op.parse()?;
        Ok(self.filter(property, op, value))
    }

    /// Restrict results to descendants of `key`
    pub fn ancestor(self, key: Key) -> Self {
        self.filter("__key__", FilterOp::HasAncestor, key)
    }

    /// Sort ascending by a property
    pub fn order(self, property: impl Into<String>) -> Self {
        self.order_by(property, Direction::Ascending)
    }

    /// Sort descending by a property
    pub fn order_desc(self, property: impl Into<String>) -> Self {
        self.order_by(property, Direction::Descending)
    }

    pub fn order_by(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(PropertyOrder {
            property: property.into(),
            direction,
        });
        self
    }

    /// Project only the named properties
    pub fn select<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection.extend(properties.into_iter().map(Into::into));
        self
    }

    /// Keep at most one result per distinct combination of these properties
    pub fn distinct_on<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct_on.extend(properties.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    /// Start returning results at `cursor`
    pub fn start(mut self, cursor: Cursor) -> Self {
        self.start_cursor = Some(cursor);
        self
    }

    /// Stop returning results at `cursor`
    pub fn end(mut self, cursor: Cursor) -> Self {
        self.end_cursor = Some(cursor);
        self
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn filters(&self) -> &[PropertyFilter] {
        &self.filters
    }

    pub fn orders(&self) -> &[PropertyOrder] {
        &self.orders
    }

    pub fn projection(&self) -> &[String] {
        &self.projection
    }

    pub fn distinct_on_properties(&self) -> &[String] {
        &self.distinct_on
    }

    pub fn limit_value(&self) -> Option<i32> {
        self.limit
    }

    pub fn offset_value(&self) -> i32 {
        self.offset
    }

    pub fn start_cursor(&self) -> Option<&Cursor> {
        self.start_cursor.as_ref()
    }

    pub fn end_cursor(&self) -> Option<&Cursor> {
        self.end_cursor.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .kind("Task")
            .filter("done", FilterOp::Equal, false)
            .order_desc("priority")
            .select(["title", "priority"])
            .limit(5)
            .offset(2);

        assert_eq!(query.kinds(), ["Task".to_string()]);
        assert_eq!(query.filters()[0].value, Value::Boolean(false));
        assert_eq!(query.orders()[0].direction, Direction::Descending);
        assert_eq!(query.projection().len(), 2);
        assert_eq!(query.limit_value(), Some(5));
        assert_eq!(query.offset_value(), 2);
    }

    #[test]
    fn test_multiple_kinds_are_kept() {
        let query = Query::new().kind("Task").kind("Note").kind("Task");
        assert_eq!(query.kinds().len(), 3);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let base = Query::new().kind("Task");
        let snapshot = base.clone();
        let extended = base.limit(10).kind("Note");

        assert_eq!(snapshot.kinds().len(), 1);
        assert_eq!(snapshot.limit_value(), None);
        assert_eq!(extended.kinds().len(), 2);
    }

    #[test]
    fn test_filter_operator_parsing() {
        assert_eq!("=".parse::<FilterOp>().unwrap(), FilterOp::Equal);
        assert_eq!(">=".parse::<FilterOp>().unwrap(), FilterOp::GreaterThanOrEqual);
        assert_eq!("lt".parse::<FilterOp>().unwrap(), FilterOp::LessThan);
        assert_eq!("~".parse::<FilterOp>().unwrap(), FilterOp::HasAncestor);

        let err = Query::new().where_op("a", "!=", 1i64).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_ancestor_filter() {
        let parent = Key::with_name("TaskList", "default");
        let query = Query::new().kind("Task").ancestor(parent.clone());
        let filter = &query.filters()[0];
        assert_eq!(filter.property, "__key__");
        assert_eq!(filter.op, FilterOp::HasAncestor);
        assert_eq!(filter.value, Value::Key(parent));
    }
}
