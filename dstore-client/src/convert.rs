/// Type conversions between wire messages and dstore model types
///
/// Due to Rust's orphan rules, we use conversion functions instead of
/// trait implementations.

use crate::error::{ClientError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dstore_core::{
    Cursor, Direction, Entity, FilterOp, GeoPoint, GqlBinding, GqlQuery, Key, KeyId, PathElement,
    PropertyFilter, Query, ReadConsistency, Value,
};
use dstore_proto::{self as proto, key::path_element::IdType, value::ValueType};
use std::collections::HashMap;

// ============================================================================
// Key Conversions
// ============================================================================

/// Convert a model key to its wire form
pub fn key_to_proto(key: &Key) -> proto::Key {
    let partition_id = match (key.project(), key.namespace()) {
        (None, None) => None,
        (project, namespace) => Some(proto::PartitionId {
            project_id: project.unwrap_or_default().to_string(),
            namespace_id: namespace.unwrap_or_default().to_string(),
        }),
    };

    proto::Key {
        partition_id,
        path: key.path().iter().map(path_element_to_proto).collect(),
    }
}

fn path_element_to_proto(element: &PathElement) -> proto::key::PathElement {
    proto::key::PathElement {
        kind: element.kind.clone(),
        id_type: element.id.as_ref().map(|id| match id {
            KeyId::Id(id) => IdType::Id(*id),
            KeyId::Name(name) => IdType::Name(name.clone()),
        }),
    }
}

/// Convert a wire key returned by the service to a model key
pub fn proto_key_to_key(key: proto::Key) -> Result<Key> {
    let path = key.path.into_iter().map(|element| PathElement {
        kind: element.kind,
        id: element.id_type.map(|id| match id {
            IdType::Id(id) => KeyId::Id(id),
            IdType::Name(name) => KeyId::Name(name),
        }),
    });

    let mut model = Key::from_path(path)
        .map_err(|e| ClientError::Protocol(format!("service returned an invalid key: {}", e)))?;

    if let Some(partition) = key.partition_id {
        if !partition.project_id.is_empty() {
            model = model.with_project(partition.project_id);
        }
        if !partition.namespace_id.is_empty() {
            model = model.with_namespace(partition.namespace_id);
        }
    }

    Ok(model)
}

/// Partition for a project and optional namespace
pub fn partition_id(project_id: &str, namespace: Option<&str>) -> proto::PartitionId {
    proto::PartitionId {
        project_id: project_id.to_string(),
        namespace_id: namespace.unwrap_or_default().to_string(),
    }
}

// ============================================================================
// Value Conversions
// ============================================================================

/// Convert a model value to its wire form
pub fn value_to_proto(value: &Value, exclude_from_indexes: bool) -> proto::Value {
    let value_type = match value {
        Value::Null => ValueType::NullValue(proto::NullValue::NullValue as i32),
        Value::Boolean(b) => ValueType::BooleanValue(*b),
        Value::Integer(i) => ValueType::IntegerValue(*i),
        Value::Double(d) => ValueType::DoubleValue(*d),
        Value::Timestamp(ts) => ValueType::TimestampValue(proto::Timestamp {
            seconds: ts.timestamp(),
            nanos: ts.timestamp_subsec_nanos() as i32,
        }),
        Value::String(s) => ValueType::StringValue(s.clone()),
        Value::Blob(b) => ValueType::BlobValue(b.to_vec()),
        Value::Key(key) => ValueType::KeyValue(key_to_proto(key)),
        Value::GeoPoint(point) => ValueType::GeoPointValue(proto::LatLng {
            latitude: point.latitude,
            longitude: point.longitude,
        }),
        Value::Entity(entity) => ValueType::EntityValue(entity_to_proto(entity)),
        Value::Array(values) => ValueType::ArrayValue(proto::ArrayValue {
            values: values.iter().map(|v| value_to_proto(v, false)).collect(),
        }),
    };

    proto::Value {
        meaning: 0,
        exclude_from_indexes,
        value_type: Some(value_type),
    }
}

/// Convert a wire value to a model value
pub fn proto_value_to_value(value: proto::Value) -> Result<Value> {
    let Some(value_type) = value.value_type else {
        return Ok(Value::Null);
    };

    match value_type {
        ValueType::NullValue(_) => Ok(Value::Null),
        ValueType::BooleanValue(b) => Ok(Value::Boolean(b)),
        ValueType::IntegerValue(i) => Ok(Value::Integer(i)),
        ValueType::DoubleValue(d) => Ok(Value::Double(d)),
        ValueType::TimestampValue(ts) => proto_timestamp_to_datetime(ts).map(Value::Timestamp),
        ValueType::StringValue(s) => Ok(Value::String(s)),
        ValueType::BlobValue(b) => Ok(Value::Blob(Bytes::from(b))),
        ValueType::KeyValue(key) => proto_key_to_key(key).map(Value::Key),
        ValueType::GeoPointValue(point) => {
            Ok(Value::GeoPoint(GeoPoint::new(point.latitude, point.longitude)))
        }
        ValueType::EntityValue(entity) => proto_entity_to_entity(entity).map(Value::Entity),
        ValueType::ArrayValue(array) => {
            let values: Result<Vec<Value>> =
                array.values.into_iter().map(proto_value_to_value).collect();
            Ok(Value::Array(values?))
        }
    }
}

fn proto_timestamp_to_datetime(ts: proto::Timestamp) -> Result<DateTime<Utc>> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::<Utc>::from_timestamp(ts.seconds, nanos))
        .ok_or_else(|| {
            ClientError::Protocol(format!(
                "timestamp out of range: {}s {}ns",
                ts.seconds, ts.nanos
            ))
        })
}

// ============================================================================
// Entity Conversions
// ============================================================================

/// Convert a model entity to its wire form.
///
/// Embedded entities built with an empty kind are sent without a key.
pub fn entity_to_proto(entity: &Entity) -> proto::Entity {
    let key = entity.key();
    let has_key = !(key.kind().is_empty() && key.ancestors().is_empty());

    let properties: HashMap<String, proto::Value> = entity
        .properties()
        .iter()
        .map(|(name, value)| {
            let excluded = entity.is_excluded_from_indexes(name);
            (name.clone(), value_to_proto(value, excluded))
        })
        .collect();

    proto::Entity {
        key: has_key.then(|| key_to_proto(key)),
        properties,
    }
}

/// Convert a wire entity to a model entity
pub fn proto_entity_to_entity(entity: proto::Entity) -> Result<Entity> {
    let key = match entity.key {
        Some(key) => proto_key_to_key(key)?,
        None => Key::new(String::new()),
    };

    let mut model = Entity::new(key);
    for (name, value) in entity.properties {
        if value.exclude_from_indexes {
            model.exclude_from_indexes(name.clone());
        }
        model.set(name, proto_value_to_value(value)?);
    }
    Ok(model)
}

/// Convert a found/missing entity result, which must carry an entity with a key
pub fn proto_entity_result_to_entity(result: proto::EntityResult) -> Result<Entity> {
    let entity = result
        .entity
        .ok_or_else(|| ClientError::Protocol("entity result without an entity".to_string()))?;
    if entity.key.is_none() {
        return Err(ClientError::Protocol("entity result without a key".to_string()));
    }
    proto_entity_to_entity(entity)
}

// ============================================================================
// Query Conversions
// ============================================================================

/// Snapshot a structured query into its wire form
pub fn query_to_proto(query: &Query) -> proto::Query {
    proto::Query {
        projection: query
            .projection()
            .iter()
            .map(|name| proto::Projection {
                property: Some(property_reference(name)),
            })
            .collect(),
        kind: query
            .kinds()
            .iter()
            .map(|name| proto::KindExpression { name: name.clone() })
            .collect(),
        filter: filters_to_proto(query.filters()),
        order: query
            .orders()
            .iter()
            .map(|order| proto::PropertyOrder {
                property: Some(property_reference(&order.property)),
                direction: direction_to_proto(order.direction) as i32,
            })
            .collect(),
        distinct_on: query
            .distinct_on_properties()
            .iter()
            .map(|name| property_reference(name))
            .collect(),
        start_cursor: cursor_bytes(query.start_cursor()),
        end_cursor: cursor_bytes(query.end_cursor()),
        offset: query.offset_value(),
        limit: query.limit_value(),
    }
}

fn property_reference(name: &str) -> proto::PropertyReference {
    proto::PropertyReference {
        name: name.to_string(),
    }
}

fn cursor_bytes(cursor: Option<&Cursor>) -> Vec<u8> {
    cursor.map(|c| c.as_bytes().to_vec()).unwrap_or_default()
}

fn direction_to_proto(direction: Direction) -> proto::Direction {
    match direction {
        Direction::Ascending => proto::Direction::Ascending,
        Direction::Descending => proto::Direction::Descending,
    }
}

fn filter_op_to_proto(op: FilterOp) -> proto::PropertyOperator {
    match op {
        FilterOp::LessThan => proto::PropertyOperator::LessThan,
        FilterOp::LessThanOrEqual => proto::PropertyOperator::LessThanOrEqual,
        FilterOp::GreaterThan => proto::PropertyOperator::GreaterThan,
        FilterOp::GreaterThanOrEqual => proto::PropertyOperator::GreaterThanOrEqual,
        FilterOp::Equal => proto::PropertyOperator::Equal,
        FilterOp::HasAncestor => proto::PropertyOperator::HasAncestor,
    }
}

fn property_filter_to_proto(filter: &PropertyFilter) -> proto::Filter {
    proto::Filter {
        filter_type: Some(proto::filter::FilterType::PropertyFilter(proto::PropertyFilter {
            property: Some(property_reference(&filter.property)),
            op: filter_op_to_proto(filter.op) as i32,
            value: Some(value_to_proto(&filter.value, false)),
        })),
    }
}

/// A single filter is sent as-is; several are combined with AND
fn filters_to_proto(filters: &[PropertyFilter]) -> Option<proto::Filter> {
    match filters {
        [] => None,
        [single] => Some(property_filter_to_proto(single)),
        many => Some(proto::Filter {
            filter_type: Some(proto::filter::FilterType::CompositeFilter(
                proto::CompositeFilter {
                    op: proto::CompositeOperator::And as i32,
                    filters: many.iter().map(property_filter_to_proto).collect(),
                },
            )),
        }),
    }
}

/// Snapshot a GQL query into its wire form
pub fn gql_to_proto(gql: &GqlQuery) -> proto::GqlQuery {
    proto::GqlQuery {
        query_string: gql.query_string().to_string(),
        allow_literals: gql.literals_allowed(),
        named_bindings: gql
            .named_bindings()
            .iter()
            .map(|(name, binding)| (name.clone(), gql_binding_to_proto(binding)))
            .collect(),
        positional_bindings: gql
            .positional_bindings()
            .iter()
            .map(gql_binding_to_proto)
            .collect(),
    }
}

fn gql_binding_to_proto(binding: &GqlBinding) -> proto::GqlQueryParameter {
    let parameter = match binding {
        GqlBinding::Value(value) => {
            proto::gql_query_parameter::ParameterType::Value(value_to_proto(value, false))
        }
        GqlBinding::Cursor(cursor) => {
            proto::gql_query_parameter::ParameterType::Cursor(cursor.as_bytes().to_vec())
        }
    };
    proto::GqlQueryParameter {
        parameter_type: Some(parameter),
    }
}

// ============================================================================
// Read Options
// ============================================================================

/// Read options selecting a consistency level
pub fn consistency_read_options(consistency: Option<ReadConsistency>) -> Option<proto::ReadOptions> {
    consistency.map(|consistency| {
        let wire = match consistency {
            ReadConsistency::Eventual => proto::ReadConsistency::Eventual,
            ReadConsistency::Strong => proto::ReadConsistency::Strong,
        };
        proto::ReadOptions {
            consistency_type: Some(proto::read_options::ConsistencyType::ReadConsistency(
                wire as i32,
            )),
        }
    })
}

/// Read options reading inside a transaction
pub fn transaction_read_options(transaction: &Bytes) -> proto::ReadOptions {
    proto::ReadOptions {
        consistency_type: Some(proto::read_options::ConsistencyType::Transaction(
            transaction.to_vec(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_key_round_trip_keeps_path_and_scope() {
        let key = Key::from_path([
            PathElement::new("OtherThing", "root"),
            PathElement::new("ThatThing", 6789),
            PathElement::new("ThisThing", 1234),
        ])
        .unwrap()
        .with_project("custom-ds")
        .with_namespace("custom-ns");

        let wire = key_to_proto(&key);
        assert_eq!(wire.path.len(), 3);
        assert_eq!(wire.partition_id.as_ref().unwrap().namespace_id, "custom-ns");
        assert_eq!(proto_key_to_key(wire).unwrap(), key);
    }

    #[test]
    fn test_incomplete_key_has_no_id() {
        let wire = key_to_proto(&Key::new("ds-test"));
        assert!(wire.partition_id.is_none());
        assert!(wire.path[0].id_type.is_none());
    }

    #[test]
    fn test_empty_wire_key_is_protocol_error() {
        let err = proto_key_to_key(proto::Key::default()).unwrap_err();
        assert_eq!(err.code(), "PROTOCOL_VIOLATION");
    }

    #[test]
    fn test_entity_conversion_keeps_index_exclusions() {
        let mut entity = Entity::new(Key::with_name("Doc", "readme").with_project("p"))
            .with("title", "Hello")
            .with("body", "long text")
            .with("published", Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
            .with("tags", vec!["a", "b"])
            .with("nested", Entity::new(Key::new(String::new())).with("n", 1i64));
        entity.exclude_from_indexes("body");

        let wire = entity_to_proto(&entity);
        assert!(wire.properties["body"].exclude_from_indexes);
        assert!(!wire.properties["title"].exclude_from_indexes);
        match &wire.properties["nested"].value_type {
            Some(ValueType::EntityValue(nested)) => assert!(nested.key.is_none()),
            other => panic!("unexpected nested value {:?}", other),
        }

        let back = proto_entity_to_entity(wire).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_missing_value_type_decodes_as_null() {
        assert_eq!(proto_value_to_value(proto::Value::default()).unwrap(), Value::Null);
    }

    #[test]
    fn test_query_snapshot() {
        let cursor = Cursor::from_bytes(&b"start-here"[..]);
        let query = Query::new()
            .kind("Task")
            .filter("done", FilterOp::Equal, false)
            .filter("priority", FilterOp::GreaterThanOrEqual, 4i64)
            .order_desc("priority")
            .distinct_on(["owner"])
            .start(cursor)
            .limit(10);

        let wire = query_to_proto(&query);
        assert_eq!(wire.kind[0].name, "Task");
        assert_eq!(wire.start_cursor, b"start-here".to_vec());
        assert_eq!(wire.limit, Some(10));
        assert_eq!(wire.order[0].direction(), proto::Direction::Descending);
        match wire.filter.and_then(|f| f.filter_type) {
            Some(proto::filter::FilterType::CompositeFilter(composite)) => {
                assert_eq!(composite.op(), proto::CompositeOperator::And);
                assert_eq!(composite.filters.len(), 2);
            }
            other => panic!("expected composite filter, got {:?}", other),
        }
    }

    #[test]
    fn test_single_filter_is_not_wrapped() {
        let wire = query_to_proto(&Query::new().kind("Task").filter("done", FilterOp::Equal, true));
        assert!(matches!(
            wire.filter.and_then(|f| f.filter_type),
            Some(proto::filter::FilterType::PropertyFilter(_))
        ));
    }

    #[test]
    fn test_gql_snapshot() {
        let gql = GqlQuery::new("SELECT * FROM Task WHERE done = @done")
            .bind("done", false)
            .bind_positional_cursor(Cursor::from_bytes(&b"c"[..]));
        let wire = gql_to_proto(&gql);
        assert_eq!(wire.query_string, "SELECT * FROM Task WHERE done = @done");
        assert!(wire.named_bindings.contains_key("done"));
        assert_eq!(wire.positional_bindings.len(), 1);
    }

    #[test]
    fn test_read_options() {
        assert!(consistency_read_options(None).is_none());
        let options = consistency_read_options(Some(ReadConsistency::Eventual)).unwrap();
        assert_eq!(
            options.consistency_type,
            Some(proto::read_options::ConsistencyType::ReadConsistency(
                proto::ReadConsistency::Eventual as i32
            ))
        );
    }
}
