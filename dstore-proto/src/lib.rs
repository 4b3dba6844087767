//! Wire messages for the dstore RPC service.
//!
//! Field numbers follow the Cloud Datastore v1 protocol so the messages can be
//! exchanged with any compatible endpoint. The messages are declared with
//! `prost` derives directly; there is no build-time code generation.

use std::collections::HashMap;

// ============================================================================
// Keys
// ============================================================================

/// Partition a key or query is scoped to
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartitionId {
    #[prost(string, tag = "2")]
    pub project_id: String,
    #[prost(string, tag = "4")]
    pub namespace_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Key {
    #[prost(message, optional, tag = "1")]
    pub partition_id: Option<PartitionId>,
    #[prost(message, repeated, tag = "2")]
    pub path: Vec<key::PathElement>,
}

pub mod key {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PathElement {
        #[prost(string, tag = "1")]
        pub kind: String,
        #[prost(oneof = "path_element::IdType", tags = "2, 3")]
        pub id_type: Option<path_element::IdType>,
    }

    pub mod path_element {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum IdType {
            #[prost(int64, tag = "2")]
            Id(i64),
            #[prost(string, tag = "3")]
            Name(String),
        }
    }
}

// ============================================================================
// Values and entities
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NullValue {
    NullValue = 0,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LatLng {
    #[prost(double, tag = "1")]
    pub latitude: f64,
    #[prost(double, tag = "2")]
    pub longitude: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArrayValue {
    #[prost(message, repeated, tag = "1")]
    pub values: Vec<Value>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Value {
    #[prost(int32, tag = "14")]
    pub meaning: i32,
    #[prost(bool, tag = "19")]
    pub exclude_from_indexes: bool,
    #[prost(
        oneof = "value::ValueType",
        tags = "11, 1, 2, 3, 10, 5, 17, 18, 8, 6, 9"
    )]
    pub value_type: Option<value::ValueType>,
}

pub mod value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ValueType {
        #[prost(enumeration = "super::NullValue", tag = "11")]
        NullValue(i32),
        #[prost(bool, tag = "1")]
        BooleanValue(bool),
        #[prost(int64, tag = "2")]
        IntegerValue(i64),
        #[prost(double, tag = "3")]
        DoubleValue(f64),
        #[prost(message, tag = "10")]
        TimestampValue(super::Timestamp),
        #[prost(message, tag = "5")]
        KeyValue(super::Key),
        #[prost(string, tag = "17")]
        StringValue(String),
        #[prost(bytes, tag = "18")]
        BlobValue(Vec<u8>),
        #[prost(message, tag = "8")]
        GeoPointValue(super::LatLng),
        #[prost(message, tag = "6")]
        EntityValue(super::Entity),
        #[prost(message, tag = "9")]
        ArrayValue(super::ArrayValue),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Entity {
    #[prost(message, optional, tag = "1")]
    pub key: Option<Key>,
    #[prost(map = "string, message", tag = "3")]
    pub properties: HashMap<String, Value>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EntityResult {
    #[prost(message, optional, tag = "1")]
    pub entity: Option<Entity>,
    #[prost(int64, tag = "4")]
    pub version: i64,
    #[prost(bytes, tag = "3")]
    pub cursor: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ResultType {
    Unspecified = 0,
    Full = 1,
    Projection = 2,
    KeyOnly = 3,
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KindExpression {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyReference {
    #[prost(string, tag = "2")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Projection {
    #[prost(message, optional, tag = "1")]
    pub property: Option<PropertyReference>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Direction {
    Unspecified = 0,
    Ascending = 1,
    Descending = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyOrder {
    #[prost(message, optional, tag = "1")]
    pub property: Option<PropertyReference>,
    #[prost(enumeration = "Direction", tag = "2")]
    pub direction: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PropertyOperator {
    Unspecified = 0,
    LessThan = 1,
    LessThanOrEqual = 2,
    GreaterThan = 3,
    GreaterThanOrEqual = 4,
    Equal = 5,
    HasAncestor = 11,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropertyFilter {
    #[prost(message, optional, tag = "1")]
    pub property: Option<PropertyReference>,
    #[prost(enumeration = "PropertyOperator", tag = "2")]
    pub op: i32,
    #[prost(message, optional, tag = "3")]
    pub value: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CompositeOperator {
    Unspecified = 0,
    And = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompositeFilter {
    #[prost(enumeration = "CompositeOperator", tag = "1")]
    pub op: i32,
    #[prost(message, repeated, tag = "2")]
    pub filters: Vec<Filter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Filter {
    #[prost(oneof = "filter::FilterType", tags = "1, 2")]
    pub filter_type: Option<filter::FilterType>,
}

pub mod filter {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum FilterType {
        #[prost(message, tag = "1")]
        CompositeFilter(super::CompositeFilter),
        #[prost(message, tag = "2")]
        PropertyFilter(super::PropertyFilter),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(message, repeated, tag = "2")]
    pub projection: Vec<Projection>,
    #[prost(message, repeated, tag = "3")]
    pub kind: Vec<KindExpression>,
    #[prost(message, optional, tag = "4")]
    pub filter: Option<Filter>,
    #[prost(message, repeated, tag = "5")]
    pub order: Vec<PropertyOrder>,
    #[prost(message, repeated, tag = "6")]
    pub distinct_on: Vec<PropertyReference>,
    #[prost(bytes, tag = "7")]
    pub start_cursor: Vec<u8>,
    #[prost(bytes, tag = "8")]
    pub end_cursor: Vec<u8>,
    #[prost(int32, tag = "10")]
    pub offset: i32,
    #[prost(int32, optional, tag = "12")]
    pub limit: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GqlQueryParameter {
    #[prost(oneof = "gql_query_parameter::ParameterType", tags = "2, 3")]
    pub parameter_type: Option<gql_query_parameter::ParameterType>,
}

pub mod gql_query_parameter {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ParameterType {
        #[prost(message, tag = "2")]
        Value(super::Value),
        #[prost(bytes, tag = "3")]
        Cursor(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GqlQuery {
    #[prost(string, tag = "1")]
    pub query_string: String,
    #[prost(bool, tag = "2")]
    pub allow_literals: bool,
    #[prost(map = "string, message", tag = "5")]
    pub named_bindings: HashMap<String, GqlQueryParameter>,
    #[prost(message, repeated, tag = "4")]
    pub positional_bindings: Vec<GqlQueryParameter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MoreResultsType {
    Unspecified = 0,
    NotFinished = 1,
    MoreResultsAfterLimit = 2,
    MoreResultsAfterCursor = 4,
    NoMoreResults = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResultBatch {
    #[prost(int32, tag = "6")]
    pub skipped_results: i32,
    #[prost(bytes, tag = "3")]
    pub skipped_cursor: Vec<u8>,
    #[prost(enumeration = "ResultType", tag = "1")]
    pub entity_result_type: i32,
    #[prost(message, repeated, tag = "2")]
    pub entity_results: Vec<EntityResult>,
    #[prost(bytes, tag = "4")]
    pub end_cursor: Vec<u8>,
    #[prost(enumeration = "MoreResultsType", tag = "5")]
    pub more_results: i32,
}

// ============================================================================
// Reads
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ReadConsistency {
    Unspecified = 0,
    Strong = 1,
    Eventual = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadOptions {
    #[prost(oneof = "read_options::ConsistencyType", tags = "1, 2")]
    pub consistency_type: Option<read_options::ConsistencyType>,
}

pub mod read_options {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ConsistencyType {
        #[prost(enumeration = "super::ReadConsistency", tag = "1")]
        ReadConsistency(i32),
        #[prost(bytes, tag = "2")]
        Transaction(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupRequest {
    #[prost(string, tag = "8")]
    pub project_id: String,
    #[prost(message, optional, tag = "1")]
    pub read_options: Option<ReadOptions>,
    #[prost(message, repeated, tag = "3")]
    pub keys: Vec<Key>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupResponse {
    #[prost(message, repeated, tag = "1")]
    pub found: Vec<EntityResult>,
    #[prost(message, repeated, tag = "2")]
    pub missing: Vec<EntityResult>,
    #[prost(message, repeated, tag = "3")]
    pub deferred: Vec<Key>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunQueryRequest {
    #[prost(string, tag = "8")]
    pub project_id: String,
    #[prost(message, optional, tag = "2")]
    pub partition_id: Option<PartitionId>,
    #[prost(message, optional, tag = "1")]
    pub read_options: Option<ReadOptions>,
    #[prost(oneof = "run_query_request::QueryType", tags = "3, 7")]
    pub query_type: Option<run_query_request::QueryType>,
}

pub mod run_query_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum QueryType {
        #[prost(message, tag = "3")]
        Query(super::Query),
        #[prost(message, tag = "7")]
        GqlQuery(super::GqlQuery),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunQueryResponse {
    #[prost(message, optional, tag = "1")]
    pub batch: Option<QueryResultBatch>,
    /// The structured query that was run; echoed back for GQL requests
    #[prost(message, optional, tag = "2")]
    pub query: Option<Query>,
}

// ============================================================================
// Writes and transactions
// ============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginTransactionRequest {
    #[prost(string, tag = "8")]
    pub project_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginTransactionResponse {
    #[prost(bytes, tag = "1")]
    pub transaction: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackRequest {
    #[prost(string, tag = "8")]
    pub project_id: String,
    #[prost(bytes, tag = "1")]
    pub transaction: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackResponse {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CommitMode {
    Unspecified = 0,
    Transactional = 1,
    NonTransactional = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Mutation {
    #[prost(oneof = "mutation::Operation", tags = "4, 5, 6, 7")]
    pub operation: Option<mutation::Operation>,
}

pub mod mutation {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Operation {
        #[prost(message, tag = "4")]
        Insert(super::Entity),
        #[prost(message, tag = "5")]
        Update(super::Entity),
        #[prost(message, tag = "6")]
        Upsert(super::Entity),
        #[prost(message, tag = "7")]
        Delete(super::Key),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MutationResult {
    /// Set only when the mutation completed an incomplete key
    #[prost(message, optional, tag = "3")]
    pub key: Option<Key>,
    #[prost(int64, tag = "4")]
    pub version: i64,
    #[prost(bool, tag = "5")]
    pub conflict_detected: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitRequest {
    #[prost(string, tag = "8")]
    pub project_id: String,
    #[prost(enumeration = "CommitMode", tag = "5")]
    pub mode: i32,
    #[prost(oneof = "commit_request::TransactionSelector", tags = "1")]
    pub transaction_selector: Option<commit_request::TransactionSelector>,
    #[prost(message, repeated, tag = "6")]
    pub mutations: Vec<Mutation>,
}

pub mod commit_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum TransactionSelector {
        #[prost(bytes, tag = "1")]
        Transaction(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitResponse {
    #[prost(message, repeated, tag = "3")]
    pub mutation_results: Vec<MutationResult>,
    #[prost(int32, tag = "4")]
    pub index_updates: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AllocateIdsRequest {
    #[prost(string, tag = "8")]
    pub project_id: String,
    #[prost(message, repeated, tag = "1")]
    pub keys: Vec<Key>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AllocateIdsResponse {
    #[prost(message, repeated, tag = "1")]
    pub keys: Vec<Key>,
}
