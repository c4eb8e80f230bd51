//! Top-level graph provider
//!
//! [`GraphProvider`] is the entry point for graph operations over one
//! relational source: ordered fetch with cardinality counts, relationship
//! expansion (plain and aggregated), batch load-by-id, and raw select
//! passthrough. Every call re-derives the schema mapper from the live
//! source, opens a query engine, and releases the connection before
//! returning, on error paths included.

pub mod errors;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DataSourceInfo;
use crate::database_schema::{CanonicalRelationship, Entity, SchemaIntrospector};
use crate::fetcher::records::parse_node_id;
use crate::fetcher::{DataFetcher, GraphRecordSet};
use crate::graph_model::{AggregatorEdge, DefaultNameResolver, NameResolver, SchemaMapper};
use crate::query_engine::sql::extract_table_name;
use crate::query_engine::{
    CountCursor, CountedRowSource, QueryEngine, RelationalClient, Row, RowCursor, SqlValue,
};

pub use errors::ProviderError;

/// Which way to walk an edge type from the given root records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandDirection {
    Out,
    In,
    Both,
}

impl ExpandDirection {
    fn wants_out(self) -> bool {
        matches!(self, ExpandDirection::Out | ExpandDirection::Both)
    }

    fn wants_in(self) -> bool {
        matches!(self, ExpandDirection::In | ExpandDirection::Both)
    }
}

pub struct GraphProvider {
    introspector: Arc<dyn SchemaIntrospector>,
    client: Arc<dyn RelationalClient>,
    datasource: DataSourceInfo,
    resolver: Arc<dyn NameResolver>,
}

impl GraphProvider {
    pub fn new(
        introspector: Arc<dyn SchemaIntrospector>,
        client: Arc<dyn RelationalClient>,
        datasource: DataSourceInfo,
    ) -> Self {
        GraphProvider {
            introspector,
            client,
            datasource,
            resolver: Arc::new(DefaultNameResolver),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Derive the current schema mapper from the live source. Nothing is
    /// cached across calls; schema changes are picked up on the next one.
    pub async fn schema_mapper(&self) -> Result<SchemaMapper, ProviderError> {
        SchemaMapper::build(
            self.introspector.as_ref(),
            &self.datasource,
            self.resolver.as_ref(),
        )
        .await
        .map_err(Into::into)
    }

    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.client.ping().await.map_err(Into::into)
    }

    /// Ordered scan of one table's rows as node records, each annotated
    /// with its `@out`/`@in` joinable-record counts. The query text names
    /// the table; `limit` of 0 means no cap.
    pub async fn fetch(
        &self,
        query_text: &str,
        limit: usize,
    ) -> Result<GraphRecordSet, ProviderError> {
        let mapper = self.schema_mapper().await?;
        let table = extract_table_name(query_text)?;
        let entity = mapper.schema.entity_ignore_case(&table).ok_or_else(|| {
            ProviderError::UnknownTable {
                table: table.clone(),
            }
        })?;
        if self.datasource.aggregation_enabled {
            if let Some(aggregator) = mapper.model.aggregator_for_table(&entity.name) {
                return Err(ProviderError::AggregatedTable {
                    table: entity.name.clone(),
                    edge_type: aggregator.edge_type.clone(),
                });
            }
        }

        let engine = QueryEngine::new(self.client.as_ref(), self.datasource.dialect);
        let result = self
            .fetch_inner(&engine, &mapper, entity, query_text, limit)
            .await;
        finish(&engine, result).await
    }

    async fn fetch_inner(
        &self,
        engine: &QueryEngine<'_>,
        mapper: &SchemaMapper,
        entity: &Entity,
        query_text: &str,
        limit: usize,
    ) -> Result<GraphRecordSet, ProviderError> {
        let fetcher = DataFetcher::new(mapper);
        let order: Vec<String> = fetcher
            .key_attributes(entity)
            .iter()
            .map(|a| a.name.clone())
            .collect();

        let primary = engine.ordered_scan(query_text, &order, limit).await?;
        let (out_cursors, in_cursors) =
            self.build_count_cursors(engine, mapper, entity, None).await;
        let mut source = CountedRowSource::new(primary, out_cursors, in_cursors);
        let mapped = fetcher.map_result_set(&mut source, entity).await;
        let close = source.close().await;
        let records = mapped?;
        close?;
        Ok(records)
    }

    /// Expand an edge type from the given root node records. Returns the
    /// reached node records (with their own cardinality counts) plus the
    /// edge records connecting them to the roots.
    pub async fn expand(
        &self,
        node_ids: &[String],
        edge_name: &str,
        direction: ExpandDirection,
        limit: usize,
    ) -> Result<GraphRecordSet, ProviderError> {
        if node_ids.is_empty() {
            return Ok(GraphRecordSet::new());
        }
        let mapper = self.schema_mapper().await?;
        let (root, parsed) = resolve_root(&mapper, node_ids)?;

        let engine = QueryEngine::new(self.client.as_ref(), self.datasource.dialect);
        let result = self
            .expand_inner(&engine, &mapper, root, &parsed, edge_name, direction, limit)
            .await;
        finish(&engine, result).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn expand_inner(
        &self,
        engine: &QueryEngine<'_>,
        mapper: &SchemaMapper,
        root: &Entity,
        parsed: &[Vec<String>],
        edge_name: &str,
        direction: ExpandDirection,
        limit: usize,
    ) -> Result<GraphRecordSet, ProviderError> {
        let fetcher = DataFetcher::new(mapper);
        if let Some(aggregator) = mapper.model.aggregator_for_edge(edge_name) {
            return self
                .expand_aggregated(engine, mapper, &fetcher, root, parsed, aggregator, direction, limit)
                .await;
        }

        let relationships = mapper.model.relationships_for_edge(edge_name);
        if relationships.is_empty() {
            return Err(ProviderError::UnknownEdge {
                edge: edge_name.to_string(),
            });
        }
        let root_keys: Vec<String> = fetcher
            .key_attributes(root)
            .iter()
            .map(|a| a.name.clone())
            .collect();

        let mut records = GraphRecordSet::new();
        for relationship in relationships {
            if direction.wants_out() && relationship.foreign_entity == root.name {
                records.merge(
                    self.expand_outgoing(
                        engine, mapper, &fetcher, root, &root_keys, parsed, relationship,
                        edge_name, limit,
                    )
                    .await?,
                );
            }
            if direction.wants_in() && relationship.parent_entity == root.name {
                records.merge(
                    self.expand_incoming(
                        engine, mapper, &fetcher, root, &root_keys, parsed, relationship,
                        edge_name, limit,
                    )
                    .await?,
                );
            }
        }
        Ok(records)
    }

    /// Root holds the foreign key; the entered rows are on the referenced
    /// side and are reached through a join that also selects the root's
    /// key columns for edge-source ids.
    #[allow(clippy::too_many_arguments)]
    async fn expand_outgoing(
        &self,
        engine: &QueryEngine<'_>,
        mapper: &SchemaMapper,
        fetcher: &DataFetcher<'_>,
        root: &Entity,
        root_keys: &[String],
        parsed: &[Vec<String>],
        relationship: &CanonicalRelationship,
        edge_name: &str,
        limit: usize,
    ) -> Result<GraphRecordSet, ProviderError> {
        let Some(entering) = mapper.schema.entity(&relationship.parent_entity) else {
            return Ok(GraphRecordSet::new());
        };
        let root_ids: Vec<Vec<SqlValue>> = parsed
            .iter()
            .map(|row| row.iter().map(|v| id_sql_value(v)).collect())
            .collect();
        let entering_order: Vec<String> = fetcher
            .key_attributes(entering)
            .iter()
            .map(|a| a.name.clone())
            .collect();

        let primary = engine
            .expand_join(
                &entering.name,
                &relationship.to_columns,
                &root.name,
                &relationship.from_columns,
                root_keys,
                &root_ids,
                &entering_order,
                limit,
            )
            .await?;
        let (out_cursors, in_cursors) =
            self.build_count_cursors(engine, mapper, entering, None).await;
        let mut source = CountedRowSource::new(primary, out_cursors, in_cursors);
        let mapped = fetcher.map_result_set(&mut source, entering).await;
        let close = source.close().await;
        let mut records = mapped?;
        close?;

        // Cursors are forward-only; the edge pass re-runs the same join
        let mut cursor = engine
            .expand_join(
                &entering.name,
                &relationship.to_columns,
                &root.name,
                &relationship.from_columns,
                root_keys,
                &root_ids,
                &entering_order,
                limit,
            )
            .await?;
        let edges = fetcher
            .map_join_rows_edges(&mut cursor, entering, root, edge_name)
            .await;
        let close = cursor.close().await;
        records.merge(edges?);
        close?;
        Ok(records)
    }

    /// Root is on the referenced side; the entered rows hold the foreign
    /// key and are filtered on it directly.
    #[allow(clippy::too_many_arguments)]
    async fn expand_incoming(
        &self,
        engine: &QueryEngine<'_>,
        mapper: &SchemaMapper,
        fetcher: &DataFetcher<'_>,
        root: &Entity,
        root_keys: &[String],
        parsed: &[Vec<String>],
        relationship: &CanonicalRelationship,
        edge_name: &str,
        limit: usize,
    ) -> Result<GraphRecordSet, ProviderError> {
        let Some(entering) = mapper.schema.entity(&relationship.foreign_entity) else {
            return Ok(GraphRecordSet::new());
        };
        let Some(filter) = reorder_id_values(parsed, root_keys, &relationship.to_columns) else {
            log::warn!(
                "Cannot expand `{}` into `{}`: {} does not join on the root key",
                edge_name,
                entering.name,
                relationship
            );
            return Ok(GraphRecordSet::new());
        };
        let entering_order: Vec<String> = fetcher
            .key_attributes(entering)
            .iter()
            .map(|a| a.name.clone())
            .collect();

        let primary = engine
            .expand_direct(
                &entering.name,
                &relationship.from_columns,
                &filter,
                &entering_order,
                limit,
            )
            .await?;
        let (out_cursors, in_cursors) =
            self.build_count_cursors(engine, mapper, entering, None).await;
        let mut source = CountedRowSource::new(primary, out_cursors, in_cursors);
        let mapped = fetcher.map_result_set(&mut source, entering).await;
        let close = source.close().await;
        let mut records = mapped?;
        close?;

        let mut cursor = engine
            .expand_direct(
                &entering.name,
                &relationship.from_columns,
                &filter,
                &entering_order,
                limit,
            )
            .await?;
        let edges = fetcher
            .map_direct_rows_edges(&mut cursor, entering, relationship, root, edge_name)
            .await;
        let close = cursor.close().await;
        records.merge(edges?);
        close?;
        Ok(records)
    }

    /// Two-hop walk over an aggregated join table: hop one reads the join
    /// rows as property-carrying edge records, hop two loads the far-side
    /// node records they reference.
    #[allow(clippy::too_many_arguments)]
    async fn expand_aggregated(
        &self,
        engine: &QueryEngine<'_>,
        mapper: &SchemaMapper,
        fetcher: &DataFetcher<'_>,
        root: &Entity,
        parsed: &[Vec<String>],
        aggregator: &AggregatorEdge,
        direction: ExpandDirection,
        limit: usize,
    ) -> Result<GraphRecordSet, ProviderError> {
        let Some(join_entity) = mapper.schema.entity(&aggregator.join_table) else {
            return Ok(GraphRecordSet::new());
        };
        let (Some(first), Some(second)) = (
            join_entity.out_relationships.first(),
            join_entity.out_relationships.get(1),
        ) else {
            return Ok(GraphRecordSet::new());
        };
        let edge = mapper
            .model
            .edge_type(&aggregator.edge_type)
            .ok_or_else(|| ProviderError::UnknownEdge {
                edge: aggregator.edge_type.clone(),
            })?;
        let root_vertex = mapper.vertex_for_entity(&root.name);
        let root_keys: Vec<String> = fetcher
            .key_attributes(root)
            .iter()
            .map(|a| a.name.clone())
            .collect();

        // Relationship order fixed the edge orientation at model build:
        // the first out-relationship is the source side
        let mut orientations = Vec::new();
        if direction.wants_out() && root_vertex == Some(aggregator.from_vertex.as_str()) {
            orientations.push(true);
        }
        if direction.wants_in() && root_vertex == Some(aggregator.to_vertex.as_str()) {
            orientations.push(false);
        }

        let mut records = GraphRecordSet::new();
        for root_is_source in orientations {
            let (near, far) = if root_is_source {
                (first, second)
            } else {
                (second, first)
            };
            let (Some(near_entity), Some(far_entity)) = (
                mapper.schema.entity(&near.parent_entity),
                mapper.schema.entity(&far.parent_entity),
            ) else {
                continue;
            };
            let Some(filter) = reorder_id_values(parsed, &root_keys, &near.to_columns) else {
                log::warn!(
                    "Cannot expand aggregated edge `{}`: {} does not join on the root key",
                    edge.name,
                    near
                );
                continue;
            };
            let join_order: Vec<String> = fetcher
                .key_attributes(join_entity)
                .iter()
                .map(|a| a.name.clone())
                .collect();

            let mut cursor = engine
                .expand_direct(&join_entity.name, &near.from_columns, &filter, &join_order, limit)
                .await?;
            let mapped = fetcher
                .map_aggregator_rows(
                    &mut cursor,
                    join_entity,
                    near,
                    near_entity,
                    far,
                    far_entity,
                    edge,
                    root_is_source,
                )
                .await;
            let close = cursor.close().await;
            let (edge_records, far_values) = mapped?;
            close?;
            records.merge(edge_records);

            if !far_values.is_empty() {
                let primary = engine
                    .load(&far_entity.name, &far.to_columns, &far_values)
                    .await?;
                let (out_cursors, in_cursors) = self
                    .build_count_cursors(engine, mapper, far_entity, None)
                    .await;
                let mut source = CountedRowSource::new(primary, out_cursors, in_cursors);
                let mapped = fetcher.map_result_set(&mut source, far_entity).await;
                let close = source.close().await;
                records.merge(mapped?);
                close?;
            }
        }
        Ok(records)
    }

    /// Load exactly the given node records by id, with cardinality counts
    pub async fn load(&self, node_ids: &[String]) -> Result<GraphRecordSet, ProviderError> {
        if node_ids.is_empty() {
            return Ok(GraphRecordSet::new());
        }
        let mapper = self.schema_mapper().await?;
        let mut groups: HashMap<usize, Vec<Vec<String>>> = HashMap::new();
        for id in node_ids {
            let (position, values) = parse_node_id(id)?;
            groups.entry(position).or_default().push(values);
        }

        let engine = QueryEngine::new(self.client.as_ref(), self.datasource.dialect);
        let result = self.load_inner(&engine, &mapper, &groups).await;
        finish(&engine, result).await
    }

    async fn load_inner(
        &self,
        engine: &QueryEngine<'_>,
        mapper: &SchemaMapper,
        groups: &HashMap<usize, Vec<Vec<String>>>,
    ) -> Result<GraphRecordSet, ProviderError> {
        let fetcher = DataFetcher::new(mapper);
        let mut records = GraphRecordSet::new();
        for (&position, rows) in groups {
            let entity = mapper.schema.entity_at(position).ok_or_else(|| {
                ProviderError::invalid_record_id(
                    position.to_string(),
                    format!("no node class at schema position {}", position),
                )
            })?;
            let key_columns: Vec<String> = fetcher
                .key_attributes(entity)
                .iter()
                .map(|a| a.name.clone())
                .collect();
            for row in rows {
                if row.len() != key_columns.len() {
                    return Err(ProviderError::invalid_record_id(
                        format!("{}_{}", position, row.join("_")),
                        format!(
                            "expected {} key values, found {}",
                            key_columns.len(),
                            row.len()
                        ),
                    ));
                }
            }
            let ids: Vec<Vec<SqlValue>> = rows
                .iter()
                .map(|row| row.iter().map(|v| id_sql_value(v)).collect())
                .collect();

            let primary = engine.load(&entity.name, &key_columns, &ids).await?;
            let (out_cursors, in_cursors) = self
                .build_count_cursors(engine, mapper, entity, Some(rows))
                .await;
            let mut source = CountedRowSource::new(primary, out_cursors, in_cursors);
            let mapped = fetcher.map_result_set(&mut source, entity).await;
            let close = source.close().await;
            records.merge(mapped?);
            close?;
        }
        Ok(records)
    }

    /// Raw select passthrough for bulk-export collaborators
    pub async fn execute(&self, statement: &str) -> Result<Vec<Row>, ProviderError> {
        let engine = QueryEngine::new(self.client.as_ref(), self.datasource.dialect);
        let result = execute_inner(&engine, statement).await;
        finish(&engine, result).await
    }

    /// One count cursor per relationship touching the entity, ordered to
    /// advance in lock-step with a primary cursor ordered by the entity
    /// key. Relationships into an aggregated join table are reported
    /// under the aggregator edge's name, on the side the entity plays in
    /// it. A failing count query is logged and skipped; the record then
    /// shows a zero for that relationship.
    async fn build_count_cursors(
        &self,
        engine: &QueryEngine<'_>,
        mapper: &SchemaMapper,
        entity: &Entity,
        key_filter: Option<&[Vec<String>]>,
    ) -> (Vec<CountCursor>, Vec<CountCursor>) {
        let mut out_cursors = Vec::new();
        let mut in_cursors = Vec::new();
        let fetcher = DataFetcher::new(mapper);
        let key_columns: Vec<String> = fetcher
            .key_attributes(entity)
            .iter()
            .map(|a| a.name.clone())
            .collect();

        for relationship in entity.all_out_relationships() {
            let Some(edge_name) = mapper.model.edge_for_relationship(relationship) else {
                continue;
            };
            match engine
                .relationship_count(&relationship.parent_entity, &relationship.to_columns, None)
                .await
            {
                Ok(cursor) => out_cursors.push(CountCursor {
                    relationship_name: edge_name.to_string(),
                    cursor,
                }),
                Err(e) => log::warn!("Joinable-record count for `{}` failed: {}", edge_name, e),
            }
        }

        for relationship in &entity.in_relationships {
            let Some(foreign) = mapper.schema.entity(&relationship.foreign_entity) else {
                continue;
            };
            let filter = key_filter.and_then(|rows| {
                reorder_id_values(rows, &key_columns, &relationship.to_columns)
            });

            if self.datasource.aggregation_enabled && foreign.is_aggregable_join_table {
                let Some(aggregator) = mapper.model.aggregator_for_table(&foreign.name) else {
                    continue;
                };
                let outgoing =
                    mapper.vertex_for_entity(&entity.name) == Some(aggregator.from_vertex.as_str());
                match engine
                    .relationship_count(
                        &foreign.name,
                        &relationship.from_columns,
                        filter.as_deref(),
                    )
                    .await
                {
                    Ok(cursor) => {
                        let counted = CountCursor {
                            relationship_name: aggregator.edge_type.clone(),
                            cursor,
                        };
                        if outgoing {
                            out_cursors.push(counted);
                        } else {
                            in_cursors.push(counted);
                        }
                    }
                    Err(e) => log::warn!(
                        "Joinable-record count for `{}` failed: {}",
                        aggregator.edge_type,
                        e
                    ),
                }
                continue;
            }

            let Some(edge_name) = mapper.model.edge_for_relationship(relationship) else {
                continue;
            };
            match engine
                .relationship_count(&foreign.name, &relationship.from_columns, filter.as_deref())
                .await
            {
                Ok(cursor) => in_cursors.push(CountCursor {
                    relationship_name: edge_name.to_string(),
                    cursor,
                }),
                Err(e) => log::warn!("Joinable-record count for `{}` failed: {}", edge_name, e),
            }
        }
        (out_cursors, in_cursors)
    }
}

async fn execute_inner(
    engine: &QueryEngine<'_>,
    statement: &str,
) -> Result<Vec<Row>, ProviderError> {
    let mut cursor = engine.execute_raw(statement).await?;
    let mut rows = Vec::new();
    let drained = loop {
        match cursor.advance().await {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let close = cursor.close().await;
    drained?;
    close?;
    Ok(rows)
}

/// Release the engine's connection and fold any release failure into the
/// operation result. A release failure never masks an earlier error.
async fn finish<T>(
    engine: &QueryEngine<'_>,
    result: Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    match engine.close().await {
        Ok(()) => result,
        Err(close_error) => match result {
            Ok(_) => Err(close_error.into()),
            Err(error) => {
                log::warn!("Connection release failed after earlier error: {}", close_error);
                Err(error)
            }
        },
    }
}

/// Parse and validate the root node ids of an expand call: all ids must
/// name the same node class and carry the full key arity.
fn resolve_root<'m>(
    mapper: &'m SchemaMapper,
    node_ids: &[String],
) -> Result<(&'m Entity, Vec<Vec<String>>), ProviderError> {
    let mut parsed = Vec::with_capacity(node_ids.len());
    let mut position: Option<usize> = None;
    for id in node_ids {
        let (pos, values) = parse_node_id(id)?;
        match position {
            None => position = Some(pos),
            Some(existing) if existing == pos => {}
            Some(_) => {
                return Err(ProviderError::invalid_record_id(
                    id,
                    "record ids span multiple node classes",
                ));
            }
        }
        parsed.push(values);
    }
    let position = match position {
        Some(p) => p,
        None => {
            return Err(ProviderError::invalid_record_id(
                "",
                "no record ids supplied",
            ));
        }
    };
    let entity = mapper.schema.entity_at(position).ok_or_else(|| {
        ProviderError::invalid_record_id(
            node_ids[0].clone(),
            format!("no node class at schema position {}", position),
        )
    })?;

    let key_len = DataFetcher::new(mapper).key_attributes(entity).len();
    for (id, values) in node_ids.iter().zip(&parsed) {
        if values.len() != key_len {
            return Err(ProviderError::invalid_record_id(
                id,
                format!("expected {} key values, found {}", key_len, values.len()),
            ));
        }
    }
    Ok((entity, parsed))
}

/// Bind a record-id fragment with its most specific SQL type
fn id_sql_value(raw: &str) -> SqlValue {
    if let Ok(i) = raw.parse::<i64>() {
        return SqlValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return SqlValue::Float(f);
    }
    SqlValue::Text(raw.to_string())
}

/// Reorder key-ordered id values into a relationship's referenced column
/// order. `None` when the referenced columns are not fully covered by the
/// key.
fn reorder_id_values(
    rows: &[Vec<String>],
    key_columns: &[String],
    target_columns: &[String],
) -> Option<Vec<Vec<SqlValue>>> {
    let positions: Vec<usize> = target_columns
        .iter()
        .map(|c| key_columns.iter().position(|k| k == c))
        .collect::<Option<Vec<_>>>()?;
    Some(
        rows.iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|&i| row.get(i).map(|v| id_sql_value(v)).unwrap_or(SqlValue::Null))
                    .collect()
            })
            .collect(),
    )
}
