//! Dependency ordering for declared tables.
//!
//! Foreign keys induce a graph over the declared tables: every referenced
//! table must be created before its referrers. The sorter is Kahn's
//! algorithm over that graph. Self-references never constrain the order
//! (the diff generator defers all foreign keys to post-create ALTERs), and
//! references to undeclared tables are outside the graph entirely.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::error::{MigrateResult, MigrationError};
use crate::model::TableSchema;

/// Edges keyed by referenced table: `graph[ref_table]` lists the tables
/// that reference it and therefore must come after it.
pub type DependencyGraph = BTreeMap<String, Vec<String>>;

/// Build the dependency graph from declared schemas.
///
/// Only edges between declared tables are recorded; self-references are
/// skipped here but remain part of the schemas themselves.
pub fn build_graph(schemas: &BTreeMap<String, TableSchema>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    for (table, schema) in schemas {
        for col in &schema.columns {
            if let Some(fk) = &col.attrs.foreign_key {
                if fk.ref_table != *table && schemas.contains_key(&fk.ref_table) {
                    graph
                        .entry(fk.ref_table.clone())
                        .or_default()
                        .push(table.clone());
                }
            }
        }
    }

    graph
}

/// Kahn's topological sort.
///
/// `tables` is the full (pre-sorted) node set; the ready queue is consumed
/// FIFO, so the output is deterministic across runs. On a cycle, returns
/// [`MigrationError::CyclicDependency`] listing every unresolved table with
/// the tables it waits on, plus the full edge list.
pub fn topological_sort(graph: &DependencyGraph, tables: &[String]) -> MigrateResult<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> =
        tables.iter().map(|t| (t.as_str(), 0)).collect();

    for (ref_table, dependents) in graph {
        for dependent in dependents {
            // Self-edges never block creation; the FK lands in a later ALTER.
            if dependent == ref_table {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                *degree += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = tables
        .iter()
        .map(String::as_str)
        .filter(|t| in_degree.get(t).copied() == Some(0))
        .collect();

    let mut result: Vec<String> = Vec::with_capacity(tables.len());
    while let Some(current) = queue.pop_front() {
        result.push(current.to_string());

        if let Some(dependents) = graph.get(current) {
            for dependent in dependents {
                if dependent == current {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }
    }

    if result.len() < tables.len() {
        let resolved: HashSet<&str> = result.iter().map(String::as_str).collect();
        let remaining: Vec<&String> = tables.iter().filter(|t| !resolved.contains(t.as_str())).collect();
        return Err(MigrationError::CyclicDependency(cycle_diagnostic(
            graph, &remaining,
        )));
    }

    Ok(result)
}

/// Human-readable cycle report: each unresolved table with the tables it
/// depends on, then the full dependency graph.
fn cycle_diagnostic(graph: &DependencyGraph, remaining: &[&String]) -> String {
    let mut out = String::from("Problematic tables and their dependencies:\n");

    for table in remaining {
        let depends_on: Vec<&str> = graph
            .iter()
            .filter(|(_, dependents)| dependents.iter().any(|d| d == *table))
            .map(|(ref_table, _)| ref_table.as_str())
            .collect();

        if depends_on.is_empty() {
            out.push_str(&format!("  - {} (isolated table with cyclic reference)\n", table));
        } else {
            out.push_str(&format!("  - {} depends on: {}\n", table, depends_on.join(", ")));
        }
    }

    out.push_str("\nFull dependency graph:\n");
    for (ref_table, dependents) in graph {
        if !dependents.is_empty() {
            out.push_str(&format!("  - {} -> {}\n", ref_table, dependents.join(", ")));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnAttributes, ColumnMeta, ForeignKey};

    fn table_with_fk(table: &str, fks: &[(&str, &str)]) -> (String, TableSchema) {
        let columns = fks
            .iter()
            .enumerate()
            .map(|(i, (col, target))| ColumnMeta {
                field_name: col.to_string(),
                column_name: col.to_string(),
                index: i,
                attrs: ColumnAttributes {
                    pg_type: "integer".to_string(),
                    foreign_key: if target.is_empty() {
                        None
                    } else {
                        Some(ForeignKey {
                            ref_table: target.to_string(),
                            ref_column: "id".to_string(),
                            ..Default::default()
                        })
                    },
                    ..Default::default()
                },
            })
            .collect();

        (
            table.to_string(),
            TableSchema {
                table_name: table.to_string(),
                columns,
            },
        )
    }

    fn names(schemas: &BTreeMap<String, TableSchema>) -> Vec<String> {
        schemas.keys().cloned().collect()
    }

    #[test]
    fn test_referenced_table_precedes_referrer() {
        let schemas: BTreeMap<_, _> = [
            table_with_fk("books", &[("author_id", "authors")]),
            table_with_fk("authors", &[("id", "")]),
        ]
        .into_iter()
        .collect();

        let graph = build_graph(&schemas);
        let order = topological_sort(&graph, &names(&schemas)).unwrap();
        assert_eq!(order, vec!["authors", "books"]);
    }

    #[test]
    fn test_total_order_respects_all_edges() {
        let schemas: BTreeMap<_, _> = [
            table_with_fk("comments", &[("post_id", "posts"), ("user_id", "users")]),
            table_with_fk("posts", &[("user_id", "users")]),
            table_with_fk("users", &[("id", "")]),
        ]
        .into_iter()
        .collect();

        let graph = build_graph(&schemas);
        let order = topological_sort(&graph, &names(&schemas)).unwrap();

        let pos = |t: &str| order.iter().position(|x| x == t).unwrap();
        assert!(pos("users") < pos("posts"));
        assert!(pos("users") < pos("comments"));
        assert!(pos("posts") < pos("comments"));
    }

    #[test]
    fn test_self_reference_sorts_without_cycle() {
        let schemas: BTreeMap<_, _> = [table_with_fk("categories", &[("parent_id", "categories")])]
            .into_iter()
            .collect();

        let graph = build_graph(&schemas);
        assert!(graph.is_empty(), "self-edges are not recorded");
        let order = topological_sort(&graph, &names(&schemas)).unwrap();
        assert_eq!(order, vec!["categories"]);
    }

    #[test]
    fn test_undeclared_reference_is_ignored() {
        let schemas: BTreeMap<_, _> = [table_with_fk("orders", &[("user_id", "users")])]
            .into_iter()
            .collect();

        let graph = build_graph(&schemas);
        assert!(graph.is_empty());
        assert_eq!(
            topological_sort(&graph, &names(&schemas)).unwrap(),
            vec!["orders"]
        );
    }

    #[test]
    fn test_cycle_is_diagnosed() {
        let schemas: BTreeMap<_, _> = [
            table_with_fk("a", &[("b_id", "b")]),
            table_with_fk("b", &[("a_id", "a")]),
        ]
        .into_iter()
        .collect();

        let graph = build_graph(&schemas);
        let err = topological_sort(&graph, &names(&schemas)).unwrap_err();
        let MigrationError::CyclicDependency(listing) = err else {
            panic!("expected CyclicDependency, got {err:?}");
        };
        assert!(listing.contains("a depends on: b"));
        assert!(listing.contains("b depends on: a"));
        assert!(listing.contains("Full dependency graph"));
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        // Three independent roots: order must be the sorted node order.
        let schemas: BTreeMap<_, _> = [
            table_with_fk("zebras", &[]),
            table_with_fk("apples", &[]),
            table_with_fk("mangos", &[]),
        ]
        .into_iter()
        .collect();

        let graph = build_graph(&schemas);
        let order = topological_sort(&graph, &names(&schemas)).unwrap();
        assert_eq!(order, vec!["apples", "mangos", "zebras"]);
    }

    #[test]
    fn test_explicit_self_edge_in_graph_does_not_block() {
        // A hand-built graph may carry a self-edge; it must not deadlock.
        let mut graph = DependencyGraph::new();
        graph.insert("categories".to_string(), vec!["categories".to_string()]);

        let order =
            topological_sort(&graph, &["categories".to_string()]).unwrap();
        assert_eq!(order, vec!["categories"]);
    }
}
