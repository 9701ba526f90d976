// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! In-memory view of the tag hierarchy.
//!
//! Tags form a directed acyclic graph: a tag may have several parents and
//! several children. The graph is loaded from `tag_edges`, edited here, and the
//! resulting edge sets written back, so hierarchy rules never depend on
//! recursive SQL.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{Connection, params};

use crate::error::{LedgerError, Result};

#[derive(Debug, Default, Clone)]
pub struct TagGraph {
    parents: BTreeMap<i64, BTreeSet<i64>>,
    children: BTreeMap<i64, BTreeSet<i64>>,
}

impl TagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(conn: &Connection) -> Result<Self> {
        let mut graph = Self::new();
        let mut stmt = conn.prepare("SELECT parent, child FROM tag_edges")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (parent, child) = row?;
            graph.link(parent, child);
        }
        Ok(graph)
    }

    fn link(&mut self, parent: i64, child: i64) {
        self.parents.entry(child).or_default().insert(parent);
        self.children.entry(parent).or_default().insert(child);
    }

    fn unlink(&mut self, parent: i64, child: i64) {
        if let Some(set) = self.parents.get_mut(&child) {
            set.remove(&parent);
        }
        if let Some(set) = self.children.get_mut(&parent) {
            set.remove(&child);
        }
    }

    /// Adds `parent -> child`, refusing self-loops and edges that close a cycle.
    pub fn add_edge(&mut self, parent: i64, child: i64) -> Result<()> {
        if parent == child || self.reaches(child, parent) {
            return Err(LedgerError::TagCycle { parent, child });
        }
        self.link(parent, child);
        Ok(())
    }

    pub fn contains_edge(&self, parent: i64, child: i64) -> bool {
        self.children
            .get(&parent)
            .is_some_and(|set| set.contains(&child))
    }

    pub fn parents(&self, tag: i64) -> Vec<i64> {
        self.parents
            .get(&tag)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn children(&self, tag: i64) -> Vec<i64> {
        self.children
            .get(&tag)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All tags reachable by walking parent links from `tag`.
    pub fn ancestors(&self, tag: i64) -> BTreeSet<i64> {
        let mut seen = BTreeSet::new();
        let mut stack = self.parents(tag);
        while let Some(t) = stack.pop() {
            if seen.insert(t) {
                stack.extend(self.parents(t));
            }
        }
        seen
    }

    /// Whether `to` is reachable from `from` following child links.
    fn reaches(&self, from: i64, to: i64) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(t) = stack.pop() {
            if t == to {
                return true;
            }
            if seen.insert(t) {
                if let Some(next) = self.children.get(&t) {
                    stack.extend(next.iter().copied());
                }
            }
        }
        false
    }

    /// Replaces both edge sets of `tag`. Applied all-or-nothing: on a cycle the
    /// graph is left as it was.
    pub fn replace_edges(&mut self, tag: i64, parents: &[i64], children: &[i64]) -> Result<()> {
        let mut next = self.clone();
        for p in next.parents(tag) {
            next.unlink(p, tag);
        }
        for c in next.children(tag) {
            next.unlink(tag, c);
        }
        for &p in parents {
            next.add_edge(p, tag)?;
        }
        for &c in children {
            next.add_edge(tag, c)?;
        }
        *self = next;
        Ok(())
    }

    /// Rewrites the stored edges touching `tag` to match this graph.
    pub fn persist_edges_of(&self, conn: &Connection, tag: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM tag_edges WHERE parent=?1 OR child=?1",
            params![tag],
        )?;
        let mut insert = conn.prepare("INSERT INTO tag_edges(parent, child) VALUES (?1, ?2)")?;
        for p in self.parents(tag) {
            insert.execute(params![p, tag])?;
        }
        for c in self.children(tag) {
            insert.execute(params![tag, c])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_loops_and_cycles() {
        let mut g = TagGraph::new();
        g.add_edge(11, 12).unwrap();
        g.add_edge(12, 13).unwrap();
        assert!(matches!(
            g.add_edge(13, 11),
            Err(LedgerError::TagCycle { parent: 13, child: 11 })
        ));
        assert!(g.add_edge(14, 14).is_err());
        // diamond is fine
        g.add_edge(11, 13).unwrap();
        assert_eq!(g.parents(13), vec![11, 12]);
        assert_eq!(g.ancestors(13).into_iter().collect::<Vec<_>>(), vec![11, 12]);
    }

    #[test]
    fn replace_edges_is_all_or_nothing() {
        let mut g = TagGraph::new();
        g.add_edge(11, 12).unwrap();
        g.add_edge(12, 13).unwrap();
        let err = g.replace_edges(12, &[11], &[13, 11]);
        assert!(err.is_err());
        assert!(g.contains_edge(11, 12));
        assert!(g.contains_edge(12, 13));

        g.replace_edges(12, &[], &[13]).unwrap();
        assert!(!g.contains_edge(11, 12));
        assert_eq!(g.children(12), vec![13]);
    }
}
