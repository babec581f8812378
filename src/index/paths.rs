//! Path queries
//!
//! A [`Paths`] cursor is a pipeline of pull-based operators. Every call to
//! [`Paths::connected`] or [`Paths::ending`] wraps the current pipeline in
//! a new operator; nothing touches the index until results are pulled.
//!
//! Pulling one path does only the index work needed to produce it.

use super::graph::Index;
use super::{IndexResult, StorageContext};
use crate::model::{Datum, Id, Label, Triple};
use crate::storage::TernaryScan;
use std::fmt;
use std::rc::Rc;

/// One hop of a path under construction.
///
/// Elements form an immutable linked list through `parent`, so extending
/// a path does not copy its prefix.
#[derive(Debug)]
struct PathElement {
    node: Id,
    /// Triples recorded at this hop, in the order they were found
    triples: Vec<Id>,
    parent: Option<Rc<PathElement>>,
}

/// Operator in a path pipeline
trait PathOperator {
    /// Produces the next element, or `None` once exhausted
    fn next(&mut self) -> IndexResult<Option<PathElement>>;
}

type BoxedOperator<'a> = Box<dyn PathOperator + 'a>;

/// Subjects of all `(subject, predicate, object)` triples for fixed predicate and object
struct StartOperator<'a> {
    scan: TernaryScan<'a>,
}

impl PathOperator for StartOperator<'_> {
    fn next(&mut self) -> IndexResult<Option<PathElement>> {
        let Some(item) = self.scan.next() else {
            return Ok(None);
        };
        let (node, triple) = item.context("failed to scan for starting nodes")?;
        Ok(Some(PathElement {
            node,
            triples: vec![triple],
            parent: None,
        }))
    }
}

/// Follows one `predicate` edge from every input element
struct ExpandOperator<'a> {
    index: &'a Index,
    predicate: Id,
    input: BoxedOperator<'a>,
    /// Element being expanded and its remaining matches
    current: Option<(Rc<PathElement>, TernaryScan<'a>)>,
}

impl PathOperator for ExpandOperator<'_> {
    fn next(&mut self) -> IndexResult<Option<PathElement>> {
        loop {
            if let Some((parent, scan)) = &mut self.current {
                match scan.next() {
                    Some(item) => {
                        let (node, triple) = item.context("failed to expand path")?;
                        return Ok(Some(PathElement {
                            node,
                            triples: vec![triple],
                            parent: Some(Rc::clone(parent)),
                        }));
                    }
                    None => self.current = None,
                }
            }

            let Some(element) = self.input.next()? else {
                return Ok(None);
            };
            let scan = self
                .index
                .pso()?
                .scan(self.predicate, element.node)
                .context("failed to expand path")?;
            self.current = Some((Rc::new(element), scan));
        }
    }
}

/// Keeps elements whose node has a `(predicate, object)` edge, recording that edge
struct RestrictOperator<'a> {
    index: &'a Index,
    predicate: Id,
    object: Id,
    input: BoxedOperator<'a>,
}

impl PathOperator for RestrictOperator<'_> {
    fn next(&mut self) -> IndexResult<Option<PathElement>> {
        while let Some(mut element) = self.input.next()? {
            let found = self
                .index
                .pos()?
                .has(self.predicate, self.object, element.node)
                .context("failed to restrict path")?;
            if let Some(triple) = found {
                element.triples.push(triple);
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}

/// Replays materialized elements
struct ReplayOperator {
    elements: std::vec::IntoIter<PathElement>,
}

impl PathOperator for ReplayOperator {
    fn next(&mut self) -> IndexResult<Option<PathElement>> {
        Ok(self.elements.next())
    }
}

/// A set of paths in an [`Index`].
///
/// Created by [`Index::paths_starting`] and refined with
/// [`Paths::connected`] and [`Paths::ending`]. A cursor must not be shared
/// between threads; independent cursors over one index may run in parallel.
pub struct Paths<'a> {
    index: &'a Index,
    operator: BoxedOperator<'a>,
    /// Predicates of all hops added by `connected`
    predicates: Vec<Id>,
    size: Option<usize>,
}

impl Index {
    /// Starts a query at every node connected to `object` via `predicate`
    pub fn paths_starting(&self, predicate: &Label, object: &Label) -> IndexResult<Paths<'_>> {
        let p = self.labels().forward(predicate).context("failed to resolve predicate")?;
        let o = self.labels().forward(object).context("failed to resolve object")?;

        let scan = self.pos()?.scan(p, o).context("failed to scan for starting nodes")?;
        Ok(Paths {
            index: self,
            operator: Box::new(StartOperator { scan }),
            predicates: Vec::new(),
            size: None,
        })
    }
}

impl<'a> Paths<'a> {
    fn wrap(&mut self, wrap: impl FnOnce(BoxedOperator<'a>) -> BoxedOperator<'a>) {
        let empty: BoxedOperator<'a> = Box::new(ReplayOperator {
            elements: Vec::new().into_iter(),
        });
        let input = std::mem::replace(&mut self.operator, empty);
        self.operator = wrap(input);
        self.size = None;
    }

    /// Extends every path by one `predicate` edge leaving its last node
    pub fn connected(&mut self, predicate: &Label) -> IndexResult<&mut Self> {
        let p = self
            .index
            .labels()
            .forward(predicate)
            .context("failed to resolve predicate")?;
        self.predicates.push(p);

        let index = self.index;
        self.wrap(|input| -> BoxedOperator<'a> {
            Box::new(ExpandOperator {
                index,
                predicate: p,
                input,
                current: None,
            })
        });
        Ok(self)
    }

    /// Keeps only paths whose last node is connected to `object` via `predicate`
    pub fn ending(&mut self, predicate: &Label, object: &Label) -> IndexResult<&mut Self> {
        let labels = self.index.labels();
        let p = labels.forward(predicate).context("failed to resolve predicate")?;
        let o = labels.forward(object).context("failed to resolve object")?;

        let index = self.index;
        self.wrap(|input| -> BoxedOperator<'a> {
            Box::new(RestrictOperator {
                index,
                predicate: p,
                object: o,
                input,
            })
        });
        Ok(self)
    }

    /// Number of paths in this set.
    ///
    /// Evaluates the whole query and keeps every result in memory.
    pub fn size(&mut self) -> IndexResult<usize> {
        if let Some(size) = self.size {
            return Ok(size);
        }

        let mut elements = Vec::new();
        while let Some(element) = self.operator.next()? {
            elements.push(element);
        }

        let size = elements.len();
        self.operator = Box::new(ReplayOperator {
            elements: elements.into_iter(),
        });
        self.size = Some(size);
        Ok(size)
    }

    /// Iterates over the paths in this set.
    ///
    /// Iteration stops after the first error.
    pub fn paths(self) -> impl Iterator<Item = IndexResult<Path>> + 'a {
        PathIter {
            paths: self,
            done: false,
        }
    }

    fn make_path(&self, element: PathElement) -> IndexResult<Path> {
        // collected leaf to root
        let mut nodes = Vec::new();
        let mut triples = Vec::new();

        let mut cursor = Some(&element);
        while let Some(current) = cursor {
            nodes.push(current.node);
            triples.extend_from_slice(&current.triples);
            cursor = current.parent.as_deref();
        }

        // a final datum is not a node
        let datum = match nodes.first() {
            Some(last) => self.index.datum(*last)?,
            None => None,
        };
        if datum.is_some() {
            nodes.remove(0);
        }

        let labels = self.index.labels();
        let reverse = |id: &Id| labels.reverse(*id).context("failed to reverse label");

        Ok(Path {
            nodes: nodes.iter().rev().map(reverse).collect::<IndexResult<_>>()?,
            edges: self.predicates.iter().map(reverse).collect::<IndexResult<_>>()?,
            triples: triples
                .iter()
                .rev()
                .map(|id| self.index.triple(*id))
                .collect::<IndexResult<_>>()?,
            datum,
        })
    }
}

struct PathIter<'a> {
    paths: Paths<'a>,
    done: bool,
}

impl Iterator for PathIter<'_> {
    type Item = IndexResult<Path>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.paths.operator.next() {
            Ok(Some(element)) => self.paths.make_path(element),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(err) => Err(err),
        };
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// A path inside an [`Index`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    /// Labels of the nodes along the path
    pub nodes: Vec<Label>,
    /// Labels of the edges added by `connected`, in order
    pub edges: Vec<Label>,
    /// Every triple involved in the path, in query order
    pub triples: Vec<Triple>,
    /// Datum at the end of the path, if the last hop reached one
    pub datum: Option<Datum>,
}

impl Path {
    /// The final datum, or else the label of the last node
    pub fn value(&self) -> Datum {
        if let Some(datum) = &self.datum {
            return datum.clone();
        }
        self.nodes
            .last()
            .map(|node| Datum::new(node.as_str()))
            .unwrap_or_default()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut separate = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !std::mem::take(&mut first) {
                write!(f, " ")?;
            }
            Ok(())
        };

        let mut edges = self.edges.iter();
        for node in &self.nodes {
            separate(f)?;
            write!(f, "{}", node)?;
            if let Some(edge) = edges.next() {
                separate(f)?;
                write!(f, "{}", edge)?;
            }
        }
        if let Some(datum) = &self.datum {
            separate(f)?;
            write!(f, "{}", datum)?;
        }
        Ok(())
    }
}
