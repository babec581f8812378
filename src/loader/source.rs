//! Statement sources

use super::{LoadError, LoadResult};
use crate::model::{Datum, Label};
use rio_api::model::{BlankNode, Literal, Quad, Subject, Term};
use rio_api::parser::QuadsParser;
use rio_turtle::NQuadsParser;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::PathBuf;

/// A single input statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// An edge between two nodes
    Link {
        subject: Label,
        predicate: Label,
        object: Label,
    },
    /// A literal value attached to a node
    Data {
        subject: Label,
        predicate: Label,
        datum: Datum,
    },
}

impl Statement {
    pub fn link(subject: impl Into<Label>, predicate: impl Into<Label>, object: impl Into<Label>) -> Self {
        Statement::Link {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn data(subject: impl Into<Label>, predicate: impl Into<Label>, datum: Datum) -> Self {
        Statement::Data {
            subject: subject.into(),
            predicate: predicate.into(),
            datum,
        }
    }
}

/// A replayable source of statements
pub trait StatementSource {
    /// Calls `f` with every statement, starting from the beginning each time
    fn scan(&mut self, f: &mut dyn FnMut(Statement) -> LoadResult<()>) -> LoadResult<()>;
}

/// Statements held in memory
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    pub statements: Vec<Statement>,
}

impl VecSource {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

impl StatementSource for VecSource {
    fn scan(&mut self, f: &mut dyn FnMut(Statement) -> LoadResult<()>) -> LoadResult<()> {
        for statement in &self.statements {
            f(statement.clone())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Input {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// N-Quads (or N-Triples) input.
///
/// Named and blank nodes become labels, blank nodes written as `_:id`.
/// Literals become data statements; typed literals keep their lexical
/// value only. Graph names are ignored.
#[derive(Debug, Clone)]
pub struct NQuadsSource {
    input: Input,
}

impl NQuadsSource {
    /// Reads from the file at `path` on every scan
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            input: Input::File(path.into()),
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Input::Bytes(bytes.into()),
        }
    }

    fn parse(reader: impl BufRead, f: &mut dyn FnMut(Statement) -> LoadResult<()>) -> LoadResult<()> {
        let mut parser = NQuadsParser::new(reader);
        parser.parse_all(&mut |quad| -> LoadResult<()> {
            match statement(quad) {
                Some(statement) => f(statement),
                None => Ok(()),
            }
        })
    }
}

impl StatementSource for NQuadsSource {
    fn scan(&mut self, f: &mut dyn FnMut(Statement) -> LoadResult<()>) -> LoadResult<()> {
        match &self.input {
            Input::File(path) => {
                let file = File::open(path).map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                Self::parse(BufReader::new(file), f)
            }
            Input::Bytes(bytes) => Self::parse(Cursor::new(bytes.as_slice()), f),
        }
    }
}

fn blank(node: BlankNode<'_>) -> Label {
    Label::new(format!("_:{}", node.id))
}

/// Converts a parsed quad, skipping quoted triples
fn statement(quad: Quad<'_>) -> Option<Statement> {
    let subject = match quad.subject {
        Subject::NamedNode(node) => Label::new(node.iri),
        Subject::BlankNode(node) => blank(node),
        _ => return None,
    };
    let predicate = Label::new(quad.predicate.iri);

    let statement = match quad.object {
        Term::NamedNode(node) => Statement::link(subject, predicate, node.iri),
        Term::BlankNode(node) => Statement::link(subject, predicate, blank(node)),
        Term::Literal(Literal::LanguageTaggedString { value, language }) => {
            Statement::data(subject, predicate, Datum::with_language(value, language))
        }
        Term::Literal(Literal::Simple { value }) | Term::Literal(Literal::Typed { value, .. }) => {
            Statement::data(subject, predicate, Datum::new(value))
        }
        _ => return None,
    };
    Some(statement)
}
