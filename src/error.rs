//! Error types for kernels and term evaluators.
use crate::tensor::TensorShape;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// The reason a kernel or evaluator failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The spatial dimension is not 2 or 3.
    UnsupportedDimension { dim: usize },
    /// An operand does not have the shape required by the operation.
    ShapeMismatch {
        operand: &'static str,
        expected: String,
        actual: String,
    },
    /// A connectivity or element index points outside of the data it addresses.
    IndexOutOfBounds {
        operand: &'static str,
        index: usize,
        len: usize,
    },
    /// A scratch tensor could not be allocated.
    Allocation { requested: usize },
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDimension { dim } => {
                write!(f, "unsupported spatial dimension {dim} (only 2 and 3 are supported)")
            }
            Self::ShapeMismatch {
                operand,
                expected,
                actual,
            } => write!(f, "operand `{operand}` has shape {actual}, expected {expected}"),
            Self::IndexOutOfBounds { operand, index, len } => {
                write!(f, "index {index} is out of bounds for `{operand}` of length {len}")
            }
            Self::Allocation { requested } => {
                write!(f, "failed to allocate scratch storage for {requested} values")
            }
        }
    }
}

/// Failure of a kernel or term evaluator.
///
/// Carries the name of the operation that failed and, once it has propagated out of an
/// evaluator, the name of the term being evaluated. The output tensor of a failed
/// evaluation is unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermError {
    term: Option<&'static str>,
    operation: &'static str,
    kind: ErrorKind,
}

impl TermError {
    pub fn new(operation: &'static str, kind: ErrorKind) -> Self {
        Self {
            term: None,
            operation,
            kind,
        }
    }

    pub(crate) fn shape_mismatch(
        operation: &'static str,
        operand: &'static str,
        expected: impl Display,
        actual: impl Display,
    ) -> Self {
        Self::new(
            operation,
            ErrorKind::ShapeMismatch {
                operand,
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
        )
    }

    pub(crate) fn out_of_bounds(operation: &'static str, operand: &'static str, index: usize, len: usize) -> Self {
        Self::new(operation, ErrorKind::IndexOutOfBounds { operand, index, len })
    }

    /// Attaches the name of the term in which the error occurred.
    ///
    /// An already attached term name is kept.
    pub fn in_term(mut self, term: &'static str) -> Self {
        self.term.get_or_insert(term);
        self
    }

    pub fn term(&self) -> Option<&'static str> {
        self.term
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Whether the error stems from an invalid configuration (dimension, shapes, indices).
    pub fn is_configuration(&self) -> bool {
        !self.is_allocation()
    }

    pub fn is_allocation(&self) -> bool {
        matches!(self.kind, ErrorKind::Allocation { .. })
    }
}

impl Display for TermError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(term) = self.term {
            write!(f, "{term}: ")?;
        }
        write!(f, "{} failed: {}", self.operation, self.kind)
    }
}

impl Error for TermError {}

/// Rejects any spatial dimension other than 2 or 3.
pub fn check_dimension(operation: &'static str, dim: usize) -> Result<(), TermError> {
    match dim {
        2 | 3 => Ok(()),
        _ => Err(TermError::new(operation, ErrorKind::UnsupportedDimension { dim })),
    }
}

pub(crate) fn check_shape(
    operation: &'static str,
    operand: &'static str,
    actual: TensorShape,
    expected: TensorShape,
) -> Result<(), TermError> {
    if actual == expected {
        Ok(())
    } else {
        Err(TermError::shape_mismatch(operation, operand, expected, actual))
    }
}
