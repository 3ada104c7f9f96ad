//! Connectivity-driven gathering of element nodal values from a global state vector.
use crate::error::TermError;
use crate::Real;
use itertools::izip;

/// Copies `state[nodes[i]]` into `out[i]`.
///
/// # Panics
///
/// Panics if `out` and `nodes` differ in length, or if a node index is out of bounds for
/// `state`. Evaluators validate their connectivity up front so that this never happens
/// during an evaluation.
pub fn gather_nodal_values<T: Real>(out: &mut [T], state: &[T], nodes: &[usize]) {
    assert_eq!(out.len(), nodes.len(), "Output buffer must hold one value per node");
    for (value, &node) in izip!(out, nodes) {
        *value = state[node];
    }
}

/// Element connectivity with a fixed number of nodes per element, stored row by row.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnectivityTable<'a> {
    nodes: &'a [usize],
    nodes_per_element: usize,
}

impl<'a> ConnectivityTable<'a> {
    pub fn from_slice(nodes: &'a [usize], nodes_per_element: usize) -> Result<Self, TermError> {
        let operation = "ConnectivityTable::from_slice";
        if nodes_per_element == 0 {
            return Err(TermError::shape_mismatch(
                operation,
                "nodes_per_element",
                "at least one node per element",
                "0 nodes per element",
            ));
        }
        if nodes.len() % nodes_per_element != 0 {
            return Err(TermError::shape_mismatch(
                operation,
                "nodes",
                format!("a multiple of {nodes_per_element} indices"),
                format!("{} indices", nodes.len()),
            ));
        }
        Ok(Self {
            nodes,
            nodes_per_element,
        })
    }

    pub fn num_elements(&self) -> usize {
        self.nodes.len() / self.nodes_per_element
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    /// The global node indices of the given element.
    ///
    /// # Panics
    ///
    /// Panics if the element index is out of bounds.
    pub fn element_nodes(&self, element: usize) -> &'a [usize] {
        let n = self.nodes_per_element;
        &self.nodes[element * n..(element + 1) * n]
    }

    pub fn max_node(&self) -> Option<usize> {
        self.nodes.iter().copied().max()
    }
}

/// The elements a term is evaluated on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ElementList<'a> {
    /// Elements `0 .. n`.
    All(usize),
    /// An explicit subset, e.g. the elements of a material region.
    Subset(&'a [usize]),
}

impl<'a> ElementList<'a> {
    pub fn len(&self) -> usize {
        match self {
            Self::All(n) => *n,
            Self::Subset(elements) => elements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at the given position in the list.
    pub fn element(&self, position: usize) -> usize {
        match self {
            Self::All(n) => {
                assert!(position < *n, "Position {} out of bounds for {} elements", position, n);
                position
            }
            Self::Subset(elements) => elements[position],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).map(move |position| self.element(position))
    }

    /// Ensures that every listed element is below `num_elements`.
    pub fn check_bounds(&self, operation: &'static str, num_elements: usize) -> Result<(), TermError> {
        match self.iter().find(|&element| element >= num_elements) {
            Some(element) => Err(TermError::out_of_bounds(operation, "element list", element, num_elements)),
            None => Ok(()),
        }
    }
}

/// A global state vector together with the offset at which the field of interest starts.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NodalState<'a, T> {
    values: &'a [T],
    offset: usize,
}

impl<'a, T: Real> NodalState<'a, T> {
    pub fn new(values: &'a [T]) -> Self {
        Self { values, offset: 0 }
    }

    pub fn with_offset(values: &'a [T], offset: usize) -> Result<Self, TermError> {
        if offset > values.len() {
            return Err(TermError::out_of_bounds(
                "NodalState::with_offset",
                "state",
                offset,
                values.len(),
            ));
        }
        Ok(Self { values, offset })
    }

    /// The values of the field, starting at the offset.
    pub fn values(&self) -> &'a [T] {
        &self.values[self.offset..]
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn gather(&self, out: &mut [T], nodes: &[usize]) {
        gather_nodal_values(out, self.values(), nodes)
    }
}

/// A nodal field: state values plus the connectivity that addresses them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NodalField<'a, T> {
    pub state: NodalState<'a, T>,
    pub connectivity: ConnectivityTable<'a>,
}

impl<'a, T: Real> NodalField<'a, T> {
    pub fn new(state: NodalState<'a, T>, connectivity: ConnectivityTable<'a>) -> Self {
        Self { state, connectivity }
    }

    pub fn nodes_per_element(&self) -> usize {
        self.connectivity.nodes_per_element()
    }

    /// Gathers the nodal values of the given element.
    pub fn gather_element(&self, out: &mut [T], element: usize) {
        self.state
            .gather(out, self.connectivity.element_nodes(element))
    }

    /// Checks that every listed element has connectivity and that all of its nodes address
    /// the state vector.
    pub fn check_elements(&self, operation: &'static str, elements: &ElementList) -> Result<(), TermError> {
        elements.check_bounds(operation, self.connectivity.num_elements())?;
        let len = self.state.values().len();
        for element in elements.iter() {
            if let Some(&node) = self
                .connectivity
                .element_nodes(element)
                .iter()
                .find(|&&node| node >= len)
            {
                return Err(TermError::out_of_bounds(operation, "state", node, len));
            }
        }
        Ok(())
    }
}
