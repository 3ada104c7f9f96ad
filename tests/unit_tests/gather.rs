use fenris_terms::gather::{gather_nodal_values, ConnectivityTable, ElementList, NodalField, NodalState};
use fenris_terms::ErrorKind;

#[test]
fn gather_copies_addressed_values() {
    let state = [10.0, 11.0, 12.0, 13.0];
    let mut out = [0.0; 3];
    gather_nodal_values(&mut out, &state, &[3, 0, 3]);
    assert_eq!(out, [13.0, 10.0, 13.0]);
    assert_eq!(state, [10.0, 11.0, 12.0, 13.0]);
}

#[test]
#[should_panic]
fn gather_out_of_bounds_panics() {
    let mut out = [0.0; 2];
    gather_nodal_values(&mut out, &[1.0, 2.0], &[0, 2]);
}

#[test]
fn connectivity_table_rows() {
    let nodes = [0, 1, 2, 2, 1, 3];
    let connectivity = ConnectivityTable::from_slice(&nodes, 3).unwrap();
    assert_eq!(connectivity.num_elements(), 2);
    assert_eq!(connectivity.nodes_per_element(), 3);
    assert_eq!(connectivity.element_nodes(1), &[2, 1, 3]);
    assert_eq!(connectivity.max_node(), Some(3));

    let err = ConnectivityTable::from_slice(&nodes, 4).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "nodes", .. }));
    assert!(!err.to_string().contains("non-empty"));
    let err = ConnectivityTable::from_slice(&nodes, 0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { operand: "nodes_per_element", .. }));
    let empty = ConnectivityTable::from_slice(&[], 2).unwrap();
    assert_eq!(empty.num_elements(), 0);
    assert_eq!(empty.max_node(), None);
}

#[test]
fn element_lists() {
    let all = ElementList::All(3);
    assert_eq!(all.len(), 3);
    assert_eq!(all.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(all.check_bounds("test", 3).is_ok());

    let subset = [4, 1];
    let subset = ElementList::Subset(&subset);
    assert_eq!(subset.element(0), 4);
    assert_eq!(subset.iter().collect::<Vec<_>>(), vec![4, 1]);
    let err = subset.check_bounds("test", 4).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::IndexOutOfBounds {
            operand: "element list",
            index: 4,
            len: 4
        }
    );

    assert!(ElementList::All(0).is_empty());
    assert!(ElementList::Subset(&[]).is_empty());
}

#[test]
fn nodal_state_offset() {
    let values = [0.0, 1.0, 2.0, 3.0, 4.0];
    let state = NodalState::with_offset(&values, 2).unwrap();
    assert_eq!(state.offset(), 2);
    assert_eq!(state.values(), &[2.0, 3.0, 4.0]);

    let mut out = [0.0; 2];
    state.gather(&mut out, &[2, 0]);
    assert_eq!(out, [4.0, 2.0]);

    assert!(NodalState::with_offset(&values, 5).is_ok());
    assert!(NodalState::with_offset(&values, 6).is_err());
    assert_eq!(NodalState::new(&values).values().len(), 5);
}

#[test]
fn nodal_field_gathers_and_validates_elements() {
    let values = [1.0, 2.0, 3.0, 4.0];
    let nodes = [0, 1, 1, 3];
    let connectivity = ConnectivityTable::from_slice(&nodes, 2).unwrap();
    let field = NodalField::new(NodalState::new(&values), connectivity);

    let mut out = [0.0; 2];
    field.gather_element(&mut out, 1);
    assert_eq!(out, [2.0, 4.0]);
    assert!(field.check_elements("test", &ElementList::All(2)).is_ok());
    assert!(field.check_elements("test", &ElementList::All(3)).is_err());

    // With an offset, node 3 no longer addresses the state
    let shifted = NodalField::new(NodalState::with_offset(&values, 1).unwrap(), connectivity);
    assert!(shifted.check_elements("test", &ElementList::Subset(&[0])).is_ok());
    let err = shifted
        .check_elements("test", &ElementList::Subset(&[1]))
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::IndexOutOfBounds {
            operand: "state",
            index: 3,
            len: 3
        }
    );
}
