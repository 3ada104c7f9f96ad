use fenris_terms::error::check_dimension;
use fenris_terms::{ErrorKind, TermError};

#[test]
fn only_two_and_three_dimensions_are_supported() {
    assert!(check_dimension("op", 2).is_ok());
    assert!(check_dimension("op", 3).is_ok());
    for dim in [0, 1, 4] {
        let err = check_dimension("op", dim).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnsupportedDimension { dim });
        assert!(err.is_configuration());
    }
}

#[test]
fn error_display_names_term_and_operation() {
    let err = TermError::new("build_gram_from_gradient", ErrorKind::UnsupportedDimension { dim: 4 });
    assert_eq!(err.term(), None);
    assert_eq!(
        err.to_string(),
        "build_gram_from_gradient failed: unsupported spatial dimension 4 (only 2 and 3 are supported)"
    );

    let err = err.in_term("dw_laplace").in_term("outer");
    assert_eq!(err.term(), Some("dw_laplace"));
    assert_eq!(err.operation(), "build_gram_from_gradient");
    assert!(err
        .to_string()
        .starts_with("dw_laplace: build_gram_from_gradient failed"));
}

#[test]
fn error_kinds_are_classified() {
    let allocation = TermError::new("allocate", ErrorKind::Allocation { requested: 10 });
    assert!(allocation.is_allocation());
    assert!(!allocation.is_configuration());

    let shape = TermError::new(
        "multiply",
        ErrorKind::ShapeMismatch {
            operand: "b",
            expected: "2 rows".to_string(),
            actual: "3 rows".to_string(),
        },
    );
    assert!(shape.is_configuration());
    assert_eq!(shape.to_string(), "multiply failed: operand `b` has shape 3 rows, expected 2 rows");

    // Usable as a boxed error
    let boxed: Box<dyn std::error::Error> = Box::new(shape);
    assert!(boxed.source().is_none());
}
