use naiad::error::NaiadError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        NaiadError::config("x"),
        NaiadError::Config { .. }
    ));
    assert!(matches!(NaiadError::auth("x"), NaiadError::Auth { .. }));
    assert!(matches!(NaiadError::fetch("x"), NaiadError::Fetch { .. }));
    assert!(matches!(
        NaiadError::data_shape("x"),
        NaiadError::DataShape { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    let ser = NaiadError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, NaiadError::Serialization { .. }));
    assert!(matches!(NaiadError::io("x"), NaiadError::Io { .. }));
    assert!(matches!(
        NaiadError::network("x"),
        NaiadError::Network { .. }
    ));
    assert!(matches!(NaiadError::store("x"), NaiadError::Store { .. }));
}

#[test]
fn error_constructors_group_3() {
    assert!(matches!(
        NaiadError::validation("f", "m"),
        NaiadError::Validation { .. }
    ));
    assert!(matches!(
        NaiadError::timeout("x"),
        NaiadError::Timeout { .. }
    ));
    assert!(matches!(
        NaiadError::generic("x"),
        NaiadError::Generic { .. }
    ));
}

#[test]
fn transient_errors_are_retryable() {
    assert!(NaiadError::fetch("x").is_transient());
    assert!(NaiadError::timeout("x").is_transient());
    assert!(!NaiadError::auth("x").is_transient());
    assert!(!NaiadError::store("x").is_transient());
}
