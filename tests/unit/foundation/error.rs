use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ChartkitError::registration("x")
            .to_string()
            .contains("registration error:")
    );
    assert!(
        ChartkitError::template("x")
            .to_string()
            .contains("template error:")
    );
    assert!(
        ChartkitError::not_found("x")
            .to_string()
            .contains("not found:")
    );
    assert!(
        ChartkitError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ChartkitError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn invalid_theme_lists_every_violation() {
    let err = ChartkitError::InvalidTheme {
        id: "neon".to_string(),
        violations: vec![
            "colors.primary: unrecognized color 'bright'".to_string(),
            "typography.fontFamily: required field is missing".to_string(),
        ],
    };
    let msg = err.to_string();
    assert!(msg.starts_with("invalid theme 'neon':"));
    assert!(msg.contains("colors.primary"));
    assert!(msg.contains("typography.fontFamily"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ChartkitError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
