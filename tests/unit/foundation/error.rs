use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RelayError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        RelayError::malformed_frame("x")
            .to_string()
            .contains("malformed frame:")
    );
    assert!(
        RelayError::transport("x")
            .to_string()
            .contains("transport error:")
    );
    assert!(
        RelayError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RelayError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde() {
    let err: RelayError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, RelayError::Serde(_)));
}
