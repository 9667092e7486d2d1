use telemetry_forwarder::encoder::{
    BuilderState, EncodingError, LineBuilder, is_valid_field_key, is_valid_tag_key,
};
use telemetry_forwarder::{FieldValue, MetricPoint};

#[test]
fn test_reference_line() {
    let mut builder = LineBuilder::new();
    builder.set_measurement("m").unwrap();
    builder.add_tag("source", "test").unwrap();
    builder.add_field_double("a", 1.5).unwrap();
    builder.add_field_integer("b", 2).unwrap();
    builder.set_timestamp(1_700_000_000).unwrap();

    let record = builder.finalize().unwrap();
    assert_eq!(record.as_str(), "m,source=test a=1.500000,b=2i 1700000000\n");
}

#[test]
fn test_key_validity() {
    for key in ["has space", "has,comma", "has\"quote"] {
        assert!(!is_valid_tag_key(key), "{key:?}");
        assert!(!is_valid_field_key(key), "{key:?}");
    }
    for key in ["a", "sensor_1", "ABC", "_x9"] {
        assert!(is_valid_tag_key(key), "{key:?}");
        assert!(is_valid_field_key(key), "{key:?}");
    }
}

#[test]
fn test_field_then_tag_is_state_violation() {
    let mut builder = LineBuilder::new();
    builder.set_measurement("m").unwrap();
    builder.add_field_bool("ok", true).unwrap();

    let err = builder.add_tag("late", "tag").unwrap_err();
    assert!(err.is_state_violation());
}

#[test]
fn test_nan_double_rejected() {
    let mut builder = LineBuilder::new();
    builder.set_measurement("m").unwrap();
    assert!(matches!(
        builder.add_field_double("x", f64::NAN),
        Err(EncodingError::NonFiniteValue { .. })
    ));
}

#[test]
fn test_all_field_types_in_one_line() {
    let record = MetricPoint::new("env")
        .tag("site", "lab")
        .field("temp", 21.25)
        .field("count", -4)
        .field("note", "door \"A\"")
        .field("open", FieldValue::Boolean(false))
        .timestamp(42)
        .encode()
        .unwrap();

    assert_eq!(
        record.as_str(),
        "env,site=lab temp=21.250000,count=-4i,note=\"door \\\"A\\\"\",open=false 42\n"
    );
}

#[test]
fn test_builder_reuse_after_reset() {
    let mut builder = LineBuilder::new();
    for n in 0..3 {
        builder.reset();
        assert_eq!(builder.state(), BuilderState::Empty);
        builder.set_measurement("m").unwrap();
        builder.add_field_integer("n", n).unwrap();
        builder.set_timestamp(n).unwrap();
        let record = builder.finalize().unwrap();
        assert_eq!(record.as_str(), format!("m n={n}i {n}\n"));
    }
}
