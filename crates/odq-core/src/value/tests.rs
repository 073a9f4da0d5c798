use super::*;
use crate::expr::BinaryOp;
use chrono::NaiveDate;

fn status() -> Arc<EnumType> {
    EnumType::new("Status", Primitive::Int32, [("Inactive", 0), ("Active", 1)])
}

#[test]
fn numeric_promotion_widens_to_the_larger_operand() {
    assert_eq!(
        binary(BinaryOp::Add, &Value::Int32(2), &Value::Int64(40)),
        Ok(Value::Int64(42))
    );
    assert_eq!(
        binary(BinaryOp::Mul, &Value::Int32(3), &Value::Double(1.5)),
        Ok(Value::Double(4.5))
    );
    assert_eq!(
        binary(BinaryOp::Add, &Value::Decimal(Decimal::new(15, 1)), &Value::Int32(1)),
        Ok(Value::Decimal(Decimal::new(25, 1)))
    );
}

#[test]
fn integer_overflow_and_division_by_zero_are_errors() {
    assert_eq!(
        binary(BinaryOp::Add, &Value::Int32(i32::MAX), &Value::Int32(1)),
        Err(OpError::Overflow { op: BinaryOp::Add })
    );
    assert_eq!(
        binary(BinaryOp::Div, &Value::Int32(1), &Value::Int32(0)),
        Err(OpError::DivideByZero)
    );
    assert_eq!(
        binary(BinaryOp::Mod, &Value::Decimal(Decimal::ONE), &Value::Decimal(Decimal::ZERO)),
        Err(OpError::DivideByZero)
    );
}

#[test]
fn null_propagates_through_arithmetic_and_fails_comparison() {
    assert_eq!(binary(BinaryOp::Add, &Value::Null, &Value::Int32(1)), Ok(Value::Null));
    assert_eq!(
        binary(BinaryOp::Gt, &Value::Null, &Value::Int32(1)),
        Ok(Value::Bool(false))
    );
    assert_eq!(binary(BinaryOp::Eq, &Value::Null, &Value::Null), Ok(Value::Bool(true)));
    assert_eq!(
        binary(BinaryOp::Coalesce, &Value::Null, &Value::text("x")),
        Ok(Value::text("x"))
    );
}

#[test]
fn enums_compare_with_their_discriminant() {
    let active = Value::Enum(EnumValue::new(status(), 1));

    assert_eq!(binary(BinaryOp::Eq, &active, &Value::Int32(1)), Ok(Value::Bool(true)));
    assert_eq!(binary(BinaryOp::Ne, &Value::Int32(0), &active), Ok(Value::Bool(true)));
}

#[test]
fn text_adds_and_orders() {
    assert_eq!(
        binary(BinaryOp::Add, &Value::text("ab"), &Value::text("cd")),
        Ok(Value::text("abcd"))
    );
    assert_eq!(
        binary(BinaryOp::Lt, &Value::text("abc"), &Value::text("abd")),
        Ok(Value::Bool(true))
    );
}

#[test]
fn logical_operators_require_booleans() {
    assert_eq!(
        binary(BinaryOp::And, &Value::Bool(true), &Value::Bool(false)),
        Ok(Value::Bool(false))
    );
    assert!(matches!(
        binary(BinaryOp::Or, &Value::Int32(1), &Value::Bool(false)),
        Err(OpError::Undefined { .. })
    ));
    assert_eq!(logical_not(&Value::Bool(true)), Ok(Value::Bool(false)));
    assert_eq!(logical_not(&Value::Null), Ok(Value::Null));
}

#[test]
fn negate_checks_overflow() {
    assert_eq!(negate(&Value::Int32(5)), Ok(Value::Int32(-5)));
    assert_eq!(negate(&Value::Double(2.5)), Ok(Value::Double(-2.5)));
    assert!(matches!(negate(&Value::Int64(i64::MIN)), Err(OpError::Overflow { .. })));
}

#[test]
fn convert_follows_cast_semantics() {
    assert_eq!(convert(&Value::Double(3.9), &TypeRef::INT32), Ok(Value::Int32(3)));
    assert_eq!(convert(&Value::Int64(300), &TypeRef::BYTE), Ok(Value::Byte(44)));
    assert_eq!(
        convert(&Value::Null, &TypeRef::nullable(TypeRef::INT32)),
        Ok(Value::Null)
    );
    assert!(convert(&Value::Null, &TypeRef::INT32).is_err());
    assert_eq!(
        convert(&Value::Int32(1), &TypeRef::Enum(status())),
        Ok(Value::Enum(EnumValue::new(status(), 1)))
    );
    assert_eq!(
        convert(&Value::text("x"), &TypeRef::OBJECT),
        Ok(Value::text("x"))
    );
}

#[test]
fn natural_types_cover_scalar_values() {
    assert_eq!(Value::Int64(1).natural_type(), Some(TypeRef::INT64));
    assert_eq!(Value::text("a").natural_type(), Some(TypeRef::STRING));
    assert_eq!(Value::Null.natural_type(), None);
    assert_eq!(Value::List(vec![]).natural_type(), None);
}

#[test]
fn instance_tests_match_records_against_resources() {
    let row = Value::Record(RecordValue::typed(
        "Customer",
        vec![("Name".to_string(), Value::text("Ann"))],
    ));

    assert!(row.is_instance_of(&TypeRef::Resource(crate::types::ResourceType::new("Customer"))));
    assert!(!row.is_instance_of(&TypeRef::Resource(crate::types::ResourceType::new("Order"))));
    assert!(row.is_instance_of(&TypeRef::OBJECT));
    assert!(!Value::Null.is_instance_of(&TypeRef::OBJECT));
    assert_eq!(row.field("Name"), Some(&Value::text("Ann")));
}

#[test]
fn whole_second_detection() {
    let naive = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 30, 0))
        .expect("valid date");
    let with_millis = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_milli_opt(12, 30, 0, 250))
        .expect("valid date");

    assert!(DateTimeValue::utc(naive).is_whole_second());
    assert!(!DateTimeValue::utc(with_millis).is_whole_second());
}

#[test]
fn date_time_equality_ignores_the_kind() {
    use std::collections::hash_map::DefaultHasher;

    let naive = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .expect("valid date");
    let offset = FixedOffset::east_opt(2 * 3600).expect("valid offset");
    let local = DateTimeValue::local(naive, offset);
    let hash = |v: &DateTimeValue| {
        let mut hasher = DefaultHasher::new();
        v.hash(&mut hasher);
        hasher.finish()
    };

    assert_eq!(local, DateTimeValue::unspecified(naive));
    assert_eq!(local, DateTimeValue::utc(naive));
    assert_eq!(hash(&local), hash(&DateTimeValue::utc(naive)));
    assert_ne!(
        local,
        DateTimeValue::local(naive + chrono::TimeDelta::seconds(1), offset)
    );
}
