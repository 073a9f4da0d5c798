//! Date/time members and construction.

use crate::{
    expr::{Constructor, MemberInfo, MemberRef},
    library::DATE_TIME,
    types::TypeRef,
    value::{DateTimeValue, Value},
};
use chrono::{Datelike, NaiveDate, Timelike};
use std::sync::{Arc, LazyLock};

fn component(name: &str, f: fn(&DateTimeValue) -> u32) -> MemberRef {
    MemberInfo::new(DATE_TIME, name, TypeRef::INT32)
        .with_getter(move |value| match value {
            Value::DateTime(dt) => i32::try_from(f(dt)).ok().map(Value::Int32),
            _ => None,
        })
        .into_ref()
}

static YEAR: LazyLock<MemberRef> = LazyLock::new(|| {
    MemberInfo::new(DATE_TIME, "Year", TypeRef::INT32)
        .with_getter(|value| match value {
            Value::DateTime(dt) => Some(Value::Int32(dt.naive.year())),
            _ => None,
        })
        .into_ref()
});

static MONTH: LazyLock<MemberRef> = LazyLock::new(|| component("Month", |dt| dt.naive.month()));
static DAY: LazyLock<MemberRef> = LazyLock::new(|| component("Day", |dt| dt.naive.day()));
static HOUR: LazyLock<MemberRef> = LazyLock::new(|| component("Hour", |dt| dt.naive.hour()));
static MINUTE: LazyLock<MemberRef> = LazyLock::new(|| component("Minute", |dt| dt.naive.minute()));
static SECOND: LazyLock<MemberRef> = LazyLock::new(|| component("Second", |dt| dt.naive.second()));

#[must_use]
pub fn year() -> MemberRef {
    YEAR.clone()
}

#[must_use]
pub fn month() -> MemberRef {
    MONTH.clone()
}

#[must_use]
pub fn day() -> MemberRef {
    DAY.clone()
}

#[must_use]
pub fn hour() -> MemberRef {
    HOUR.clone()
}

#[must_use]
pub fn minute() -> MemberRef {
    MINUTE.clone()
}

#[must_use]
pub fn second() -> MemberRef {
    SECOND.clone()
}

/// `new DateTime(year, month, day)`, producing an unspecified-kind value.
#[must_use]
pub fn constructor() -> Constructor {
    Constructor {
        ty: TypeRef::DATE_TIME,
        implementation: Arc::new(|args: &[Value]| match args {
            [year, month, day] => {
                let date = NaiveDate::from_ymd_opt(
                    i32::try_from(year.as_i64()?).ok()?,
                    u32::try_from(month.as_i64()?).ok()?,
                    u32::try_from(day.as_i64()?).ok()?,
                )?;
                Some(Value::DateTime(DateTimeValue::unspecified(
                    date.and_hms_opt(0, 0, 0)?,
                )))
            }
            _ => None,
        }),
    }
}
