use mysql_async::prelude::ToValue;
use tablet_core::stmt::Value as CoreValue;

#[derive(Debug)]
pub struct Value(CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl Value {
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Converts a MySQL value to a Tablet value. Values are cast to their
    /// logical column types by the caller.
    pub fn from_sql(value: mysql_async::Value) -> Self {
        use mysql_async::Value as SqlValue;

        let core_value = match value {
            SqlValue::NULL => CoreValue::Null,
            SqlValue::Int(v) => CoreValue::I64(v),
            SqlValue::UInt(v) => match i64::try_from(v) {
                Ok(v) => CoreValue::I64(v),
                Err(_) => CoreValue::String(v.to_string()),
            },
            SqlValue::Float(v) => CoreValue::F64(v as f64),
            SqlValue::Double(v) => CoreValue::F64(v),
            SqlValue::Bytes(bytes) => CoreValue::String(String::from_utf8_lossy(&bytes).into_owned()),
            SqlValue::Date(year, month, day, hour, minute, second, micros) => {
                CoreValue::String(format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
                ))
            }
            SqlValue::Time(negative, days, hours, minutes, seconds, micros) => {
                let sign = if negative { "-" } else { "" };
                let hours = days * 24 + hours as u32;
                CoreValue::String(format!(
                    "{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
                ))
            }
        };

        Value(core_value)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> mysql_async::Value {
        match &self.0 {
            CoreValue::Bool(value) => value.to_value(),
            CoreValue::I64(value) => value.to_value(),
            CoreValue::F64(value) => value.to_value(),
            CoreValue::Null => mysql_async::Value::NULL,
            CoreValue::String(value) => value.to_value(),
            CoreValue::List(_) | CoreValue::Record(_) | CoreValue::Pending(_) => {
                panic!("value cannot be bound as a parameter; value={:?}", self.0)
            }
        }
    }
}
