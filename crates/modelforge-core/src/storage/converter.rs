use crate::reflect::ScalarType;
use crate::{bail, err, Result, Value};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Converts property values to and from the representation the store
/// holds.
///
/// `Value::Null` passes through both directions unchanged.
pub trait ValueConverter: Send + Sync + fmt::Debug {
    /// Scalar type of the property's values
    fn model_type(&self) -> ScalarType;

    /// Scalar type of the stored values
    fn provider_type(&self) -> ScalarType;

    fn to_provider(&self, value: &Value) -> Result<Value>;

    fn from_provider(&self, value: &Value) -> Result<Value>;
}

/// A shared handle to a [`ValueConverter`]. Two handles are equal when they
/// point at the same converter.
#[derive(Clone)]
pub struct ConverterRef(Arc<dyn ValueConverter>);

impl ConverterRef {
    pub fn new(converter: impl ValueConverter + 'static) -> ConverterRef {
        ConverterRef(Arc::new(converter))
    }
}

impl Deref for ConverterRef {
    type Target = dyn ValueConverter;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for ConverterRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ConverterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Stores booleans as the integers `0` and `1`.
#[derive(Debug, Default)]
pub struct BoolToZeroOne;

impl ValueConverter for BoolToZeroOne {
    fn model_type(&self) -> ScalarType {
        ScalarType::Bool
    }

    fn provider_type(&self) -> ScalarType {
        ScalarType::I32
    }

    fn to_provider(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::I32(i32::from(*b))),
            _ => bail!("expected a boolean; value={value}"),
        }
    }

    fn from_provider(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match value.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => bail!("expected 0 or 1; value={value}"),
        }
    }
}

/// Stores numbers as their decimal text.
#[derive(Debug)]
pub struct NumberToString {
    model_type: ScalarType,
}

impl NumberToString {
    /// Returns `None` if `model_type` is not numeric.
    pub fn new(model_type: ScalarType) -> Option<NumberToString> {
        model_type.is_numeric().then_some(NumberToString { model_type })
    }
}

impl ValueConverter for NumberToString {
    fn model_type(&self) -> ScalarType {
        self.model_type
    }

    fn provider_type(&self) -> ScalarType {
        ScalarType::String
    }

    fn to_provider(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::I16(_) | Value::I32(_) | Value::I64(_) | Value::U8(_) | Value::F32(_) | Value::F64(_) => {
                Ok(Value::String(value.to_string()))
            }
            _ => bail!("expected a number; value={value}"),
        }
    }

    fn from_provider(&self, value: &Value) -> Result<Value> {
        let text = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(text) => text.trim(),
            _ => bail!("expected text; value={value}"),
        };

        Ok(match self.model_type {
            ScalarType::I16 => Value::I16(text.parse()?),
            ScalarType::I32 => Value::I32(text.parse()?),
            ScalarType::I64 => Value::I64(text.parse()?),
            ScalarType::U8 => Value::U8(text.parse()?),
            ScalarType::F32 => Value::F32(
                text.parse()
                    .map_err(|_| err!("`{text}` is not a number"))?,
            ),
            ScalarType::F64 => Value::F64(
                text.parse()
                    .map_err(|_| err!("`{text}` is not a number"))?,
            ),
            ty => bail!("no value representation for {ty}"),
        })
    }
}
