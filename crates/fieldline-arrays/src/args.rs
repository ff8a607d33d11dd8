//! Positional mutator arguments

use crate::error::{ArrayError, Result};
use fieldline_core::Value;

/// Typed access to the arguments of one mutator call
pub(crate) struct Args<'a> {
    mutator: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(mutator: &'static str, values: &'a [Value]) -> Self {
        Self { mutator, values }
    }

    /// The field name, always the first argument
    pub fn name(&self) -> Result<&'a str> {
        self.values
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| self.invalid(0, "a field name"))
    }

    pub fn index(&self, position: usize) -> Result<usize> {
        self.values
            .get(position)
            .and_then(Value::as_index)
            .ok_or_else(|| self.invalid(position, "a non-negative index"))
    }

    /// A value argument; missing means null
    pub fn value(&self, position: usize) -> Value {
        self.values.get(position).cloned().unwrap_or(Value::Null)
    }

    /// A list argument; missing or null means empty
    pub fn list(&self, position: usize) -> Result<Vec<Value>> {
        match self.values.get(position) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list.to_vec()),
            Some(_) => Err(self.invalid(position, "a list")),
        }
    }

    pub fn indexes(&self, position: usize) -> Result<Vec<usize>> {
        self.list(position)?
            .iter()
            .map(|value| {
                value
                    .as_index()
                    .ok_or_else(|| self.invalid(position, "a list of indexes"))
            })
            .collect()
    }

    fn invalid(&self, position: usize, expected: &'static str) -> ArrayError {
        ArrayError::InvalidArgument {
            mutator: self.mutator,
            position,
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let values = vec![
            Value::from("items"),
            Value::from(2i64),
            Value::from(vec![3i64, 1]),
        ];
        let args = Args::new("test", &values);
        assert_eq!(args.name().unwrap(), "items");
        assert_eq!(args.index(1).unwrap(), 2);
        assert_eq!(args.indexes(2).unwrap(), vec![3, 1]);
        assert_eq!(args.value(5), Value::Null);
        assert!(args.list(5).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_arguments() {
        let values = vec![Value::from(1i64), Value::from(-1i64)];
        let args = Args::new("remove", &values);
        assert!(matches!(
            args.name(),
            Err(ArrayError::InvalidArgument { position: 0, .. })
        ));
        assert!(matches!(
            args.index(1),
            Err(ArrayError::InvalidArgument { mutator: "remove", position: 1, .. })
        ));
        assert!(args.list(1).is_err());
    }
}
