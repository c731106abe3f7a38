//! Host-side value tree handed to the packing engine

/// A numeric scalar or a nested sequence of values
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Seq(Vec<Value>),
}

impl Value {
    /// Build a sequence from plain numbers
    pub fn nums<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<f64>,
    {
        Value::Seq(items.into_iter().map(|n| Value::Num(n.into())).collect())
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Seq(_) => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Num(_) => None,
            Value::Seq(items) => Some(items),
        }
    }

    /// Tuple-style rendering used in shape error messages
    pub fn repr(&self) -> String {
        match self {
            Value::Num(n) => fmt_num(*n),
            Value::Seq(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                if parts.len() == 1 {
                    format!("({},)", parts[0])
                } else {
                    format!("({})", parts.join(", "))
                }
            }
        }
    }
}

fn fmt_num(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.1}")
    } else {
        format!("{n}")
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<Vec<f64>> for Value {
    fn from(items: Vec<f64>) -> Self {
        Value::nums(items)
    }
}

impl From<&[f64]> for Value {
    fn from(items: &[f64]) -> Self {
        Value::nums(items.iter().copied())
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(items: [f64; N]) -> Self {
        Value::nums(items)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}
