//! Expression evaluation and the built-in function library

use std::cmp::Ordering;

use gridfile_formatting::parse_decimal;

use crate::parser::{BinaryOperator, Expr, UnaryOperator};
use crate::{ErrorValue, FormulaError, Value, ValueResolver};

/// A function argument: a single value or the cells of a range.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Scalar(Value),
    Range(Vec<Value>),
}

/// Evaluate a parsed expression against a resolver.
///
/// Spreadsheet errors (`#DIV/0!`, `#VALUE!`, ...) come back as
/// [`Value::Error`]; only unknown functions and wrong argument counts fail.
pub fn evaluate(expr: &Expr, resolver: &dyn ValueResolver) -> Result<Value, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Error(err) => Ok(Value::Error(*err)),
        Expr::Cell(addr) => Ok(resolver.get_cell(*addr)),
        Expr::Range(..) => Ok(Value::Error(ErrorValue::Value)),
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, resolver)?;
            Ok(apply_unary(*op, &value))
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, resolver)?;
            let right = evaluate(right, resolver)?;
            Ok(apply_binary(*op, &left, &right))
        }
        Expr::Call { name, args } => call(name, args, resolver),
    }
}

fn call(name: &str, args: &[Expr], resolver: &dyn ValueResolver) -> Result<Value, FormulaError> {
    // IF only evaluates the branch it takes.
    if name == "IF" {
        check_arity(name, args.len(), 2, Some(3))?;
        let condition = evaluate(&args[0], resolver)?;
        return match coerce_to_bool(&condition) {
            Ok(true) => evaluate(&args[1], resolver),
            Ok(false) => match args.get(2) {
                Some(branch) => evaluate(branch, resolver),
                None => Ok(Value::Bool(false)),
            },
            Err(err) => Ok(Value::Error(err)),
        };
    }

    let values = args
        .iter()
        .map(|arg| match arg {
            Expr::Range(start, end) => Ok(Arg::Range(resolver.get_range(*start, *end))),
            other => evaluate(other, resolver).map(Arg::Scalar),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (min_args, max_args, function): (usize, Option<usize>, fn(&[Arg]) -> Value) = match name {
        "SUM" => (1, None, sum),
        "AVERAGE" => (1, None, average),
        "MIN" => (1, None, min),
        "MAX" => (1, None, max),
        "COUNT" => (1, None, count),
        "COUNTA" => (1, None, counta),
        "ABS" => (1, Some(1), abs),
        "ROUND" => (1, Some(2), round),
        "AND" => (1, None, and_fn),
        "OR" => (1, None, or_fn),
        "NOT" => (1, Some(1), not_fn),
        "CONCATENATE" | "CONCAT" => (1, None, concat),
        "LEN" => (1, Some(1), len),
        "UPPER" => (1, Some(1), upper),
        "LOWER" => (1, Some(1), lower),
        "TRIM" => (1, Some(1), trim),
        _ => return Err(FormulaError::UnknownFunction(name.to_string())),
    };
    check_arity(name, values.len(), min_args, max_args)?;
    Ok(function(&values))
}

fn check_arity(
    name: &str,
    actual: usize,
    min_args: usize,
    max_args: Option<usize>,
) -> Result<(), FormulaError> {
    let too_few = actual < min_args;
    let too_many = max_args.is_some_and(|max| actual > max);
    if !too_few && !too_many {
        return Ok(());
    }
    let expected = match max_args {
        Some(max) if max == min_args => min_args.to_string(),
        Some(max) => format!("{min_args}..{max}"),
        None => format!("at least {min_args}"),
    };
    Err(FormulaError::InvalidArgCount {
        name: name.to_string(),
        expected,
        actual,
    })
}

fn apply_unary(op: UnaryOperator, value: &Value) -> Value {
    let number = match coerce_to_number(value) {
        Ok(n) => n,
        Err(err) => return Value::Error(err),
    };
    match op {
        UnaryOperator::Negate => Value::Number(-number),
        UnaryOperator::Plus => Value::Number(number),
        UnaryOperator::Percent => Value::Number(number / 100.0),
    }
}

fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOperator::Concat => {
            match (coerce_to_text(left), coerce_to_text(right)) {
                (Ok(l), Ok(r)) => Value::Text(l + &r),
                (Err(err), _) | (_, Err(err)) => Value::Error(err),
            }
        }
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => match compare_values(left, right) {
            Ok(ordering) => Value::Bool(match op {
                BinaryOperator::Equal => ordering == Ordering::Equal,
                BinaryOperator::NotEqual => ordering != Ordering::Equal,
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }),
            Err(err) => Value::Error(err),
        },
        _ => {
            let (l, r) = match (coerce_to_number(left), coerce_to_number(right)) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(err), _) | (_, Err(err)) => return Value::Error(err),
            };
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide if r == 0.0 => return Value::Error(ErrorValue::Div0),
                BinaryOperator::Divide => l / r,
                _ => l.powf(r),
            };
            if result.is_finite() {
                Value::Number(result)
            } else {
                Value::Error(ErrorValue::Num)
            }
        }
    }
}

/// Numbers sort before text, text before booleans; text compares
/// case-insensitively. Empty takes the type of the other side.
fn compare_values(left: &Value, right: &Value) -> Result<Ordering, ErrorValue> {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Number(_) | Value::Empty => 0,
            Value::Text(_) => 1,
            _ => 2,
        }
    }

    match (left, right) {
        (Value::Error(err), _) | (_, Value::Error(err)) => Err(*err),
        (Value::Empty, Value::Text(s)) => Ok("".cmp(s.to_lowercase().as_str())),
        (Value::Text(s), Value::Empty) => Ok(s.to_lowercase().as_str().cmp("")),
        (Value::Empty, Value::Bool(b)) => Ok(false.cmp(b)),
        (Value::Bool(b), Value::Empty) => Ok(b.cmp(&false)),
        (Value::Text(l), Value::Text(r)) => Ok(l.to_lowercase().cmp(&r.to_lowercase())),
        (Value::Bool(l), Value::Bool(r)) => Ok(l.cmp(r)),
        (l, r) if rank(l) == 0 && rank(r) == 0 => {
            let l = coerce_to_number(l)?;
            let r = coerce_to_number(r)?;
            Ok(l.partial_cmp(&r).unwrap_or(Ordering::Equal))
        }
        (l, r) => Ok(rank(l).cmp(&rank(r))),
    }
}

fn coerce_to_number(value: &Value) -> Result<f64, ErrorValue> {
    match value {
        Value::Empty => Ok(0.0),
        Value::Number(n) => Ok(*n),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => parse_decimal(s).ok_or(ErrorValue::Value),
        Value::Error(err) => Err(*err),
    }
}

fn coerce_to_text(value: &Value) -> Result<String, ErrorValue> {
    match value {
        Value::Error(err) => Err(*err),
        other => Ok(other.to_display()),
    }
}

/// Coerce a value to a boolean.
pub fn coerce_to_bool(value: &Value) -> Result<bool, ErrorValue> {
    match value {
        Value::Empty => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
        Value::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
        Value::Text(_) => Err(ErrorValue::Value),
        Value::Error(err) => Err(*err),
    }
}

fn first_scalar(args: &[Arg]) -> Value {
    match args.first() {
        Some(Arg::Scalar(value)) => value.clone(),
        Some(Arg::Range(_)) => Value::Error(ErrorValue::Value),
        None => Value::Empty,
    }
}

/// Numbers taking part in an aggregate.
///
/// Direct arguments are coerced; range cells holding text, booleans or
/// nothing are skipped. Any error value wins.
fn numbers(args: &[Arg]) -> Result<Vec<f64>, ErrorValue> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Arg::Scalar(Value::Empty) => {}
            Arg::Scalar(value) => out.push(coerce_to_number(value)?),
            Arg::Range(cells) => {
                for cell in cells {
                    match cell {
                        Value::Number(n) => out.push(*n),
                        Value::Error(err) => return Err(*err),
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(out)
}

fn with_numbers(args: &[Arg], f: impl FnOnce(Vec<f64>) -> Value) -> Value {
    match numbers(args) {
        Ok(values) => f(values),
        Err(err) => Value::Error(err),
    }
}

/// SUM of numeric arguments
pub fn sum(args: &[Arg]) -> Value {
    with_numbers(args, |values| Value::Number(values.iter().sum()))
}

/// AVERAGE; `#DIV/0!` when nothing is numeric
pub fn average(args: &[Arg]) -> Value {
    with_numbers(args, |values| {
        if values.is_empty() {
            Value::Error(ErrorValue::Div0)
        } else {
            Value::Number(values.iter().sum::<f64>() / values.len() as f64)
        }
    })
}

/// MIN; 0 when nothing is numeric
pub fn min(args: &[Arg]) -> Value {
    with_numbers(args, |values| {
        Value::Number(values.into_iter().reduce(f64::min).unwrap_or(0.0))
    })
}

/// MAX; 0 when nothing is numeric
pub fn max(args: &[Arg]) -> Value {
    with_numbers(args, |values| {
        Value::Number(values.into_iter().reduce(f64::max).unwrap_or(0.0))
    })
}

/// COUNT of numeric values
pub fn count(args: &[Arg]) -> Value {
    let mut total = 0usize;
    for arg in args {
        match arg {
            Arg::Scalar(value) => {
                if matches!(value, Value::Number(_) | Value::Bool(_))
                    || matches!(value, Value::Text(s) if parse_decimal(s).is_some())
                {
                    total += 1;
                }
            }
            Arg::Range(cells) => {
                total += cells.iter().filter(|c| matches!(c, Value::Number(_))).count();
            }
        }
    }
    Value::Number(total as f64)
}

/// COUNTA of non-empty values
pub fn counta(args: &[Arg]) -> Value {
    let total: usize = args
        .iter()
        .map(|arg| match arg {
            Arg::Scalar(_) => 1,
            Arg::Range(cells) => cells.iter().filter(|c| **c != Value::Empty).count(),
        })
        .sum();
    Value::Number(total as f64)
}

pub fn abs(args: &[Arg]) -> Value {
    match coerce_to_number(&first_scalar(args)) {
        Ok(n) => Value::Number(n.abs()),
        Err(err) => Value::Error(err),
    }
}

/// ROUND half away from zero to the given number of places
pub fn round(args: &[Arg]) -> Value {
    let number = coerce_to_number(&first_scalar(args));
    let places = match args.get(1) {
        Some(Arg::Scalar(value)) => coerce_to_number(value),
        Some(Arg::Range(_)) => Err(ErrorValue::Value),
        None => Ok(0.0),
    };
    match (number, places) {
        (Ok(n), Ok(places)) => {
            let multiplier = 10_f64.powi(places.trunc() as i32);
            Value::Number((n * multiplier).round() / multiplier)
        }
        (Err(err), _) | (_, Err(err)) => Value::Error(err),
    }
}

fn logical(args: &[Arg], fold: fn(bool, bool) -> bool, seed: bool) -> Value {
    let mut result = seed;
    for arg in args {
        let values: &[Value] = match arg {
            Arg::Scalar(value) => std::slice::from_ref(value),
            Arg::Range(cells) => cells,
        };
        for value in values {
            if matches!(arg, Arg::Range(_)) && matches!(value, Value::Empty | Value::Text(_)) {
                continue;
            }
            match coerce_to_bool(value) {
                Ok(b) => result = fold(result, b),
                Err(err) => return Value::Error(err),
            }
        }
    }
    Value::Bool(result)
}

pub fn and_fn(args: &[Arg]) -> Value {
    logical(args, |acc, b| acc && b, true)
}

pub fn or_fn(args: &[Arg]) -> Value {
    logical(args, |acc, b| acc || b, false)
}

pub fn not_fn(args: &[Arg]) -> Value {
    match coerce_to_bool(&first_scalar(args)) {
        Ok(b) => Value::Bool(!b),
        Err(err) => Value::Error(err),
    }
}

/// CONCATENATE / CONCAT; ranges are joined cell by cell
pub fn concat(args: &[Arg]) -> Value {
    let mut result = String::new();
    for arg in args {
        let values: &[Value] = match arg {
            Arg::Scalar(value) => std::slice::from_ref(value),
            Arg::Range(cells) => cells,
        };
        for value in values {
            match coerce_to_text(value) {
                Ok(text) => result.push_str(&text),
                Err(err) => return Value::Error(err),
            }
        }
    }
    Value::Text(result)
}

fn map_text(args: &[Arg], f: impl FnOnce(String) -> Value) -> Value {
    match coerce_to_text(&first_scalar(args)) {
        Ok(text) => f(text),
        Err(err) => Value::Error(err),
    }
}

pub fn len(args: &[Arg]) -> Value {
    map_text(args, |text| Value::Number(text.chars().count() as f64))
}

pub fn upper(args: &[Arg]) -> Value {
    map_text(args, |text| Value::Text(text.to_uppercase()))
}

pub fn lower(args: &[Arg]) -> Value {
    map_text(args, |text| Value::Text(text.to_lowercase()))
}

/// TRIM strips the ends and collapses inner runs of spaces
pub fn trim(args: &[Arg]) -> Value {
    map_text(args, |text| {
        Value::Text(text.split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use crate::CellAddress;

    struct Column(Vec<Value>);

    impl ValueResolver for Column {
        fn get_cell(&self, addr: CellAddress) -> Value {
            if addr.col != 0 {
                return Value::Empty;
            }
            self.0.get(addr.row as usize).cloned().unwrap_or_default()
        }
    }

    fn eval(formula: &str) -> Value {
        let column = Column(vec![
            Value::Number(4.0),
            Value::Text("b".to_string()),
            Value::Number(6.0),
            Value::Empty,
            Value::Bool(true),
        ]);
        evaluate(&parse_formula(formula).unwrap(), &column).unwrap()
    }

    #[test]
    fn test_aggregates_over_ranges() {
        assert_eq!(eval("SUM(A1:A5)"), Value::Number(10.0));
        assert_eq!(eval("AVERAGE(A1:A5)"), Value::Number(5.0));
        assert_eq!(eval("MIN(A1:A5, 2)"), Value::Number(2.0));
        assert_eq!(eval("MAX(A1:A5)"), Value::Number(6.0));
        assert_eq!(eval("COUNT(A1:A5)"), Value::Number(2.0));
        assert_eq!(eval("COUNTA(A1:A5)"), Value::Number(4.0));
        assert_eq!(eval("AVERAGE(A4:A4)"), Value::Error(ErrorValue::Div0));
    }

    #[test]
    fn test_operators() {
        assert_eq!(eval("2^3^2"), Value::Number(64.0));
        assert_eq!(eval("-2^2"), Value::Number(4.0));
        assert_eq!(eval("50%"), Value::Number(0.5));
        assert_eq!(eval("A1&\"x\"&1.5"), Value::Text("4x1.5".to_string()));
        assert_eq!(eval("A2+1"), Value::Error(ErrorValue::Value));
        assert_eq!(eval("\"10\"*2"), Value::Number(20.0));
        assert_eq!(eval("A1:A2"), Value::Error(ErrorValue::Value));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("A1>3"), Value::Bool(true));
        assert_eq!(eval("\"abc\"=\"ABC\""), Value::Bool(true));
        assert_eq!(eval("A4=0"), Value::Bool(true));
        assert_eq!(eval("1<\"a\""), Value::Bool(true));
        assert_eq!(eval("A1<>4"), Value::Bool(false));
    }

    #[test]
    fn test_logical_and_text() {
        assert_eq!(eval("IF(A1>5,\"big\",\"small\")"), Value::Text("small".to_string()));
        assert_eq!(eval("IF(FALSE,1/0)"), Value::Bool(false));
        assert_eq!(eval("AND(A1>1, TRUE)"), Value::Bool(true));
        assert_eq!(eval("OR(A1:A5)"), Value::Bool(true));
        assert_eq!(eval("NOT(0)"), Value::Bool(true));
        assert_eq!(eval("CONCATENATE(A1:A3)"), Value::Text("4b6".to_string()));
        assert_eq!(eval("LEN(\"hello\")"), Value::Number(5.0));
        assert_eq!(eval("UPPER(A2)"), Value::Text("B".to_string()));
        assert_eq!(eval("TRIM(\"  a   b \")"), Value::Text("a b".to_string()));
        assert_eq!(eval("ROUND(1.2345, 1)"), Value::Number(1.2));
        assert_eq!(eval("ROUND(2.5)"), Value::Number(3.0));
        assert_eq!(eval("ABS(-3)"), Value::Number(3.0));
    }

    #[test]
    fn test_errors_propagate() {
        assert_eq!(eval("SUM(1, #N/A)"), Value::Error(ErrorValue::NA));
        assert_eq!(eval("1/0+1"), Value::Error(ErrorValue::Div0));
    }

    #[test]
    fn test_argument_count_is_checked() {
        let column = Column(Vec::new());
        let err = evaluate(&parse_formula("ABS(1,2)").unwrap(), &column).unwrap_err();
        assert_eq!(
            err,
            FormulaError::InvalidArgCount {
                name: "ABS".to_string(),
                expected: "1".to_string(),
                actual: 2,
            }
        );
    }
}
