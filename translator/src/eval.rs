use lazy_static::lazy_static;
use regex::Regex;

use crate::context::Context;
use crate::error::RenderError;
use crate::operand::Operand;

lazy_static! {
    static ref BINARY_OP_RE: Regex =
        Regex::new(r"^([^ \t]+)[ \t]+([^ \t]+)[ \t]+([^ \t]+)$").unwrap();
    static ref INTEGER_RE: Regex = Regex::new(r"^(-?[0-9]+)$").unwrap();
    // TODO: escape sequences inside string literals are unsupported.
    static ref STRING_RE: Regex = Regex::new(r#"^(['"])([^'"]*)(['"])$"#).unwrap();
}

const COMPARE_OPS: &[&str] = &["==", "===", "!=", "!==", "<", "<=", ">", ">="];
const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%="];

/// Recognize an operand from a source token under a context.
///
/// A token naming a variable reads that variable first; the result is
/// then classified as boolean, integer, quoted string, or (for variable
/// values only) bare string.
pub fn to_operand(context: &Context, token: &str) -> Result<Operand, RenderError> {
    let value = context.variable(token).unwrap_or(token);

    if value == "true" {
        return Ok(Operand::Bool(true));
    }
    if value == "false" {
        return Ok(Operand::Bool(false));
    }
    if INTEGER_RE.is_match(value) {
        let v = value
            .parse::<i64>()
            .map_err(|_| RenderError::syntax(format!("integer out of range '{}'", value)))?;
        return Ok(Operand::Int(v));
    }
    if let Some(m) = STRING_RE.captures(value) {
        if m[1] != m[3] {
            return Err(RenderError::syntax(format!(
                "mismatched quotes in '{}'",
                value
            )));
        }
        return Ok(Operand::Str(m[2].to_string()));
    }
    if context.has_variable(token) {
        return Ok(Operand::Str(value.to_string()));
    }
    Err(RenderError::syntax(format!("unknown operand '{}'", token)))
}

/// Compare two operands with a binary comparison operator.
pub fn compare(lhs: &Operand, op: &str, rhs: &Operand) -> Result<bool, RenderError> {
    let equality = match op {
        "==" | "===" => Some(true),
        "!=" | "!==" => Some(false),
        _ => None,
    };

    match (lhs, rhs) {
        (Operand::Bool(lv), rhs) => {
            // Booleans only support equality; the right side coerces.
            let rv = match rhs {
                Operand::Bool(rv) => *rv,
                Operand::Int(rv) => *rv != 0,
                Operand::Str(rv) => !rv.is_empty(),
            };
            match equality {
                Some(eq) => Ok((*lv == rv) == eq),
                None => Err(unsupported(lhs, op, rhs)),
            }
        }
        (Operand::Int(lv), Operand::Int(rv)) => match op {
            "==" | "===" => Ok(lv == rv),
            "!=" | "!==" => Ok(lv != rv),
            "<" => Ok(lv < rv),
            "<=" => Ok(lv <= rv),
            ">" => Ok(lv > rv),
            ">=" => Ok(lv >= rv),
            _ => Err(unsupported(lhs, op, rhs)),
        },
        (Operand::Int(lv), Operand::Bool(rv)) => match equality {
            Some(eq) => Ok(((*lv != 0) == *rv) == eq),
            None => Err(unsupported(lhs, op, rhs)),
        },
        (Operand::Int(lv), Operand::Str(rv)) => match equality {
            Some(eq) => Ok((lv.to_string() == *rv) == eq),
            None => Err(unsupported(lhs, op, rhs)),
        },
        (Operand::Str(lv), rhs) => match equality {
            Some(eq) => Ok((*lv == rhs.to_string()) == eq),
            None => Err(unsupported(lhs, op, rhs)),
        },
    }
}

fn unsupported(lhs: &Operand, op: &str, rhs: &Operand) -> RenderError {
    RenderError::syntax(format!(
        "operator '{}' is not supported between {} and {}",
        op,
        lhs.type_name(),
        rhs.type_name()
    ))
}

/// Assign a value to a variable, returning the updated context.
///
/// Compound operators require an existing target. `+=` concatenates for
/// string targets and adds for integer ones; the remaining arithmetic
/// operators require integers on both sides.
pub fn assign(
    mut context: Context,
    variable: &str,
    op: &str,
    value: &Operand,
) -> Result<Context, RenderError> {
    if !context.has_variable(variable) && op != "=" {
        return Err(RenderError::syntax(format!(
            "assignment target '{}' is not defined",
            variable
        )));
    }

    if op == "=" {
        context.set_variable(variable, &value.to_string())?;
        return Ok(context);
    }

    match to_operand(&context, variable)? {
        Operand::Str(current) => {
            if op != "+=" {
                return Err(RenderError::syntax(format!(
                    "operator '{}' is not supported on string variable '{}'",
                    op, variable
                )));
            }
            context.set_variable(variable, &format!("{}{}", current, value))?;
        }
        Operand::Int(current) => {
            let next = match value {
                Operand::Str(s) if op == "+=" => format!("{}{}", current, s),
                Operand::Int(rhs) => match op {
                    "+=" => (current + rhs).to_string(),
                    "-=" => (current - rhs).to_string(),
                    "*=" => (current * rhs).to_string(),
                    "/=" => {
                        if *rhs == 0 {
                            return Err(RenderError::syntax("division by zero"));
                        }
                        (current / rhs).to_string()
                    }
                    "%=" => {
                        if *rhs == 0 {
                            return Err(RenderError::syntax("modulo by zero"));
                        }
                        (current % rhs).to_string()
                    }
                    _ => return Err(RenderError::syntax(format!("unknown operator '{}'", op))),
                },
                _ => {
                    return Err(RenderError::syntax(format!(
                        "operator '{}' is not supported between integer and {}",
                        op,
                        value.type_name()
                    )))
                }
            };
            context.set_variable(variable, &next)?;
        }
        Operand::Bool(_) => {
            return Err(RenderError::syntax(format!(
                "operator '{}' is not supported on boolean variable '{}'",
                op, variable
            )));
        }
    }
    Ok(context)
}

/// Evaluate a binary expression: `<lhs> <op> <rhs>`.
///
/// Comparisons yield their result; assignments update the context and
/// yield true. There is no operator precedence, grouping, or bare
/// truthiness: anything else is a syntax error.
pub fn evaluate(context: &Context, expression: &str) -> Result<(bool, Context), RenderError> {
    let m = BINARY_OP_RE.captures(expression).ok_or_else(|| {
        RenderError::syntax(format!("unsupported expression '{}'", expression))
    })?;
    let op = &m[2];
    let rhs = to_operand(context, &m[3])?;

    if COMPARE_OPS.contains(&op) {
        let lhs = to_operand(context, &m[1])?;
        Ok((compare(&lhs, op, &rhs)?, context.clone()))
    } else if ASSIGN_OPS.contains(&op) {
        Ok((true, assign(context.clone(), &m[1], op, &rhs)?))
    } else {
        Err(RenderError::syntax(format!("unknown operator '{}'", op)))
    }
}
