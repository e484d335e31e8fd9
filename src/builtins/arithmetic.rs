//! `math` namespace: functions and constants, exposed both as `math.foo`
//! and, for backward compatibility, bare at the top level (§4.1).

use super::{arg_f64, Builtin};
use crate::value::Value;
use std::collections::HashMap;

pub fn register(table: &mut HashMap<&'static str, Builtin>) {
    macro_rules! unary {
        ($name:literal, $f:expr) => {
            let func: fn(&[Value]) -> Result<Value, crate::error::ContextError> = |args| {
                let x = arg_f64(args, 0, $name)?;
                Ok(Value::Float(($f)(x)))
            };
            table.insert($name, Builtin::Pure(func));
            table.insert(concat!("math.", $name), Builtin::Pure(func));
        };
    }

    unary!("sqrt", f64::sqrt);
    unary!("sin", f64::sin);
    unary!("cos", f64::cos);
    unary!("tan", f64::tan);
    unary!("asin", f64::asin);
    unary!("acos", f64::acos);
    unary!("atan", f64::atan);
    unary!("floor", f64::floor);
    unary!("ceil", f64::ceil);
    unary!("fabs", f64::abs);
    unary!("exp", f64::exp);
    unary!("log", f64::ln);
    unary!("log10", f64::log10);
    unary!("radians", f64::to_radians);
    unary!("degrees", f64::to_degrees);

    let atan2: fn(&[Value]) -> Result<Value, crate::error::ContextError> = |args| {
        let y = arg_f64(args, 0, "atan2")?;
        let x = arg_f64(args, 1, "atan2")?;
        Ok(Value::Float(y.atan2(x)))
    };
    table.insert("atan2", Builtin::Pure(atan2));
    table.insert("math.atan2", Builtin::Pure(atan2));

    let pow: fn(&[Value]) -> Result<Value, crate::error::ContextError> = |args| {
        let base = arg_f64(args, 0, "pow")?;
        let exp = arg_f64(args, 1, "pow")?;
        Ok(Value::Float(base.powf(exp)))
    };
    table.insert("pow", Builtin::Pure(pow));
    table.insert("math.pow", Builtin::Pure(pow));

    table.insert("pi", Builtin::Const(Value::Float(std::f64::consts::PI)));
    table.insert("math.pi", Builtin::Const(Value::Float(std::f64::consts::PI)));
    table.insert("e", Builtin::Const(Value::Float(std::f64::consts::E)));
    table.insert("math.e", Builtin::Const(Value::Float(std::f64::consts::E)));
}

#[cfg(test)]
mod tests {
    use crate::scope::Scope;

    #[test]
    fn sqrt_of_sixteen() {
        let scope = Scope::root();
        assert_eq!(
            crate::expr::evaluate("sqrt(16)", &scope).unwrap(),
            crate::value::Value::Float(4.0)
        );
    }

    #[test]
    fn pi_constant() {
        let scope = Scope::root();
        let v = crate::expr::evaluate("math.pi", &scope).unwrap();
        assert_eq!(v, crate::value::Value::Float(std::f64::consts::PI));
    }
}
