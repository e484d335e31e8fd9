//! `xacro` namespace: processor hooks (§4.1) — `load_yaml`, `abs_filename`,
//! `arg`, message helpers, and `fatal`. These need the shared processing
//! context, so they register as `Builtin::Ctx` rather than `Builtin::Pure`.

use super::{arity_error, Builtin};
use crate::context::SharedContext;
use crate::error::{ContextError, XacroError};
use crate::value::Value;
use std::collections::HashMap;

pub fn register(table: &mut HashMap<&'static str, Builtin>) {
    table.insert("xacro.load_yaml", Builtin::Ctx(load_yaml));
    table.insert("xacro.abs_filename", Builtin::Ctx(abs_filename));
    table.insert("xacro.arg", Builtin::Ctx(arg));
    table.insert("xacro.warning", Builtin::Ctx(message));
    table.insert("xacro.error", Builtin::Ctx(message));
    table.insert("xacro.fatal", Builtin::Ctx(fatal));
}

fn text_arg(args: &[Value], idx: usize, fname: &str) -> Result<String, ContextError> {
    args.get(idx)
        .map(Value::stringify)
        .ok_or_else(|| arity_error(fname, "a string"))
}

fn load_yaml(args: &[Value], ctx: &SharedContext) -> Result<Value, ContextError> {
    let path = text_arg(args, 0, "xacro.load_yaml")?;
    let resolved = ctx.borrow().abs_filename(&path);
    crate::yaml::load_yaml(&resolved)
}

fn abs_filename(args: &[Value], ctx: &SharedContext) -> Result<Value, ContextError> {
    let path = text_arg(args, 0, "xacro.abs_filename")?;
    Ok(Value::Text(ctx.borrow().abs_filename(&path).display().to_string()))
}

fn arg(args: &[Value], ctx: &SharedContext) -> Result<Value, ContextError> {
    let name = text_arg(args, 0, "xacro.arg")?;
    ctx.borrow()
        .subst_args
        .get(&name)
        .cloned()
        .map(Value::Text)
        .ok_or_else(|| {
            ContextError::new(XacroError::ExtensionFailure(format!(
                "substitution arg `{name}` is not set"
            )))
        })
}

fn message(args: &[Value], ctx: &SharedContext) -> Result<Value, ContextError> {
    let text = text_arg(args, 0, "xacro.warning/xacro.error")?;
    ctx.borrow_mut().warn(text);
    Ok(Value::Boolean(true))
}

fn fatal(args: &[Value], _ctx: &SharedContext) -> Result<Value, ContextError> {
    let text = text_arg(args, 0, "xacro.fatal")?;
    Err(ContextError::new(XacroError::EvaluationFailure(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::new_shared;

    #[test]
    fn arg_reads_subst_args() {
        let ctx = new_shared();
        ctx.borrow_mut().subst_args.insert("size".into(), "42".into());
        let v = arg(&[Value::Text("size".into())], &ctx).unwrap();
        assert_eq!(v, Value::Text("42".to_string()));
    }

    #[test]
    fn fatal_always_errs() {
        let ctx = new_shared();
        assert!(fatal(&[Value::Text("boom".into())], &ctx).is_err());
    }

    #[test]
    fn message_records_a_diagnostic() {
        let ctx = new_shared();
        message(&[Value::Text("heads up".into())], &ctx).unwrap();
        assert_eq!(ctx.borrow().diagnostics.len(), 1);
    }
}
