//! Functions callable by name without a declaration: `random`, `isKeyPressed`, `len`.
//! A user binding with the same name always wins.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::host::Host;
use crate::runtime::value::Value;

pub const BUILTINS: [&str; 3] = ["random", "isKeyPressed", "len"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Runs builtin `name`. `Ok(None)` when no builtin has that name.
pub fn call(
    name: &str,
    args: &[Value],
    host: &dyn Host,
    rng: &mut ChaCha8Rng,
    line: usize,
) -> Result<Option<Value>, RuntimeError> {
    let v = match name {
        "random" => {
            check_argc(name, args, 2, line)?;
            let min = as_number(name, &args[0], line)?;
            let max = as_number(name, &args[1], line)?;
            Value::Number(min + rng.r#gen::<f64>() * (max - min))
        }
        "isKeyPressed" => {
            check_argc(name, args, 1, line)?;
            let key = args[0].to_display_string().to_uppercase();
            Value::Bool(host.is_key_pressed(&key))
        }
        "len" => {
            check_argc(name, args, 1, line)?;
            match &args[0] {
                Value::Array(items) => Value::Number(items.len() as f64),
                Value::Str(s)       => Value::Number(s.chars().count() as f64),
                other => return Err(RuntimeError::type_mismatch(line, format!(
                    "`len` expects an array or string, got {}", other.type_name()
                ))),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn check_argc(name: &str, args: &[Value], expected: usize, line: usize) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::new(RuntimeErrorKind::ArgumentCount, line, format!(
            "`{name}` expects {expected} argument{}, got {}",
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

fn as_number(name: &str, v: &Value, line: usize) -> Result<f64, RuntimeError> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(RuntimeError::type_mismatch(line, format!(
            "`{name}` expects numbers, got {}", other.type_name()
        ))),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::host::Recorder;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn random_stays_in_range() {
        let host = Recorder::new();
        let mut rng = rng();
        for _ in 0..100 {
            let v = call("random", &[Value::Number(5.0), Value::Number(10.0)], &host, &mut rng, 1)
                .expect("random")
                .expect("builtin");
            match v {
                Value::Number(n) => assert!((5.0..10.0).contains(&n), "{n} out of range"),
                other => panic!("expected number, got {other:?}"),
            }
        }
    }

    #[test]
    fn random_is_reproducible_with_a_seed() {
        let host = Recorder::new();
        let args = [Value::Number(0.0), Value::Number(1.0)];
        let a = call("random", &args, &host, &mut rng(), 1).expect("ok").expect("some");
        let b = call("random", &args, &host, &mut rng(), 1).expect("ok").expect("some");
        assert!(a.equals(&b));
    }

    #[test]
    fn key_names_are_upper_cased() {
        let host = Recorder::new().with_key("space");
        let v = call("isKeyPressed", &[Value::str("Space")], &host, &mut rng(), 1)
            .expect("ok")
            .expect("some");
        assert!(matches!(v, Value::Bool(true)));
        let v = call("isKeyPressed", &[Value::str("a")], &host, &mut rng(), 1)
            .expect("ok")
            .expect("some");
        assert!(matches!(v, Value::Bool(false)));
    }

    #[test]
    fn len_of_array_and_string() {
        let host = Recorder::new();
        let arr = Value::array(vec![Value::Null, Value::Null, Value::Null]);
        let v = call("len", &[arr], &host, &mut rng(), 1).expect("ok").expect("some");
        assert!(v.equals(&Value::Number(3.0)));
        let v = call("len", &[Value::str("héllo")], &host, &mut rng(), 1).expect("ok").expect("some");
        assert!(v.equals(&Value::Number(5.0)));
    }

    #[test]
    fn len_of_number_is_a_type_error() {
        let host = Recorder::new();
        let err = call("len", &[Value::Number(3.0)], &host, &mut rng(), 4).expect_err("type error");
        assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);
        assert_eq!(err.line, 4);
    }

    #[test]
    fn wrong_arity() {
        let host = Recorder::new();
        let err = call("random", &[Value::Number(1.0)], &host, &mut rng(), 2).expect_err("arity");
        assert_eq!(err.kind, RuntimeErrorKind::ArgumentCount);
    }

    #[test]
    fn unknown_name_is_not_a_builtin() {
        let host = Recorder::new();
        assert!(call("sqrt", &[], &host, &mut rng(), 1).expect("ok").is_none());
        assert!(!is_builtin("sqrt"));
        assert!(is_builtin("len"));
    }
}
