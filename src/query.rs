//! Bridge to the jq engine.
//!
//! Queries are validated when a pipeline is built and compiled on every
//! execution, against the variable names of that execution in sorted order.
//! Compiled filters are reference-counted internally and cannot be shared
//! across threads, so they never outlive the call that created them.

use std::collections::BTreeMap;
use std::rc::Rc;

use jaq_interpret::{Ctx, Filter, FilterT, ParseCtx, RcIter, Val};
use num_bigint::BigInt;

use crate::error::QueryError;
use crate::options::CompilerOption;
use crate::value::Value;

/// Variable bound to the environment object.
const ENV_VAR: &str = "ENV";

/// A syntactically valid query plus the compiler options it runs with.
#[derive(Debug, Clone)]
pub(crate) struct Query {
    text: String,
    definitions: Vec<String>,
    environ: Option<Vec<(String, String)>>,
}

impl Query {
    /// Check the syntax of `text` and of any extra definitions.
    pub(crate) fn parse(text: &str, options: &[CompilerOption]) -> Result<Query, QueryError> {
        let (main, errs) = jaq_parse::parse(text, jaq_parse::main());
        if main.is_none() || !errs.is_empty() {
            return Err(QueryError::parse(text, error_strings(errs)));
        }

        let mut definitions = Vec::new();
        let mut environ = None;
        for option in options {
            match option {
                CompilerOption::Definitions(defs) => {
                    let (parsed, errs) = jaq_parse::parse(defs, jaq_parse::defs());
                    if parsed.is_none() || !errs.is_empty() {
                        return Err(QueryError::parse(defs, error_strings(errs)));
                    }
                    definitions.push(defs.clone());
                }
                CompilerOption::Environ(vars) => environ = Some(vars.clone()),
            }
        }

        Ok(Query {
            text: text.to_string(),
            definitions,
            environ,
        })
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Compile the query with `variables` bound. Names are given without `$`.
    pub(crate) fn compile(
        &self,
        variables: BTreeMap<String, Value>,
    ) -> Result<Compiled, QueryError> {
        let mut vars: BTreeMap<String, Val> = variables
            .into_iter()
            .map(|(name, value)| (name, to_val(value)))
            .collect();
        if !vars.contains_key(ENV_VAR) {
            vars.insert(ENV_VAR.to_string(), self.environ_val());
        }

        let (names, values): (Vec<String>, Vec<Val>) = vars.into_iter().unzip();
        tracing::trace!(?names, "compiling query");

        let mut defs = ParseCtx::new(names);
        defs.insert_natives(jaq_core::core());
        defs.insert_defs(jaq_std::std());
        for text in &self.definitions {
            if let (Some(parsed), _) = jaq_parse::parse(text, jaq_parse::defs()) {
                defs.insert_defs(parsed);
            }
        }

        let (main, errs) = jaq_parse::parse(&self.text, jaq_parse::main());
        let main = match main {
            Some(main) if errs.is_empty() => main,
            _ => return Err(QueryError::compile(&self.text, error_strings(errs))),
        };

        let filter = defs.compile(main);
        if !defs.errs.is_empty() {
            let errs = defs.errs.iter().map(|e| e.0.to_string()).collect();
            return Err(QueryError::compile(&self.text, errs));
        }

        Ok(Compiled {
            filter,
            values,
            inputs: RcIter::new(core::iter::empty()),
        })
    }

    fn environ_val(&self) -> Val {
        let pairs: Vec<(String, String)> = match &self.environ {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };
        Val::Obj(Rc::new(
            pairs
                .into_iter()
                .map(|(k, v)| (Rc::new(k), Val::Str(Rc::new(v))))
                .collect(),
        ))
    }
}

fn error_strings<E: ToString>(errs: Vec<E>) -> Vec<String> {
    errs.iter().map(ToString::to_string).collect()
}

/// A query compiled for one execution.
pub(crate) struct Compiled {
    filter: Filter,
    values: Vec<Val>,
    inputs: RcIter<core::iter::Empty<Result<Val, String>>>,
}

impl Compiled {
    /// Lazily evaluate the query on `input`. Engine errors are rendered as
    /// strings.
    pub(crate) fn run(&self, input: Value) -> impl Iterator<Item = Result<Value, String>> + '_ {
        let ctx = Ctx::new(self.values.iter().cloned(), &self.inputs);
        self.filter
            .run((ctx, to_val(input)))
            .map(|result| result.map(from_val).map_err(|e| e.to_string()))
    }
}

// ============================================================================
// Value conversion
// ============================================================================

fn to_val(value: Value) -> Val {
    match value {
        Value::Null => Val::Null,
        Value::Bool(b) => Val::Bool(b),
        Value::Int(n) => match isize::try_from(n) {
            Ok(n) => Val::Int(n),
            Err(_) => Val::Num(Rc::new(n.to_string())),
        },
        Value::Float(f) => Val::Float(f),
        Value::BigInt(n) => Val::Num(Rc::new(n.to_string())),
        Value::String(s) => Val::Str(Rc::new(s)),
        Value::Array(arr) => Val::Arr(Rc::new(arr.into_iter().map(to_val).collect())),
        Value::Object(obj) => Val::Obj(Rc::new(
            obj.into_iter()
                .map(|(k, v)| (Rc::new(k), to_val(v)))
                .collect(),
        )),
    }
}

fn from_val(val: Val) -> Value {
    match val {
        Val::Null => Value::Null,
        Val::Bool(b) => Value::Bool(b),
        Val::Int(n) => Value::Int(n as i64),
        Val::Float(f) => Value::Float(f),
        Val::Num(s) => parse_number(&s),
        Val::Str(s) => Value::String(unwrap_rc(s)),
        Val::Arr(arr) => Value::Array(unwrap_rc(arr).into_iter().map(from_val).collect()),
        Val::Obj(obj) => Value::Object(
            unwrap_rc(obj)
                .into_iter()
                .map(|(k, v)| (unwrap_rc(k), from_val(v)))
                .collect(),
        ),
    }
}

fn unwrap_rc<T: Clone>(rc: Rc<T>) -> T {
    Rc::try_unwrap(rc).unwrap_or_else(|rc| (*rc).clone())
}

/// Read a number literal kept verbatim by the engine.
fn parse_number(text: &str) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(n) = text.parse::<BigInt>() {
        return Value::integer(n);
    }
    match text.parse::<f64>() {
        Ok(f) => Value::Float(f),
        Err(_) => Value::String(text.to_string()),
    }
}
