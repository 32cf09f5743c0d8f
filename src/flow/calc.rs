// src/flow/calc.rs

//! Layered variable calculator.
//!
//! The calculator takes one or more name → expression maps (later maps
//! shadow earlier ones) and returns a fully resolved name → value map.
//! Expressions reference other variables as `$name` or `${name}`; references
//! resolve recursively. Unknown references and reference cycles are errors.
//!
//! Names registered as *deferred* are left verbatim (`${name}`) when they
//! are not bound yet; this is how builtin references survive parsing and get
//! substituted at dispatch time instead.

use std::collections::{BTreeMap, HashSet};

pub struct Calc {
    layers: Vec<BTreeMap<String, String>>,
    deferred: HashSet<String>,
}

impl Calc {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            deferred: HashSet::new(),
        }
    }

    /// A calculator that leaves the given names unresolved when unbound.
    pub fn deferring<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            layers: Vec::new(),
            deferred: names.into_iter().map(str::to_string).collect(),
        }
    }

    /// Add a variable map. Later maps shadow earlier ones.
    pub fn add_var_map(&mut self, map: BTreeMap<String, String>) {
        self.layers.push(map);
    }

    /// Resolve every variable to its final value.
    pub fn eval(&self) -> Result<BTreeMap<String, String>, String> {
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        for layer in &self.layers {
            for (k, v) in layer {
                merged.insert(k.clone(), v.clone());
            }
        }

        let mut out = BTreeMap::new();
        for (name, expr) in &merged {
            let mut resolving = vec![name.clone()];
            let value = self.expand(expr, &merged, &mut resolving)?;
            out.insert(name.clone(), value);
        }
        Ok(out)
    }

    fn expand(
        &self,
        template: &str,
        env: &BTreeMap<String, String>,
        resolving: &mut Vec<String>,
    ) -> Result<String, String> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }

            match chars.peek() {
                Some(&(_, '{')) => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed || name.is_empty() {
                        return Err(format!("malformed variable reference in: {template}"));
                    }
                    out.push_str(&self.substitute(&name, env, resolving)?);
                }
                Some(&(_, c)) if is_ident_char(c) => {
                    let mut name = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if !is_ident_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    out.push_str(&self.substitute(&name, env, resolving)?);
                }
                // Lone '$' stays literal.
                _ => out.push('$'),
            }
        }

        Ok(out)
    }

    fn substitute(
        &self,
        name: &str,
        env: &BTreeMap<String, String>,
        resolving: &mut Vec<String>,
    ) -> Result<String, String> {
        match env.get(name) {
            Some(expr) => {
                if resolving.iter().any(|n| n == name) {
                    return Err(format!("variable reference cycle involving '{name}'"));
                }
                resolving.push(name.to_string());
                let value = self.expand(expr, env, resolving)?;
                resolving.pop();
                Ok(value)
            }
            None if self.deferred.contains(name) => Ok(format!("${{{name}}}")),
            None => Err(format!("unknown variable: {name}")),
        }
    }
}

impl Default for Calc {
    fn default() -> Self {
        Self::new()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split `key=expression` bindings into a map.
pub fn vars_to_map(bindings: &[String]) -> Result<BTreeMap<String, String>, String> {
    let mut map = BTreeMap::new();
    for binding in bindings {
        let (key, expr) = binding
            .split_once('=')
            .ok_or_else(|| format!("invalid var (expected key=expression): {binding}"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("invalid var (empty key): {binding}"));
        }
        map.insert(key.to_string(), expr.to_string());
    }
    Ok(map)
}
