//! Template engine based on MiniJinja
//!
//! Data layers are plain YAML; only string leaves are templates. Rendering a
//! tree therefore never changes its shape, only the text of its strings.

use kubecm_core::{CoreError, DeployContext, LevelResolver, Values};
use minijinja::{AutoEscape, Environment, ErrorKind};
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
#[derive(Debug, Clone)]
pub struct Engine {
    strict_mode: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Engine {
    /// Create a new engine
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create a configured MiniJinja environment
    fn create_environment(&self, strict: bool) -> Environment<'static> {
        let mut env = Environment::new();

        if strict {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }
        env.set_debug(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        // `namespace` is a deploy parameter, not the builtin constructor
        env.remove_global("namespace");

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);

        env.add_function("fail", functions::fail);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);

        env
    }

    /// Render a single template string against a scope
    pub fn render_string(&self, template: &str, scope: &JsonValue, origin: &str) -> Result<String> {
        let env = self.create_environment(self.strict_mode);
        render_with(&env, template, scope, origin)
    }

    /// Render a hierarchy path template
    ///
    /// Always strict: returns `Ok(None)` when the template references a
    /// variable the context does not define.
    pub fn render_path(&self, template: &str, context: &DeployContext) -> Result<Option<String>> {
        let env = self.create_environment(true);

        match env.render_str(template, context.to_json()) {
            Ok(path) => Ok(Some(path)),
            Err(err) if err.kind() == ErrorKind::UndefinedError => Ok(None),
            Err(err) => Err(EngineError::Template(TemplateError::from_minijinja(
                err,
                "hierarchy",
                template,
                &[],
            ))),
        }
    }

    /// Evaluate derived variables in order
    ///
    /// Each variable may reference the deploy parameters and every variable
    /// defined before it as `vars.<name>`. The returned context carries the
    /// evaluated variables.
    pub fn evaluate_vars(&self, vars: &Values, context: DeployContext) -> Result<DeployContext> {
        let env = self.create_environment(self.strict_mode);
        let mut context = context;

        let Some(raw) = vars.inner().as_object() else {
            return Ok(context);
        };

        for (name, value) in raw {
            if name.is_empty() || name.contains('.') {
                return Err(EngineError::InvalidVars { name: name.clone() });
            }
            let scope = context.to_json();
            let defined: Vec<String> = context.vars.keys().cloned().collect();
            let rendered = render_tree(&env, value, &scope, &format!("vars.{}", name), &defined)?;
            tracing::debug!(var = %name, "evaluated variable");
            context.vars.insert(name.clone(), rendered);
        }

        Ok(context)
    }

    /// Render every string leaf of a data tree
    ///
    /// `origin` names the tree in error messages (e.g. `resources`).
    pub fn render_data(
        &self,
        data: &JsonValue,
        context: &DeployContext,
        origin: &str,
    ) -> Result<JsonValue> {
        let env = self.create_environment(self.strict_mode);
        let defined: Vec<String> = context.vars.keys().cloned().collect();
        render_tree(&env, data, &context.to_json(), origin, &defined)
    }
}

impl LevelResolver for Engine {
    fn resolve_level(
        &self,
        template: &str,
        context: &DeployContext,
    ) -> kubecm_core::Result<Option<String>> {
        self.render_path(template, context)
            .map_err(|err| CoreError::InvalidLevel {
                template: template.to_string(),
                message: match err {
                    EngineError::Template(te) => te.message,
                    other => other.to_string(),
                },
            })
    }
}

fn is_template(s: &str) -> bool {
    s.contains("{{") || s.contains("{%") || s.contains("{#")
}

fn render_with(
    env: &Environment<'static>,
    template: &str,
    scope: &JsonValue,
    origin: &str,
) -> Result<String> {
    env.render_str(template, scope).map_err(|e| {
        EngineError::Template(TemplateError::from_minijinja(e, origin, template, &[]))
    })
}

fn render_tree(
    env: &Environment<'static>,
    value: &JsonValue,
    scope: &JsonValue,
    origin: &str,
    defined_vars: &[String],
) -> Result<JsonValue> {
    match value {
        JsonValue::String(s) if is_template(s) => env
            .render_str(s, scope)
            .map(JsonValue::String)
            .map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, origin, s, defined_vars))
            }),
        JsonValue::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                let path = format!("{}.{}", origin, key);
                rendered.insert(key.clone(), render_tree(env, item, scope, &path, defined_vars)?);
            }
            Ok(JsonValue::Object(rendered))
        }
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                render_tree(env, item, scope, &format!("{}[{}]", origin, i), defined_vars)
            })
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array),
        other => Ok(other.clone()),
    }
}
