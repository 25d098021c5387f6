//! The construction plan handed to a renderer.
//!
//! A plan is target-language agnostic: it names providers, variables and
//! control-flow obligations (error checks, cleanup registrations) but
//! never syntax. Rendering the plan to text is the renderer's job.
//!
//! ```text
//! [call] message = app::new_message()
//! [call] greeter = app::new_greeter(message)
//! [call] event = app::new_event(greeter)  (check err)
//! return event
//! ```

use std::fmt;

use serde::Serialize;
use wiregen_support::rendering::{OutlineEntry, render_outline};

use crate::key::TypeKey;

/// An injector argument as seen by the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeKey,
}

/// A variable holding a value of `ty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub ty: TypeKey,
    pub var: String,
}

/// A value produced by a step. `var` is `None` when nothing uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Output {
    pub ty: TypeKey,
    pub var: Option<String>,
}

/// What a step does with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Call the provider function with the arguments in order.
    Call,
    /// Evaluate the bound value expression.
    Value { expr: String },
    /// Use the single argument as the interface-typed output.
    Bind,
    /// Build a struct literal; `fields[i]` takes `args[i]`.
    Struct { fields: Vec<String> },
    /// Read field `name` of the single argument.
    Field { name: String },
}

/// Early return after a fallible step.
///
/// When the step fails, every handle in `unwind` is invoked in the listed
/// order (latest construction first), then the injector returns zero
/// values together with the error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ErrorCheck {
    pub unwind: Vec<String>,
}

/// One construction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    /// Provider id, for diagnostics and rendering
    pub provider: String,
    pub action: StepAction,
    pub args: Vec<Binding>,
    pub outputs: Vec<Output>,
    pub error_check: Option<ErrorCheck>,
    /// Variable receiving the step's release action, if it has one
    pub cleanup: Option<String>,
}

impl Step {
    /// Variables bound by this step.
    pub fn bound_vars(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().filter_map(|o| o.var.as_deref())
    }

    fn outline(&self) -> OutlineEntry {
        let targets: Vec<&str> = self
            .outputs
            .iter()
            .map(|o| o.var.as_deref().unwrap_or("_"))
            .collect();
        let args: Vec<&str> = self.args.iter().map(|a| a.var.as_str()).collect();

        let (label, rhs) = match &self.action {
            StepAction::Call => ("call", format!("{}({})", self.provider, args.join(", "))),
            StepAction::Value { expr } => ("value", expr.clone()),
            StepAction::Bind => ("bind", args.join(", ")),
            StepAction::Struct { fields } => {
                let inits: Vec<String> = fields
                    .iter()
                    .zip(&args)
                    .map(|(field, arg)| format!("{field}: {arg}"))
                    .collect();
                let ty = self.outputs.first().map(|o| o.ty.short_name()).unwrap_or_default();
                ("struct", format!("{ty} {{ {} }}", inits.join(", ")))
            }
            StepAction::Field { name } => ("field", format!("{}.{name}", args.join(", "))),
        };

        let mut notes = Vec::new();
        if let Some(check) = &self.error_check {
            if check.unwind.is_empty() {
                notes.push("check err".to_string());
            } else {
                notes.push(format!("check err, unwind {}", check.unwind.join(", ")));
            }
        }
        if let Some(cleanup) = &self.cleanup {
            notes.push(format!("cleanup {cleanup}"));
        }

        OutlineEntry {
            label: label.to_string(),
            text: format!("{} = {rhs}", targets.join(", ")),
            notes,
        }
    }
}

/// The complete, ordered recipe for one injector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructionPlan {
    pub injector: String,
    pub params: Vec<Param>,
    pub steps: Vec<Step>,
    /// The requested outputs, in declaration order
    pub outputs: Vec<Binding>,
    /// Release actions of the aggregate cleanup handle, latest first
    pub cleanups: Vec<String>,
    pub error_capable: bool,
}

impl ConstructionPlan {
    /// Whether the injector hands a cleanup handle back to its caller.
    pub fn returns_cleanup(&self) -> bool {
        !self.cleanups.is_empty()
    }

    /// The step binding a variable of type `ty`, if one does.
    pub fn step_for(&self, ty: &TypeKey) -> Option<&Step> {
        self.steps
            .iter()
            .find(|step| step.outputs.iter().any(|o| &o.ty == ty && o.var.is_some()))
    }
}

impl fmt::Display for ConstructionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty.short_name()))
            .collect();
        writeln!(f, "{}({})", self.injector, params.join(", "))?;

        let entries: Vec<OutlineEntry> = self.steps.iter().map(Step::outline).collect();
        write!(f, "{}", render_outline(&entries))?;

        let outputs: Vec<&str> = self.outputs.iter().map(|o| o.var.as_str()).collect();
        write!(f, "return {}", outputs.join(", "))?;
        if self.returns_cleanup() {
            write!(f, " + cleanup [{}]", self.cleanups.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(ty: &str, var: &str) -> Binding {
        Binding {
            ty: TypeKey::new(ty),
            var: var.to_string(),
        }
    }

    fn output(ty: &str, var: &str) -> Output {
        Output {
            ty: TypeKey::new(ty),
            var: Some(var.to_string()),
        }
    }

    fn sample() -> ConstructionPlan {
        ConstructionPlan {
            injector: "init".to_string(),
            params: vec![Param {
                name: "phrase".to_string(),
                ty: TypeKey::new("String"),
            }],
            steps: vec![
                Step {
                    provider: "app::new_message".to_string(),
                    action: StepAction::Call,
                    args: vec![binding("String", "phrase")],
                    outputs: vec![output("app::Message", "message")],
                    error_check: None,
                    cleanup: Some("cleanup".to_string()),
                },
                Step {
                    provider: "app::new_event".to_string(),
                    action: StepAction::Call,
                    args: vec![binding("app::Message", "message")],
                    outputs: vec![output("app::Event", "event")],
                    error_check: Some(ErrorCheck {
                        unwind: vec!["cleanup".to_string()],
                    }),
                    cleanup: None,
                },
            ],
            outputs: vec![binding("app::Event", "event")],
            cleanups: vec!["cleanup".to_string()],
            error_capable: true,
        }
    }

    #[test]
    fn outline_display() {
        let text = sample().to_string();
        assert_eq!(
            text,
            "init(phrase: String)\n\
             [call] message = app::new_message(phrase)  (cleanup cleanup)\n\
             [call] event = app::new_event(message)  (check err, unwind cleanup)\n\
             return event + cleanup [cleanup]"
        );
    }

    #[test]
    fn step_lookup_by_type() {
        let plan = sample();
        let step = plan.step_for(&TypeKey::new("app::Event")).unwrap();
        assert_eq!(step.provider, "app::new_event");
        assert!(plan.step_for(&TypeKey::new("String")).is_none());
        assert!(plan.returns_cleanup());
    }

    #[test]
    fn serializes_action_tag() {
        let step = Step {
            provider: "struct(baz::Service)".to_string(),
            action: StepAction::Struct {
                fields: vec!["foo".to_string()],
            },
            args: vec![binding("foo::Service", "service")],
            outputs: vec![output("baz::Service", "bazService")],
            error_check: None,
            cleanup: None,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["action"]["action"], "struct");
        assert_eq!(json["outputs"][0]["var"], "bazService");
    }
}
