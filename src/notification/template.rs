//! This module provides a service for rendering notification messages using
//! the minijinja templating engine.
//!
//! Templates are rendered against the context built by [`event_context`]:
//!
//! | name         | contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | `poller`     | name of the poller                                        |
//! | `rule`       | id of the rule that fired                                 |
//! | `key`        | entity key                                                |
//! | `item`       | the entity's attributes (last-known ones when finished)   |
//! | `old`, `new` | compared values, for value changes only                   |
//! | `last_known` | last-known values by rule, for finished entities only     |
//! | `crossed`    | threshold rules crossed, for finished entities only       |

use minijinja::Environment;
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::{Event, EventKind, NotificationMessage};

mod filters;

/// A service for rendering templates using the minijinja templating engine.
pub struct TemplateService {
    env: Environment<'static>,
}

/// Error type for the TemplateService.
#[derive(Debug, Error)]
pub enum TemplateServiceError {
    #[error("Failed to render template: {0}")]
    RenderError(#[from] minijinja::Error),
}

impl TemplateService {
    /// Creates a new instance of `TemplateService`. Undefined variables are
    /// errors unless guarded with `default` or `is defined`.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.add_filter("money", filters::money);

        Self { env }
    }

    /// Renders a template with the given context.
    pub fn render(
        &self,
        template_str: &str,
        context: &Value,
    ) -> Result<String, TemplateServiceError> {
        self.env.render_str(template_str, context).map_err(|e| {
            tracing::warn!(template = template_str, error = %e, "Failed to render template.");
            TemplateServiceError::RenderError(e)
        })
    }

    /// Renders every part of a message template for one event.
    pub fn render_event(
        &self,
        message: &NotificationMessage,
        event: &Event,
        poller: &str,
    ) -> Result<NotificationMessage, TemplateServiceError> {
        let context = event_context(event, poller);
        tracing::debug!(context = %context, "Rendering message for event.");
        Ok(NotificationMessage {
            title: self.render(&message.title, &context)?,
            body: self.render(&message.body, &context)?,
            html: message
                .html
                .as_deref()
                .map(|html| self.render(html, &context))
                .transpose()?,
        })
    }
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the template context of an event.
pub fn event_context(event: &Event, poller: &str) -> Value {
    let mut item = json!(event.attributes);
    item["key"] = json!(event.key);

    let mut context = json!({
        "poller": poller,
        "rule": event.rule_id,
        "key": event.key,
        "item": item,
    });
    match &event.kind {
        EventKind::ValueChanged { old, new } => {
            context["old"] = json!(old);
            context["new"] = json!(new);
        }
        EventKind::Finished { last_known, crossed } => {
            context["last_known"] = json!(last_known);
            context["crossed"] = json!(crossed);
        }
        EventKind::New | EventKind::ThresholdCrossed => {}
    }
    context
}
