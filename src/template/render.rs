//! Variable substitution for prompt templates.
//!
//! Templates use `{{variable}}` tags. Substitution is schema-less: tags
//! naming a missing variable render as the empty string, matching what
//! template authors expect from Handlebars. Malformed tags are a typed
//! rendering failure, never a panic.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

/// Template rendering errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// A `{{` without a matching `}}`.
    #[error("Unclosed variable tag starting at byte {position}")]
    UnclosedTag {
        /// Byte offset of the opening `{{`.
        position: usize,
    },

    /// A `{{}}` tag with no variable name.
    #[error("Empty variable tag at byte {position}")]
    EmptyTag {
        /// Byte offset of the opening `{{`.
        position: usize,
    },
}

/// Renders `template`, replacing each `{{name}}` tag with its value.
pub fn render(template: &str, variables: &HashMap<String, String>) -> Result<String, RenderError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        let tag_start = offset + open;
        let after_open = &rest[open + 2..];

        let Some(close) = after_open.find("}}") else {
            return Err(RenderError::UnclosedTag {
                position: tag_start,
            });
        };

        let name = after_open[..close].trim();
        if name.is_empty() {
            return Err(RenderError::EmptyTag {
                position: tag_start,
            });
        }

        match variables.get(name) {
            Some(value) => output.push_str(value),
            None => debug!(variable = %name, "Template variable not supplied, rendering empty"),
        }

        let consumed = open + 2 + close + 2;
        rest = &rest[consumed..];
        offset += consumed;
    }

    output.push_str(rest);
    Ok(output)
}
